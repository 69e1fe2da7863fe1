use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReadParams {
    /// Include the ticket's change log.
    #[serde(default)]
    pub(crate) with_logs: bool,
}
