use domain::TicketId;
use serde::Deserialize;

const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Identifies the caller on stream and watch endpoints. Older clients send `user_id`.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscriberParams {
    #[serde(alias = "user_id")]
    pub(crate) subscriber_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryParams {
    pub(crate) ticket_id: Option<TicketId>,
    pub(crate) limit: Option<usize>,
}

impl HistoryParams {
    pub(crate) fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_accepted_for_subscriber_id() {
        let params: SubscriberParams = serde_json::from_str(r#"{"user_id": "user_1700000000"}"#).unwrap();
        assert_eq!(params.subscriber_id, "user_1700000000");
    }

    #[test]
    fn history_limit_defaults() {
        let params: HistoryParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.limit(), DEFAULT_HISTORY_LIMIT);
        assert!(params.ticket_id.is_none());
    }
}
