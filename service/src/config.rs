use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::time::Duration;

/// Root of the upstream ticketing API, e.g. `https://glpi.example.com`.
/// Must use http or https; a trailing `/` is removed.
fn parse_glpi_url(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err("GLPI URL must start with http:// or https://".to_string());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Returned by the accessors of settings that are optional at parse time but
/// required by the component asking for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSetting(pub &'static str);

impl std::fmt::Display for MissingSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "missing required setting {}", self.0)
    }
}

impl std::error::Error for MissingSetting {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the GLPI instance (without the `/apirest.php` suffix)
    #[arg(long, env, value_parser = parse_glpi_url)]
    glpi_url: Option<String>,

    /// Application token sent as the `App-Token` header
    #[arg(long, env, hide_env_values = true)]
    glpi_app_token: Option<String>,

    /// Personal user token used to open API sessions
    #[arg(long, env, hide_env_values = true)]
    glpi_user_token: Option<String>,

    /// Seconds an upstream session token is considered valid after issue
    #[arg(long, env, default_value_t = 3600)]
    pub session_lifetime_secs: u64,

    /// Timeout in seconds for every upstream HTTP request
    #[arg(long, env, default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Events buffered per SSE subscriber before new events are dropped for it
    #[arg(long, env, default_value_t = 64)]
    pub sse_channel_capacity: usize,

    /// Number of recent events kept for the history endpoint
    #[arg(long, env, default_value_t = 1000)]
    pub event_history_capacity: usize,

    /// Tickets a single SSE subscriber may watch at once
    #[arg(long, env, default_value_t = 256)]
    pub sse_max_watches: usize,

    /// Interval in seconds between SSE keep-alive comments
    #[arg(long, env, default_value_t = 15)]
    pub sse_keep_alive_secs: u64,

    /// A list of full CORS origin URLs that allowed to receive server responses.
    /// `*` allows any origin.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "*"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Defaults and environment only, ignoring the process arguments.
    pub fn with_defaults() -> Self {
        Config::parse_from(["glpi_notify"])
    }

    pub fn glpi_url(&self) -> Result<&str, MissingSetting> {
        self.glpi_url.as_deref().ok_or(MissingSetting("GLPI_URL"))
    }

    pub fn set_glpi_url(mut self, glpi_url: &str) -> Self {
        self.glpi_url = Some(glpi_url.trim_end_matches('/').to_string());
        self
    }

    pub fn glpi_app_token(&self) -> Result<&str, MissingSetting> {
        self.glpi_app_token
            .as_deref()
            .ok_or(MissingSetting("GLPI_APP_TOKEN"))
    }

    pub fn glpi_user_token(&self) -> Result<&str, MissingSetting> {
        self.glpi_user_token
            .as_deref()
            .ok_or(MissingSetting("GLPI_USER_TOKEN"))
    }

    pub fn set_glpi_tokens(mut self, app_token: &str, user_token: &str) -> Self {
        self.glpi_app_token = Some(app_token.to_string());
        self.glpi_user_token = Some(user_token.to_string());
        self
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }

    /// Whether CORS should allow every origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("glpi_notify").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = parse(&[]);
        assert_eq!(config.session_lifetime(), Duration::from_secs(3600));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.sse_channel_capacity, 64);
        assert_eq!(config.event_history_capacity, 1000);
        assert_eq!(config.sse_max_watches, 256);
        assert_eq!(config.port, 8000);
        assert_eq!(config.interface.as_deref(), Some("0.0.0.0"));
        assert!(config.allows_any_origin());
        assert_eq!(config.log_level_filter, LevelFilter::Info);
    }

    #[test]
    fn glpi_url_loses_its_trailing_slash() {
        let config = parse(&["--glpi-url", "https://glpi.example.com/"]);
        assert_eq!(config.glpi_url(), Ok("https://glpi.example.com"));
    }

    #[test]
    fn glpi_url_without_scheme_is_rejected() {
        let result = Config::try_parse_from(["glpi_notify", "--glpi-url", "glpi.example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_tokens_are_reported_by_name() {
        let config = parse(&[]);
        assert_eq!(
            config.glpi_user_token(),
            Err(MissingSetting("GLPI_USER_TOKEN"))
        );

        let config = config.set_glpi_tokens("app", "user");
        assert_eq!(config.glpi_app_token(), Ok("app"));
        assert_eq!(config.glpi_user_token(), Ok("user"));
    }

    #[test]
    fn allowed_origins_split_on_commas() {
        let config = parse(&[
            "--allowed-origins",
            "http://localhost:3000,https://desk.example.com",
        ]);
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(!config.allows_any_origin());
    }
}
