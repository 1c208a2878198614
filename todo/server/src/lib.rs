pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_db_url")]
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Lifetime of a login session, in hours.
        #[serde(default = "default_session_ttl_hours")]
        pub session_ttl_hours: i64,
        /// Marks session cookies `Secure`. Enable when served over HTTPS.
        #[serde(default)]
        pub secure_cookies: bool,
    }

    #[derive(Debug, thiserror::Error)]
    pub enum ConfigError {
        #[error("SESSION_TTL_HOURS must be a positive number of hours within the calendar, got {0}")]
        InvalidSessionTtl(i64),
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            config.session_ttl()?;
            Ok(config)
        }

        /// Returns the session lifetime, rejecting values that are not positive or that
        /// would push an expiry past the representable date range.
        pub fn session_ttl(&self) -> Result<chrono::Duration, ConfigError> {
            let invalid = || ConfigError::InvalidSessionTtl(self.session_ttl_hours);
            if self.session_ttl_hours <= 0 {
                return Err(invalid());
            }
            let ttl = chrono::Duration::try_hours(self.session_ttl_hours).ok_or_else(invalid)?;
            chrono::Utc::now()
                .checked_add_signed(ttl)
                .map(|_| ttl)
                .ok_or_else(invalid)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                db_url: default_db_url(),
                port: default_port(),
                session_ttl_hours: default_session_ttl_hours(),
                secure_cookies: false,
            }
        }
    }

    fn default_db_url() -> String {
        "sqlite://todo.db?mode=rwc".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_session_ttl_hours() -> i64 {
        24
    }

}

pub mod auth;
pub mod entities;
pub mod todo;
pub mod user;
pub mod web;
