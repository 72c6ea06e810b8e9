use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use std::env;

/// Runtime settings, read once at startup and shared with handlers as `web::Data<Config>`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    /// `APP_ENV=production` marks session cookies `Secure`.
    pub production: bool,
    /// Offset used to find "local midnight" for timelines and due dates. `None` follows the
    /// host timezone, looked up on every call so DST transitions apply without a restart.
    pub utc_offset: Option<FixedOffset>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            production: env::var("APP_ENV")
                .map(|value| value.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            utc_offset: env::var("APP_UTC_OFFSET")
                .ok()
                .filter(|value| !value.is_empty())
                .map(|value| {
                    value
                        .parse::<FixedOffset>()
                        .expect("APP_UTC_OFFSET must look like +05:30")
                }),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|value| !value.is_empty()),
        }
    }

    /// Settings for tests and tools that never read the environment.
    pub fn for_offset(database_url: impl Into<String>, utc_offset: FixedOffset) -> Self {
        Self {
            database_url: database_url.into(),
            server_port: 8080,
            server_host: "127.0.0.1".to_string(),
            production: false,
            utc_offset: Some(utc_offset),
            cors_origin: None,
        }
    }

    /// Current instant in the configured offset; the reference for timelines and due dates.
    pub fn now(&self) -> DateTime<FixedOffset> {
        match self.utc_offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => {
                let local = Local::now();
                local.with_timezone(&local.offset().fix())
            }
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("APP_UTC_OFFSET", "+05:30");
        env::remove_var("APP_ENV");

        let config = Config::from_env();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.now().offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert!(!config.production);

        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("APP_ENV", "production");

        let config = Config::from_env();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert!(config.production);
        assert_eq!(config.server_url(), "http://0.0.0.0:3000");

        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("APP_ENV");
        env::remove_var("APP_UTC_OFFSET");
    }

    #[test]
    fn test_now_follows_host_timezone_without_fixed_offset() {
        let mut config = Config::for_offset("postgres://test", FixedOffset::east_opt(0).unwrap());
        config.utc_offset = None;

        let before = Local::now();
        let now = config.now();
        let after = Local::now();

        let host_offsets = [
            before.offset().fix().local_minus_utc(),
            after.offset().fix().local_minus_utc(),
        ];
        assert!(host_offsets.contains(&now.offset().local_minus_utc()));
        assert!(before.with_timezone(&Utc) <= now.with_timezone(&Utc));
        assert!(now.with_timezone(&Utc) <= after.with_timezone(&Utc));
    }
}
