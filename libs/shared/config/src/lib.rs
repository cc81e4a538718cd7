use std::env;
use tracing::warn;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub document_store_url: String,
    pub document_store_api_key: String,
    pub default_region: String,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            document_store_url: env::var("DOCUMENT_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("DOCUMENT_STORE_URL not set, using empty value");
                    String::new()
                }),
            document_store_api_key: env::var("DOCUMENT_STORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DOCUMENT_STORE_API_KEY not set, using empty value");
                    String::new()
                }),
            default_region: env::var("AWS_DEFAULT_REGION")
                .unwrap_or_else(|_| {
                    warn!("AWS_DEFAULT_REGION not set, using {}", DEFAULT_REGION);
                    DEFAULT_REGION.to_string()
                }),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| {
                    warn!("SERVER_HOST not set, using {}", DEFAULT_HOST);
                    DEFAULT_HOST.to_string()
                }),
            server_port: match env::var("SERVER_PORT") {
                Ok(port) => port.parse().unwrap_or_else(|_| {
                    warn!("SERVER_PORT '{}' is not a valid port, using {}", port, DEFAULT_PORT);
                    DEFAULT_PORT
                }),
                Err(_) => {
                    warn!("SERVER_PORT not set, using {}", DEFAULT_PORT);
                    DEFAULT_PORT
                }
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing document store settings");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.document_store_url.is_empty()
            && !self.document_store_api_key.is_empty()
    }

    /// Region used when a request does not name one.
    pub fn region_or_default<'a>(&'a self, region: Option<&'a str>) -> &'a str {
        region.unwrap_or(&self.default_region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            document_store_url: "http://localhost:54321".to_string(),
            document_store_api_key: "key".to_string(),
            default_region: "us-west-2".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
        }
    }

    #[test]
    fn test_is_configured() {
        let mut config = config();
        assert!(config.is_configured());

        config.document_store_api_key.clear();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_region_falls_back_to_default() {
        let config = config();
        assert_eq!(config.region_or_default(None), "us-west-2");
        assert_eq!(config.region_or_default(Some("eu-west-1")), "eu-west-1");
    }

    #[test]
    fn test_server_settings_fall_back_to_defaults() {
        env::remove_var("SERVER_HOST");
        env::remove_var("SERVER_PORT");
        let config = AppConfig::from_env();
        assert_eq!(config.server_host, DEFAULT_HOST);
        assert_eq!(config.server_port, DEFAULT_PORT);

        env::set_var("SERVER_PORT", "not-a-port");
        assert_eq!(AppConfig::from_env().server_port, DEFAULT_PORT);

        env::set_var("SERVER_PORT", "8081");
        assert_eq!(AppConfig::from_env().server_port, 8081);
        env::remove_var("SERVER_PORT");
    }
}
