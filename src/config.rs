use anyhow::Result;
use serde::Deserialize;
use std::env;

pub const DEFAULT_ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_USER_AGENT: &str = concat!("query-executor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub arxiv: ArxivConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Settings for the outbound arXiv API client.
#[derive(Debug, Clone, Deserialize)]
pub struct ArxivConfig {
    pub base_url: String,
    /// Papers requested per API call when paging through large result sets.
    pub page_size: usize,
    /// Pause between consecutive page requests. arXiv asks clients for 3s.
    pub page_delay_ms: u64,
    /// Unset means the HTTP client's default (no overall timeout).
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARXIV_API_URL.to_string(),
            page_size: 100,
            page_delay_ms: 3000,
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server_defaults = ServerConfig::default();
        let arxiv_defaults = ArxivConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: match env::var("PORT") {
                    Ok(port) => port.parse()?,
                    Err(_) => server_defaults.port,
                },
                host: env::var("HOST").unwrap_or(server_defaults.host),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(server_defaults.cors_allowed_origins),
            },
            arxiv: ArxivConfig {
                base_url: env::var("ARXIV_API_URL").unwrap_or(arxiv_defaults.base_url),
                page_size: match env::var("ARXIV_PAGE_SIZE") {
                    Ok(size) => size.parse()?,
                    Err(_) => arxiv_defaults.page_size,
                },
                page_delay_ms: match env::var("ARXIV_PAGE_DELAY_MS") {
                    Ok(delay) => delay.parse()?,
                    Err(_) => arxiv_defaults.page_delay_ms,
                },
                timeout_secs: env::var("ARXIV_TIMEOUT_SECS")
                    .ok()
                    .map(|secs| secs.parse())
                    .transpose()?,
                user_agent: env::var("ARXIV_USER_AGENT").unwrap_or(arxiv_defaults.user_agent),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_public_arxiv_api() {
        let config = Config::default();
        assert_eq!(config.arxiv.base_url, DEFAULT_ARXIV_API_URL);
        assert_eq!(config.arxiv.page_size, 100);
        assert_eq!(config.arxiv.page_delay_ms, 3000);
        assert!(config.arxiv.timeout_secs.is_none());
        assert_eq!(config.server.port, 8000);
    }

    const ENV_KEYS: [&str; 8] = [
        "PORT",
        "HOST",
        "ALLOWED_ORIGINS",
        "ARXIV_API_URL",
        "ARXIV_PAGE_SIZE",
        "ARXIV_PAGE_DELAY_MS",
        "ARXIV_TIMEOUT_SECS",
        "ARXIV_USER_AGENT",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    // Single test so the process environment is never mutated concurrently
    #[test]
    fn test_from_env() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_allowed_origins, vec!["*"]);
        assert!(config.arxiv.timeout_secs.is_none());
        assert_eq!(config.arxiv.user_agent, DEFAULT_USER_AGENT);

        env::set_var("PORT", "9001");
        env::set_var("HOST", "127.0.0.1");
        env::set_var("ALLOWED_ORIGINS", " http://a.test , ,http://b.test ");
        env::set_var("ARXIV_API_URL", "http://localhost:1234/api/query");
        env::set_var("ARXIV_PAGE_SIZE", "25");
        env::set_var("ARXIV_PAGE_DELAY_MS", "0");
        env::set_var("ARXIV_TIMEOUT_SECS", "30");
        env::set_var("ARXIV_USER_AGENT", "tests/1.0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["http://a.test", "http://b.test"]
        );
        assert_eq!(config.arxiv.base_url, "http://localhost:1234/api/query");
        assert_eq!(config.arxiv.page_size, 25);
        assert_eq!(config.arxiv.page_delay_ms, 0);
        assert_eq!(config.arxiv.timeout_secs, Some(30));
        assert_eq!(config.arxiv.user_agent, "tests/1.0");

        env::set_var("ARXIV_TIMEOUT_SECS", "soon");
        assert!(Config::from_env().is_err());
        env::remove_var("ARXIV_TIMEOUT_SECS");

        env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());

        env::set_var("PORT", "70000");
        assert!(Config::from_env().is_err());

        clear_env();
    }
}
