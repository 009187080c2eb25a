use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: String,
    pub max_connections: u32,
    /// Bearer token for metadata edits. Edits are refused when unset.
    pub admin_token: Option<String>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("PHOTO_DIARY_PORT")
                .unwrap_or_else(|_| "18474".to_string())
                .parse()?,
            host: env::var("PHOTO_DIARY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            db_path: env::var("PHOTO_DIARY_DB_PATH")
                .unwrap_or_else(|_| "./data/database/photo-diary.db".to_string()),
            max_connections: env::var("PHOTO_DIARY_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()?,
            admin_token: env::var("PHOTO_DIARY_ADMIN_TOKEN")
                .ok()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            cors_origins: env::var("PHOTO_DIARY_CORS_ORIGINS")
                .map(|origins| split_list(&origins))
                .unwrap_or_default(),
        })
    }

    pub fn bind_address(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, port: u16) -> Config {
        Config {
            port,
            host: host.to_string(),
            db_path: ":memory:".to_string(),
            max_connections: 1,
            admin_token: None,
            cors_origins: Vec::new(),
        }
    }

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(
            split_list(" https://a.example.com, ,https://b.example.com,"),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_bind_address() {
        let addr = config("127.0.0.1", 18474).bind_address().unwrap();
        assert_eq!(addr.port(), 18474);
        assert!(addr.ip().is_loopback());
        assert!(config("not a host", 1).bind_address().is_err());
    }
}
