use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Required by the API server; helper binaries ignore it.
    pub jwt_secret: Option<String>,
    pub notification_queue_capacity: usize,
    pub push_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let notification_queue_capacity = env::var("NOTIFICATION_QUEUE_CAPACITY")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(256);
        let push_enabled = env::var("PUSH_ENABLED")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            notification_queue_capacity,
            push_enabled,
        })
    }
}
