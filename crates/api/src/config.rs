//! Environment-derived API configuration, read once at startup.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// When absent the server runs against the in-memory store (dev mode).
    pub database_url: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });
        let database_url = std::env::var("DATABASE_URL").ok();

        Self {
            bind_addr,
            jwt_secret,
            database_url,
        }
    }
}
