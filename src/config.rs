use log::warn;

const DEFAULT_JWT_SECRET: &str = "vocalprep-dev-secret";

/// Connection settings for the interview database, read from individual
/// environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DB_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()
                .unwrap_or(5432),
            dbname: std::env::var("DB_NAME").unwrap_or_else(|_| "vocalprep_db".to_string()),
            user: std::env::var("DB_USER").unwrap_or_else(|_| "vocalprep_user".to_string()),
            password: std::env::var("DB_PASSWORD").unwrap_or_else(|_| "".to_string()),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

/// Application configuration loaded from the environment (with `.env`
/// support for development).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Load .env if present for development; real deployments set vars.
        let _ = dotenvy::dotenv();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set; using the development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            jwt_secret,
            database: DatabaseConfig::from_env(),
        }
    }
}
