use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

pub const DEFAULT_JWT_SECRET: &str = "your_jwt_secret";
/// Connection string that selects the in-process store.
pub const MEMORY_URI: &str = "memory://";

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub store_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub frontend_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET is not set, falling back to the development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            mongo_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "crm".to_string()),
            jwt_secret,
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", 168),
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST),
            store_timeout: Duration::from_secs(parsed("STORE_TIMEOUT_SECS", 5)),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 5000),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.mongo_uri == MEMORY_URI
    }
}

impl Default for Config {
    /// In-memory settings for tests and local experiments.
    fn default() -> Self {
        Self {
            mongo_uri: MEMORY_URI.to_string(),
            database_name: "crm".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_ttl_hours: 168,
            bcrypt_cost: 4,
            store_timeout: Duration::from_secs(5),
            host: "127.0.0.1".to_string(),
            port: 5000,
            frontend_origin: "http://localhost:3000".to_string(),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_memory_store() {
        let config = Config::default();
        assert!(config.uses_memory_store());
        assert_eq!(config.jwt_ttl_hours, 168);
    }

    #[test]
    fn unparseable_values_fall_back() {
        env::set_var("CRM_TEST_PORT", "not-a-port");
        assert_eq!(parsed::<u16>("CRM_TEST_PORT", 5000), 5000);
        env::set_var("CRM_TEST_PORT", " 8081 ");
        assert_eq!(parsed::<u16>("CRM_TEST_PORT", 5000), 8081);
        env::remove_var("CRM_TEST_PORT");
    }
}
