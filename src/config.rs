use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub mandatory_stages: Vec<String>,
    pub referral_ttl_days: i64,
    pub activity_retention_days: i64,
    pub expiry_schedule: String,
    pub cors_allowed_origins: Vec<String>,
    pub auth_rps: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_parse_or("JWT_TTL_HOURS", 24)?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            mandatory_stages: parse_list(
                &env::var("MANDATORY_STAGES").unwrap_or_else(|_| "Application,Screening".into()),
            ),
            referral_ttl_days: get_env_parse_or("REFERRAL_TTL_DAYS", 14)?,
            activity_retention_days: get_env_parse_or("ACTIVITY_RETENTION_DAYS", 365)?,
            expiry_schedule: env::var("EXPIRY_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
            cors_allowed_origins: parse_list(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default()),
            auth_rps: get_env_parse_or("AUTH_RPS", 10)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_list;

    #[test]
    fn mandatory_stage_list_is_trimmed() {
        assert_eq!(
            parse_list(" Application, Screening ,,"),
            vec!["Application".to_string(), "Screening".to_string()]
        );
    }
}
