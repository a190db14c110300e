use std::env;

use rolegate_core::{AppError, RoleId};

/// Environment-derived API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    /// Role assigned to registrations without an explicit position and
    /// to users displaced by a role delete.
    pub default_role_id: RoleId,
}

impl ApiConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = required_env("DATABASE_URL")?;
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let default_role_id = match env::var("DEFAULT_ROLE_ID") {
            Ok(value) => value
                .parse::<i64>()
                .map(RoleId::new)
                .map_err(|error| {
                    AppError::Validation(format!("invalid DEFAULT_ROLE_ID: {error}"))
                })?,
            Err(_) => RoleId::new(2),
        };

        Ok(Self {
            database_url,
            api_host,
            api_port,
            frontend_url,
            default_role_id,
        })
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
