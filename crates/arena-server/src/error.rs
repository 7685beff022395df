use thiserror::Error;

pub const ENV_PREFIX: &str = "ARENA";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {env_var}: {message}")]
    InvalidValue { env_var: String, message: String },

    #[error("Invalid listen address {host}:{port}")]
    InvalidAddress { host: String, port: u16 },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings key such as `server.port` to the variable that sets it.
pub fn to_env_var(field_path: &str) -> String {
    let mut env_var = String::from(ENV_PREFIX);
    for (i, part) in field_path.split('.').enumerate() {
        env_var.push_str(if i == 0 { "_" } else { "__" });
        env_var.push_str(&part.to_uppercase());
    }
    env_var
}
