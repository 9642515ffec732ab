//! Database connection utilities.

use tokio_postgres::{Client, Config, NoTls};

use crate::DbError;

/// Full connection URL. Takes precedence over the individual variables.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Individual connection variables, used when [`DATABASE_URL_VAR`] is unset.
pub const DB_HOST_VAR: &str = "DB_HOST";
/// Database name.
pub const DB_NAME_VAR: &str = "DB_NAME";
/// Login role.
pub const DB_USER_VAR: &str = "DB_USER";
/// Password for [`DB_USER_VAR`].
pub const DB_PASSWORD_VAR: &str = "DB_PASSWORD";
/// Optional port.
pub const DB_PORT_VAR: &str = "DB_PORT";

/// Builds connection settings from the process environment.
///
/// # Errors
///
/// Returns [`DbError::MissingConfig`] if neither `DATABASE_URL` nor the
/// full set of `DB_*` variables is present, or if a value is malformed.
pub fn config_from_env() -> Result<Config, DbError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Builds connection settings from a variable lookup.
///
/// # Errors
///
/// See [`config_from_env`].
pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, DbError> {
    if let Some(url) = lookup(DATABASE_URL_VAR).filter(|u| !u.is_empty()) {
        return url.parse::<Config>().map_err(|e| DbError::MissingConfig {
            message: format!("{DATABASE_URL_VAR} is not a valid connection string: {e}"),
        });
    }

    let require = |key: &str| {
        lookup(key).ok_or_else(|| DbError::MissingConfig {
            message: format!("{DATABASE_URL_VAR} is unset and {key} is missing"),
        })
    };

    let mut config = Config::new();
    config
        .host(&require(DB_HOST_VAR)?)
        .dbname(&require(DB_NAME_VAR)?)
        .user(&require(DB_USER_VAR)?)
        .password(require(DB_PASSWORD_VAR)?);

    if let Some(port) = lookup(DB_PORT_VAR) {
        let port = port.parse::<u16>().map_err(|e| DbError::MissingConfig {
            message: format!("{DB_PORT_VAR}={port:?} is not a valid port: {e}"),
        })?;
        config.port(port);
    }

    Ok(config)
}

/// Opens a connection and spawns its driver task.
///
/// The driver ends when the returned client is dropped.
///
/// # Errors
///
/// Returns [`DbError::Postgres`] if the connection cannot be established.
pub async fn connect(config: &Config) -> Result<Client, DbError> {
    let (client, connection) = config.connect(NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("Database connection error: {e}");
        }
    });

    log::debug!(
        "Connected to database {:?} on {:?}",
        config.get_dbname().unwrap_or_default(),
        config.get_hosts()
    );

    Ok(client)
}
