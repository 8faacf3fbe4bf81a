use crate::error::{DashboardError, Result};

const PRIMARY_URL_ENV: &str = "DATABASE_URL";
const ARCHIVE_URL_ENV: &str = "ARCHIVE_DATABASE_URL";
const MAX_CONNECTIONS_ENV: &str = "DASHBOARD_MAX_CONNECTIONS";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the record store.
///
/// The archive source holds the older finals datasets. When no separate
/// archive endpoint is configured both sources share the primary endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub primary_url: String,
    pub archive_url: Option<String>,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let primary_url = present(PRIMARY_URL_ENV).ok_or_else(|| {
            DashboardError::Configuration(format!(
                "{PRIMARY_URL_ENV} must be set to the dashboard Postgres instance"
            ))
        })?;

        let max_connections = match present(MAX_CONNECTIONS_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    DashboardError::Configuration(format!(
                        "{MAX_CONNECTIONS_ENV} must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            primary_url,
            archive_url: present(ARCHIVE_URL_ENV),
            max_connections,
        })
    }

    pub fn archive_url(&self) -> &str {
        self.archive_url.as_deref().unwrap_or(&self.primary_url)
    }
}
