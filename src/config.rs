//! Environment-driven configuration.

use anyhow::Context;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// External order-intake endpoint the checkout forwards to.
    pub intake_url: String,
    /// Bearer token for admin status updates. Optional; without it only the
    /// shopper-facing surface is usable.
    pub admin_token: Option<String>,
    /// Directory holding one JSON snapshot per basket session.
    pub storage_dir: PathBuf,
    /// Collection groups recognized by the router, comma-separated in
    /// `COLLECTION_GROUPS`.
    pub collection_groups: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8084".to_string())
            .parse()
            .context("PORT is not a valid port number")?;
        let intake_url = env::var("INTAKE_URL").context("INTAKE_URL is required")?;
        let admin_token = env::var("ADMIN_TOKEN").ok();
        let storage_dir =
            PathBuf::from(env::var("QUOTE_STORAGE_DIR").unwrap_or_else(|_| "./quote-data".into()));
        let collection_groups = env::var("COLLECTION_GROUPS")
            .unwrap_or_else(|_| "Performance,Casuals,Corporate".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { port, intake_url, admin_token, storage_dir, collection_groups })
    }
}
