use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::tmdb::TMDB_BASE;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND: &str = "0.0.0.0:3146";

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads configuration from the process environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = get("TMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let tmdb_base_url = get("TMDB_BASE_URL").unwrap_or_else(|| TMDB_BASE.to_string());
        let data_dir = get("CINESTREAM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let bind_raw = get("CINESTREAM_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse()
            .with_context(|| format!("CINESTREAM_BIND is not a socket address: {bind_raw}"))?;

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            data_dir,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_api_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("TMDB_API_KEY"));
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&[("TMDB_API_KEY", "abc")])).expect("config");
        assert_eq!(config.tmdb_base_url, TMDB_BASE);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.bind_addr.port(), 3146);
    }

    #[test]
    fn rejects_bad_bind_address() {
        let result = Config::from_lookup(lookup(&[
            ("TMDB_API_KEY", "abc"),
            ("CINESTREAM_BIND", "not-an-addr"),
        ]));
        assert!(result.is_err());
    }
}
