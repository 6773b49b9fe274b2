use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_DB_PATH: &str = "./data/contexts.db";
const DEFAULT_FILES_ROOT: &str = "./data/files";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub files_root: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `CONTEXT_BIND_ADDR` (optional, default 127.0.0.1:8787): HTTP listen address
    /// - `CONTEXT_DB_PATH` (optional, default ./data/contexts.db): SQLite file for contexts
    /// - `CONTEXT_FILES_ROOT` (optional, default ./data/files): blob store directory
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let bind_addr = lookup("CONTEXT_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|_| "CONTEXT_BIND_ADDR must be a socket address like 127.0.0.1:8787".to_string())?;

        let db_path = lookup("CONTEXT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let files_root = lookup("CONTEXT_FILES_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILES_ROOT));

        Ok(Self {
            bind_addr,
            db_path,
            files_root,
        })
    }
}
