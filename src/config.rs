use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;

/// Which durable blob store backs the database image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub storage: StorageKind,
    pub remote_api_url: Option<String>,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port_raw = std::env::var("APP_PORT").unwrap_or_else(|_| "4000".into());
        let Ok(port) = port_raw.parse::<u16>() else {
            bail!("invalid APP_PORT value: {port_raw}");
        };
        let data_dir: PathBuf = std::env::var("ALARA_DATA_DIR")
            .unwrap_or_else(|_| "data".into())
            .into();
        let storage = match std::env::var("ALARA_STORAGE")
            .unwrap_or_else(|_| "file".into())
            .as_str()
        {
            "file" => StorageKind::File,
            "memory" => StorageKind::Memory,
            other => bail!("unknown ALARA_STORAGE value: {other}"),
        };
        let remote_api_url = std::env::var("ALARA_API_URL")
            .ok()
            .filter(|v| !v.is_empty());
        let http_timeout = Duration::from_secs(
            std::env::var("ALARA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
        );
        Ok(Self {
            host,
            port,
            data_dir,
            storage,
            remote_api_url,
            http_timeout,
        })
    }
}
