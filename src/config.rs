use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::trainer::filter::DEFAULT_BATCH_SIZE;
use crate::trainer::session::DEFAULT_PRIMARY_LANGUAGE;

const DEFAULT_WORD_LISTS_DIR: &str = "word_lists";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub word_lists_dir: PathBuf,
    pub primary_language: String,
    pub filter_batch_size: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let word_lists_dir = std::env::var("WORD_LISTS_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_word_lists_dir);

        let primary_language = std::env::var("PRIMARY_LANGUAGE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_PRIMARY_LANGUAGE.to_string());

        let filter_batch_size = std::env::var("FILTER_BATCH_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        Self {
            host,
            port,
            log_level,
            word_lists_dir,
            primary_language,
            filter_batch_size,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// `./word_lists` when present, otherwise the per-user data directory.
fn default_word_lists_dir() -> PathBuf {
    let local = PathBuf::from(DEFAULT_WORD_LISTS_DIR);
    if local.is_dir() {
        return local;
    }
    dirs::data_dir()
        .map(|dir| dir.join("vocab-trainer").join(DEFAULT_WORD_LISTS_DIR))
        .unwrap_or(local)
}
