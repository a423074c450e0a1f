//! Runtime configuration, from flags or `CHAIWALA_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chaiwala", about = "Chai catalog web application", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "CHAIWALA_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// SQLite database file, created on first run.
    #[arg(long, env = "CHAIWALA_DB", default_value = "chaiwala.db")]
    pub database: PathBuf,

    /// Directory served under /media for variety images.
    #[arg(long, env = "CHAIWALA_MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// Directory served under /assets for the stylesheet.
    #[arg(long, env = "CHAIWALA_ASSETS_ROOT", default_value = "assets")]
    pub assets_root: PathBuf,

    /// Log filter, e.g. "info" or "chaiwala=debug".
    #[arg(long, env = "CHAIWALA_LOG", default_value = "info")]
    pub log_level: String,
}
