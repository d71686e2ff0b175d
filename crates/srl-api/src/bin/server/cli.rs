//! CLI argument handling.

use std::net::IpAddr;
use std::num::NonZero;
use std::path::PathBuf;

use clap::Parser;
use url::Url;

pub fn args() -> Args {
    Args::parse()
}

#[derive(Debug, Parser)]
pub struct Args {
    /// The IP address the HTTP server will listen on.
    ///
    /// This takes precedence over the value in the configuration file.
    #[arg(long = "ip")]
    pub ip_addr: Option<IpAddr>,

    /// The port the HTTP server will listen on.
    ///
    /// This takes precedence over the value in the configuration file.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the configuration file.
    ///
    /// Will default to `./srl-api.toml` if unspecified.
    /// If that file does not exist, default configuration values will be used.
    #[arg(short, long = "config")]
    pub config_path: Option<PathBuf>,

    /// URL of the MySQL database holding the runs.
    ///
    /// This takes precedence over the value in the configuration file and `DATABASE_URL`.
    #[arg(long)]
    pub database_url: Option<Url>,

    /// How many leaderboards may be recomputed concurrently.
    #[arg(long, env = "SRL_RECOMPUTE_WORKERS")]
    pub recompute_workers: Option<NonZero<usize>>,
}

impl Args {
    /// Applies any overrides specified as CLI flags to the given config.
    pub fn apply_to_config(&self, config: &mut srl_api::Config) {
        if let Some(ip_addr) = self.ip_addr {
            config.server.ip_addr = ip_addr;
        }

        if let Some(port) = self.port {
            config.server.port = port;
        }

        if let Some(ref url) = self.database_url {
            config.srl.database.url = url.clone();
        }

        if let Some(workers) = self.recompute_workers {
            config.srl.recompute.workers = workers;
        }
    }
}
