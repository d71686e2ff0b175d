mod server;
pub use server::ServerConfig;

pub mod tracing;
pub use tracing::TracingConfig;

mod runtime;
pub use runtime::RuntimeConfig;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Configuration for the HTTP server.
    pub server: ServerConfig,

    /// Configuration for [`tracing-subscriber`].
    pub tracing: TracingConfig,

    /// Configuration for Tokio.
    pub runtime: RuntimeConfig,

    #[serde(flatten)]
    pub srl: srl::Config,
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = toml::from_str::<Config>("").unwrap();

        assert_eq!(config.server.port, 0);
        assert!(!config.tracing.enable);
        assert!(config.runtime.worker_threads.is_none());
        assert_eq!(config.srl.points.max_full_game, 1000.0);
    }

    #[test]
    fn sections_are_parsed() {
        let config = toml::from_str::<Config>(
            r#"
            [server]
            ip-addr = "127.0.0.1"
            port = 42069

            [tracing]
            enable = true
            files.enable = true
            files.directory = "/tmp/srl-api"

            [runtime]
            worker-threads = 0
            max-blocking-threads = 16

            [points]
            max-individual-level = 300.0

            [recompute]
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.server.ip_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.server.socket_addr().port(), 42069);
        assert!(config.tracing.enable);
        assert!(config.tracing.files.enable);
        assert_eq!(config.tracing.files.directory.to_str(), Some("/tmp/srl-api"));
        assert!(config.runtime.worker_threads.is_none());
        assert_eq!(config.runtime.max_blocking_threads.map(|n| n.get()), Some(16));
        assert_eq!(config.srl.points.max_individual_level, 300.0);
        assert_eq!(config.srl.recompute.workers.get(), 2);
    }
}
