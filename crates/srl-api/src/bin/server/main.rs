use std::fs;
use std::path::Path;

use anyhow::Context;
use srl_api::config::TracingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer as _, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

const DEFAULT_CONFIG_PATH: &str = "./srl-api.toml";
const DEFAULT_FILTER: &str = "srl=info,srl_api=info,warn";

fn main() -> anyhow::Result<()> {
    let cli_args = cli::args();
    let mut config = if let Some(config_path) = cli_args.config_path.as_deref() {
        read_and_parse_config_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
        read_and_parse_config_file(Path::new(DEFAULT_CONFIG_PATH))?
    } else {
        srl_api::Config::default()
    };

    cli_args.apply_to_config(&mut config);

    // must outlive the server, otherwise buffered log lines are lost
    let _guard = if config.tracing.enable {
        init_tracing(&config.tracing).context("failed to initialize tracing")?
    } else {
        None
    };

    srl_api::run(config).context("failed to run API")
}

fn read_and_parse_config_file(path: &Path) -> anyhow::Result<srl_api::Config> {
    fs::read_to_string(path)
        .context("failed to read configuration file")
        .and_then(|text| toml::from_str(&text).context("failed to parse configuration file"))
}

fn init_tracing(config: &TracingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER))
            .context("invalid tracing filter")
    })?;

    let stderr = config.stderr.enable.then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.stderr.ansi)
    });

    let (files, guard) = config
        .files
        .enable
        .then(|| {
            if !config.files.directory.exists() {
                fs::create_dir_all(&config.files.directory).context("create log dir")?;
            }

            let log_dir = config
                .files
                .directory
                .canonicalize()
                .context("canonicalize log dir path")?;

            let (writer, guard) = tracing_appender::rolling::Builder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix("srl-api")
                .filename_suffix("log")
                .build(&log_dir)
                .map(tracing_appender::non_blocking)
                .context("failed to initialize logger")?;

            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false)
                .with_file(true)
                .with_level(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_writer(writer);

            anyhow::Ok((layer, guard))
        })
        .transpose()?
        .unzip();

    let layers = tracing_subscriber::Layer::and_then(stderr, files);

    tracing_subscriber::registry()
        .with(layers.with_filter(env_filter))
        .init();

    Ok(guard)
}
