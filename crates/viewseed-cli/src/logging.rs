use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use viewseed_config::{LogConfig, LogFormat};

/// Install the global subscriber, writing to stderr so stdout carries only results.
///
/// `-v` flags win over `RUST_LOG`, which wins over `log.level` from the config.
pub fn init(config: &LogConfig, verbose: u8) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(config, verbose, std::io::stderr))
        .context("failed to install log subscriber")
}

fn filter(config: &LogConfig, verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    }
}

fn subscriber<W>(config: &LogConfig, verbose: u8, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config, verbose))
        .with_writer(writer)
        .with_target(false);

    match config.format {
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Json => Box::new(builder.json().finish()),
    }
}
