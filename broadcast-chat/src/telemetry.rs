use tracing_subscriber::{EnvFilter, fmt, fmt::MakeWriter};

/// Installs the global `fmt` subscriber. `RUST_LOG` wins over
/// `default_filter` when set.
pub fn init_tracing<W>(default_filter: &str, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .try_init();
}
