use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Installs the stderr subscriber. `RUST_LOG` applies unless `verbose` is set.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,darkflow_core=debug,darkflow=debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
