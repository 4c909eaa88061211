use anyhow::Result;
use suiterun_cli::{demo, main_with};

fn main() -> Result<()> {
    // Structured logging with an env-based filter, quiet by default
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let code = main_with(demo::registry())?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
