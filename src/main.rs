//! licenselog server binary.

use licenselog::{LicenseLogError, LoggerConfig};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LICENSELOG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LICENSELOG_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), LicenseLogError> {
    init_tracing();

    let config = LoggerConfig::from_env()?;
    if let Err(e) = licenselog::server::serve(config).await {
        error!(error = %e, "license logger exited with error");
        return Err(e);
    }
    Ok(())
}
