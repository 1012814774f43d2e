use std::env;
use std::error::Error;

use tracing::{error, info};

mod setup_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing::register();

    // Setup the CryptoProvider (controls core cryptography used by rustls) for the process
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        return Err("failed to install the default CryptoProvider".into());
    }

    match siem_relay_core::run(env::vars()).await {
        Ok(summary) => {
            info!(
                records = summary.records(),
                pages = summary.pages(),
                watermark_advanced = summary.watermark_advanced,
                "Exiting..."
            );
            Ok(())
        }
        Err(e) => {
            error!("{e:?}");
            Err(e.into())
        }
    }
}
