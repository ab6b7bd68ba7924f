//! Registration Bot Example
//!
//! A WhatsApp bot showing the pieces of the Chirp framework together:
//!
//! - a four step `registration` scene that collects a name and an email
//! - `command` and `hears` routes, including regex triggers
//! - media replies and reply-button keyboards
//! - a global error handler that tells the user something went wrong
//!
//! # Usage
//!
//! ```bash
//! export CHIRP_WHATSAPP__ACCESS_TOKEN=...
//! export CHIRP_WHATSAPP__PHONE_NUMBER_ID=...
//! export CHIRP_WHATSAPP__VERIFY_TOKEN=...
//! cargo run --package registration-bot -- --config chirp.toml
//! ```

mod bot;

use std::path::PathBuf;

use anyhow::Result;
use chirp::prelude::*;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "registration-bot")]
#[command(about = "WhatsApp registration bot built on Chirp")]
struct Cli {
    /// Configuration file (defaults to searching for chirp.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`
    #[arg(long, short)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ChirpRuntime::builder();
    if let Some(path) = cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = cli.profile {
        builder = builder.profile(profile);
    }
    let mut runtime = builder.build().await?;

    bot::install(runtime.dispatcher_mut())?;
    info!(
        middleware = runtime.dispatcher().middleware_count(),
        "Registration bot ready"
    );

    runtime.run().await?;
    Ok(())
}
