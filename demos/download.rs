//! Download a URL into the current directory with a live spinner.
//!
//! ```text
//! cargo run --example download -- http://www.ovh.net/files/1Mio.dat
//! RUST_LOG=async_downloader=debug cargo run --example download -- <url> <dir>
//! ```

use async_downloader::DownloaderBuilder;
use color_eyre::{eyre::eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| eyre!("usage: download <url> [directory]"))?;

    let mut builder = DownloaderBuilder::new().url(url);
    if let Some(directory) = args.next() {
        builder = builder.directory(directory);
    }
    let dl = builder.build()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let handle = dl.start()?;
    while !dl.is_finished() && !dl.is_aborted() {
        spinner.set_message(format!(
            "{} at {}",
            dl.pretty_total_bytes(),
            dl.pretty_speed()
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    spinner.finish_and_clear();

    let summary = handle.wait().await?;
    dl.abort_exception()?;

    println!(
        "Downloaded {} to {}",
        dl.pretty_total_bytes(),
        summary
            .output_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );

    Ok(())
}
