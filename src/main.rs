mod cli;
mod config;
mod inzoi;
mod locale;
mod logging;
mod manifest;
mod report;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
