use anyhow::{Context, Result};
use clap::Parser;
use sheetsync::{
    config::{Cli, Command, LogFormat},
    fetch::SmartsheetClient,
    sources::{procurement, vendors, warehouse, warehouse::WarehouseSources},
};
use std::process::ExitCode;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(format: LogFormat) {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sheetsync=info"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn client(cli: &Cli) -> Result<SmartsheetClient> {
    let token = cli
        .smartsheet
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .context("no API token: pass --token or set SMARTSHEET_TOKEN")?;
    SmartsheetClient::new(&cli.smartsheet.api_base, token)
}

async fn run(cli: &Cli) -> Result<()> {
    let out_dir = cli.output_dir.as_path();
    let target_year = cli.target_year();
    let sheets = &cli.smartsheet;

    match cli.command {
        Command::Procurement => {
            procurement::export(&client(cli)?, sheets.pr_sheet_id, target_year, out_dir).await?;
        }
        Command::Vendors => {
            vendors::export(&client(cli)?, sheets.vendor_sheet_id, out_dir).await?;
        }
        Command::Warehouse => {
            warehouse::export(&WarehouseSources::from(&cli.warehouse), out_dir)?;
        }
        Command::All => {
            let client = client(cli)?;
            procurement::export(&client, sheets.pr_sheet_id, target_year, out_dir).await?;
            vendors::export(&client, sheets.vendor_sheet_id, out_dir).await?;
            warehouse::export(&WarehouseSources::from(&cli.warehouse), out_dir)?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);
    info!(command = ?cli.command, output_dir = %cli.output_dir.display(), "startup");

    let start = Instant::now();
    match run(&cli).await {
        Ok(()) => {
            info!(elapsed = ?start.elapsed(), "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("export failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
