// src/config.rs

use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::fetch::DEFAULT_API_BASE;
use crate::sources::warehouse::WarehouseSources;
use crate::sources::{procurement, vendors};

#[derive(Debug, Parser)]
#[command(name = "sheetsync")]
#[command(about = "Turn procurement and warehouse spreadsheets into dashboard JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory the JSON bundles are written to
    #[arg(long, global = true, default_value = "data")]
    pub output_dir: PathBuf,

    /// Year for the monthly procurement series (defaults to the current year)
    #[arg(long, global = true)]
    pub target_year: Option<i32>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub smartsheet: SmartsheetArgs,

    #[command(flatten)]
    pub warehouse: WarehouseArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export the PR-to-PO report to pr_data.json
    Procurement,
    /// Export vendor evaluations to vendor_data.json
    Vendors,
    /// Export surplus, inventory and movements to warehouse_data.json
    Warehouse,
    /// Run every export in turn
    All,
}

#[derive(Debug, Args)]
pub struct SmartsheetArgs {
    /// API access token
    #[arg(long, global = true, env = "SMARTSHEET_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, global = true, default_value_t = procurement::DEFAULT_SHEET_ID)]
    pub pr_sheet_id: u64,

    #[arg(long, global = true, default_value_t = vendors::DEFAULT_SHEET_ID)]
    pub vendor_sheet_id: u64,
}

#[derive(Debug, Args)]
pub struct WarehouseArgs {
    /// Surplus transfer workbook (.xlsx, or a directory of <sheet>.csv)
    #[arg(long, global = true)]
    pub surplus_file: Option<PathBuf>,

    /// Store movement workbook (.xlsx, or a directory of <sheet>.csv)
    #[arg(long, global = true)]
    pub store_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "OCT 25")]
    pub surplus_sheet: String,

    #[arg(long, global = true, default_value = "Sammary")]
    pub inventory_sheet: String,

    #[arg(long, global = true, default_value = "Issued Materials")]
    pub movements_sheet: String,
}

impl Cli {
    pub fn target_year(&self) -> i32 {
        self.target_year.unwrap_or_else(|| Local::now().year())
    }
}

impl From<&WarehouseArgs> for WarehouseSources {
    fn from(args: &WarehouseArgs) -> Self {
        Self {
            surplus_file: args.surplus_file.clone(),
            store_file: args.store_file.clone(),
            surplus_sheet: args.surplus_sheet.clone(),
            inventory_sheet: args.inventory_sheet.clone(),
            movements_sheet: args.movements_sheet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["sheetsync", "warehouse"]).unwrap();
        assert!(matches!(cli.command, Command::Warehouse));
        assert_eq!(cli.output_dir, PathBuf::from("data"));
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert_eq!(cli.smartsheet.pr_sheet_id, 5789339180027780);
        assert_eq!(cli.smartsheet.vendor_sheet_id, 1185309157969796);
        assert_eq!(cli.smartsheet.api_base, DEFAULT_API_BASE);
        assert_eq!(cli.target_year(), Local::now().year());

        let sources = WarehouseSources::from(&cli.warehouse);
        assert_eq!(sources.surplus_sheet, "OCT 25");
        assert_eq!(sources.inventory_sheet, "Sammary");
        assert_eq!(sources.movements_sheet, "Issued Materials");
        assert!(sources.store_file.is_none());
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sheetsync",
            "all",
            "--target-year",
            "2024",
            "--output-dir",
            "out",
            "--store-file",
            "store.xlsx",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::All));
        assert_eq!(cli.target_year(), 2024);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.warehouse.store_file, Some(PathBuf::from("store.xlsx")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
