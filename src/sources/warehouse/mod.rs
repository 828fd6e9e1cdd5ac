// src/sources/warehouse/mod.rs
//
// Warehouse bundle: surplus transfers from one workbook, inventory and
// movements from the store workbook. A missing file or sheet nulls out its
// section instead of failing the run.

pub mod inventory;
pub mod movements;
pub mod surplus;

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use super::available;
use crate::fetch::{open_workbook, SheetLayout, WorkbookSource};
use crate::output::{generated_at, write_bundle};
use crate::schema::Sheet;

pub use inventory::InventoryReport;
pub use movements::MovementsReport;
pub use surplus::SurplusReport;

pub const OUTPUT_FILE: &str = "warehouse_data.json";

/// Where the workbooks live and which sheets to read.
#[derive(Debug, Clone)]
pub struct WarehouseSources {
    pub surplus_file: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
    pub surplus_sheet: String,
    pub inventory_sheet: String,
    pub movements_sheet: String,
}

impl Default for WarehouseSources {
    fn default() -> Self {
        Self {
            surplus_file: None,
            store_file: None,
            surplus_sheet: surplus::DEFAULT_SHEET.to_string(),
            inventory_sheet: inventory::DEFAULT_SHEET.to_string(),
            movements_sheet: movements::DEFAULT_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseBundle {
    pub last_updated: String,
    pub surplus_transfers: Option<SurplusReport>,
    pub inventory: Option<InventoryReport>,
    pub movements: Option<MovementsReport>,
}

fn open(path: Option<&Path>, what: &str) -> Result<Option<Box<dyn WorkbookSource>>> {
    let Some(path) = path else {
        warn!("{what} workbook not configured, section left empty");
        return Ok(None);
    };
    available(open_workbook(path), what)
}

fn read(
    wb: &mut Option<Box<dyn WorkbookSource>>,
    name: &str,
    layout: &SheetLayout,
) -> Result<Option<Sheet>> {
    match wb {
        Some(wb) => available(wb.sheet(name, layout), name),
        None => Ok(None),
    }
}

/// Read every section that is available. Only unexpected read failures
/// (corrupt workbook, I/O) are errors.
pub fn build_bundle(sources: &WarehouseSources, last_updated: String) -> Result<WarehouseBundle> {
    let mut surplus_wb = open(sources.surplus_file.as_deref(), "surplus")?;
    let surplus_transfers = read(&mut surplus_wb, &sources.surplus_sheet, &surplus::LAYOUT)?
        .map(|sheet| surplus::summarize(surplus::extract(&sheet)));

    let mut store_wb = open(sources.store_file.as_deref(), "store")?;
    let inventory = read(&mut store_wb, &sources.inventory_sheet, &inventory::LAYOUT)?
        .map(|sheet| inventory::summarize(inventory::extract(&sheet)));
    let movements = read(&mut store_wb, &sources.movements_sheet, &movements::LAYOUT)?
        .map(|sheet| movements::summarize(movements::extract(&sheet)));

    Ok(WarehouseBundle {
        last_updated,
        surplus_transfers,
        inventory,
        movements,
    })
}

#[instrument(level = "info", skip_all)]
pub fn export(sources: &WarehouseSources, out_dir: &Path) -> Result<PathBuf> {
    let bundle = build_bundle(sources, generated_at())?;

    if let Some(s) = &bundle.surplus_transfers {
        info!(
            transfers = s.summary.total_transfers,
            quantity = s.summary.total_quantity,
            confirmed = s.summary.confirmed_count,
            "surplus transfers"
        );
    }
    if let Some(i) = &bundle.inventory {
        info!(
            materials = i.summary.total_materials,
            received = i.summary.total_received,
            issued = i.summary.total_issued,
            balance = i.summary.total_balance,
            critical = i.summary.critical_count,
            "inventory"
        );
    }
    if let Some(m) = &bundle.movements {
        info!(
            days = m.summary.active_days,
            issued = m.summary.total_issued_quantity,
            "movements"
        );
    }

    write_bundle(out_dir, OUTPUT_FILE, &bundle)
}
