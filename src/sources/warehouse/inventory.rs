// src/sources/warehouse/inventory.rs
//
// Store stock summary: one row per material with received/issued/balance.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::fetch::SheetLayout;
use crate::process::aggregate::{distinct_sorted, truncate_label};
use crate::process::normalize::{clean_text, parse_number};
use crate::process::WORKBOOK_DATE_FORMATS;
use crate::schema::{FieldMap, Sheet};

pub const DEFAULT_SHEET: &str = "Sammary";
pub const LAYOUT: SheetLayout = SheetLayout::new(WORKBOOK_DATE_FORMATS);

static FIELD_MAP: FieldMap = FieldMap::new(&[
    ("S/N", "serial"),
    ("Project Name", "project"),
    ("ITEM CODE", "item_code"),
    ("MATERIALS DESCRIPTION", "description"),
    ("Size", "size"),
    ("Unit", "unit"),
    ("LOCATION", "location"),
    ("Sup Location", "sub_location"),
    ("Total Received", "received"),
    ("Total Issued", "issued"),
    ("Balance", "balance"),
]);

const TOP_BALANCE: usize = 10;
const LABEL_LIMIT: usize = 25;
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Critical,
    Zero,
    Low,
    Normal,
}

impl StockStatus {
    /// Low means under a fifth of what was received.
    pub fn classify(received: f64, balance: f64) -> Self {
        if balance < 0.0 {
            StockStatus::Critical
        } else if balance == 0.0 {
            StockStatus::Zero
        } else if received > 0.0 && balance < received * 0.2 {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub id: i64,
    pub project: Option<String>,
    pub item_code: String,
    pub description: String,
    pub size: String,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub sub_location: Option<String>,
    pub received: i64,
    pub issued: i64,
    pub balance: i64,
    pub status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_materials: usize,
    pub total_received: i64,
    pub total_issued: i64,
    pub total_balance: i64,
    pub critical_count: usize,
    pub low_count: usize,
    pub zero_count: usize,
    pub normal_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBalance {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

/// Count and balance per location, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationSeries {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    pub balances: Vec<i64>,
}

impl LocationSeries {
    fn build<'a>(items: impl Iterator<Item = (Option<&'a str>, i64)>) -> Self {
        let mut by_location: IndexMap<&str, (usize, i64)> = IndexMap::new();
        for (location, balance) in items {
            let entry = by_location.entry(location.unwrap_or(UNKNOWN)).or_default();
            entry.0 += 1;
            entry.1 += balance;
        }
        let mut series = LocationSeries::default();
        for (label, (count, balance)) in by_location {
            series.labels.push(label.to_string());
            series.counts.push(count);
            series.balances.push(balance);
        }
        series
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDistribution {
    pub labels: [&'static str; 4],
    pub counts: [usize; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub locations: Vec<String>,
    pub sub_locations: Vec<String>,
    pub units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub summary: Summary,
    pub top_balance: TopBalance,
    pub by_location: LocationSeries,
    pub by_sub_location: LocationSeries,
    pub status_distribution: StatusDistribution,
    pub filters: Filters,
    pub materials: Vec<Material>,
    pub critical_items: Vec<Material>,
}

/// `0.0` typed into a location cell means "no location".
fn location_text(value: Option<String>) -> Option<String> {
    value.filter(|v| v != "0.0")
}

pub fn extract(sheet: &Sheet) -> Vec<Material> {
    let fields = FIELD_MAP.resolve(&sheet.columns);
    let mut materials = Vec::new();

    for row in &sheet.rows {
        let p = fields.project(row);
        let serial = p.get("serial");
        if serial.is_empty() {
            continue;
        }
        let Some(description) = clean_text(p.get("description")) else {
            continue;
        };

        let received = parse_number(p.get("received"));
        let issued = parse_number(p.get("issued"));
        let balance = parse_number(p.get("balance"));

        // non-numeric serials fall back to a running index
        let id = match parse_number(serial).trunc() as i64 {
            0 => materials.len() as i64 + 1,
            n => n,
        };

        materials.push(Material {
            id,
            project: clean_text(p.get("project")),
            item_code: clean_text(p.get("item_code")).unwrap_or_default(),
            description,
            size: clean_text(p.get("size")).unwrap_or_default(),
            unit: clean_text(p.get("unit")),
            location: location_text(clean_text(p.get("location"))),
            sub_location: location_text(clean_text(p.get("sub_location"))),
            received: received.trunc() as i64,
            issued: issued.trunc() as i64,
            balance: balance.trunc() as i64,
            status: StockStatus::classify(received, balance),
        });
    }
    materials
}

pub fn summarize(materials: Vec<Material>) -> InventoryReport {
    let located = materials.iter().filter(|m| m.location.is_some()).count();
    let active: Vec<Material> = if located == 0 {
        if !materials.is_empty() {
            warn!(materials = materials.len(), "no materials carry a location, using all of them");
        }
        materials
    } else {
        materials.into_iter().filter(|m| m.location.is_some()).collect()
    };

    let count_status = |s: StockStatus| active.iter().filter(|m| m.status == s).count();
    let (critical, low, zero, normal) = (
        count_status(StockStatus::Critical),
        count_status(StockStatus::Low),
        count_status(StockStatus::Zero),
        count_status(StockStatus::Normal),
    );

    let summary = Summary {
        total_materials: active.len(),
        total_received: active.iter().map(|m| m.received).sum(),
        total_issued: active.iter().map(|m| m.issued).sum(),
        total_balance: active.iter().map(|m| m.balance).sum(),
        critical_count: critical,
        low_count: low,
        zero_count: zero,
        normal_count: normal,
    };

    let mut ranked: Vec<&Material> = active.iter().filter(|m| m.balance > 0).collect();
    ranked.sort_by(|a, b| b.balance.cmp(&a.balance));
    ranked.truncate(TOP_BALANCE);
    let top_balance = TopBalance {
        labels: ranked.iter().map(|m| truncate_label(&m.description, LABEL_LIMIT)).collect(),
        values: ranked.iter().map(|m| m.balance).collect(),
    };

    let filters = Filters {
        locations: distinct_sorted(active.iter().map(|m| m.location.as_deref())),
        sub_locations: distinct_sorted(active.iter().map(|m| m.sub_location.as_deref())),
        units: distinct_sorted(active.iter().map(|m| m.unit.as_deref())),
    };

    InventoryReport {
        summary,
        top_balance,
        by_location: LocationSeries::build(
            active.iter().map(|m| (m.location.as_deref(), m.balance)),
        ),
        by_sub_location: LocationSeries::build(
            active.iter().map(|m| (m.sub_location.as_deref(), m.balance)),
        ),
        status_distribution: StatusDistribution {
            labels: ["Critical", "Low Stock", "Zero Stock", "Normal"],
            counts: [critical, low, zero, normal],
        },
        filters,
        critical_items: active
            .iter()
            .filter(|m| m.status == StockStatus::Critical)
            .cloned()
            .collect(),
        materials: active,
    }
}
