// src/sources/warehouse/surplus.rs
//
// Surplus material transfers between projects.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::fetch::SheetLayout;
use crate::process::aggregate::{
    chart_arrays, count_by, distinct_sorted, sum_by, top_n, CountSeries,
};
use crate::process::normalize::{clean_text, iso_date, parse_date, parse_number};
use crate::process::WORKBOOK_DATE_FORMATS;
use crate::schema::{FieldMap, Sheet};

pub const DEFAULT_SHEET: &str = "OCT 25";

const HEADERS: &[&str] = &[
    "id",
    "Description",
    "Qty",
    "Store",
    "Unit",
    "From Project",
    "To Project",
    "date",
    "Remark",
];

/// The transfer log's own header row is unreliable; titles are assigned by position.
pub const LAYOUT: SheetLayout = SheetLayout::new(WORKBOOK_DATE_FORMATS).with_headers(HEADERS);

static FIELD_MAP: FieldMap = FieldMap::new(&[
    ("Description", "description"),
    ("Qty", "qty"),
    ("Store", "store"),
    ("Unit", "unit"),
    ("From Project", "from_project"),
    ("To Project", "to_project"),
    ("date", "date"),
    ("Remark", "remark"),
]);

const TOP_MATERIALS: usize = 10;
const LABEL_LIMIT: usize = 30;
const CONFIRMED: &str = "Confirmed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub id: usize,
    pub description: String,
    pub qty: i64,
    pub unit: Option<String>,
    pub store: Option<String>,
    pub from_project: Option<String>,
    pub to_project: Option<String>,
    pub date: Option<String>,
    pub remark: String,
    #[serde(skip)]
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_transfers: usize,
    pub total_quantity: i64,
    pub unique_materials: usize,
    pub active_stores: usize,
    pub confirmed_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMaterials {
    pub labels: Vec<String>,
    pub quantities: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByStore {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub stores: Vec<String>,
    pub from_projects: Vec<String>,
    pub to_projects: Vec<String>,
    pub units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurplusReport {
    pub summary: Summary,
    pub monthly: CountSeries,
    pub top_materials: TopMaterials,
    pub by_store: ByStore,
    pub filters: Filters,
    pub transfers: Vec<Transfer>,
}

pub fn extract(sheet: &Sheet) -> Vec<Transfer> {
    let fields = FIELD_MAP.resolve(&sheet.columns);
    sheet
        .rows
        .iter()
        .filter_map(|row| {
            let p = fields.project(row);
            let description = clean_text(p.get("description"))?;
            let day = parse_date(p.get("date"), WORKBOOK_DATE_FORMATS);
            Some(Transfer {
                id: row.position + 1,
                description,
                qty: parse_number(p.get("qty")).trunc() as i64,
                unit: clean_text(p.get("unit")),
                store: clean_text(p.get("store")),
                from_project: clean_text(p.get("from_project")),
                to_project: clean_text(p.get("to_project")),
                date: day.map(iso_date),
                remark: clean_text(p.get("remark")).unwrap_or_else(|| "Pending".to_string()),
                day,
            })
        })
        .collect()
}

/// Chronological `YYYY-MM` buckets, labelled `Oct 2025`.
fn monthly_series(transfers: &[Transfer]) -> CountSeries {
    let mut months: BTreeMap<NaiveDate, (usize, i64)> = BTreeMap::new();
    for t in transfers {
        let Some(first) = t.day.and_then(|d| d.with_day(1)) else {
            continue;
        };
        let entry = months.entry(first).or_default();
        entry.0 += 1;
        entry.1 += t.qty;
    }

    let mut series = CountSeries::default();
    for (month, (count, qty)) in months {
        series.push(month.format("%b %Y").to_string(), count, qty);
    }
    series
}

pub fn summarize(transfers: Vec<Transfer>) -> SurplusReport {
    let materials = sum_by(transfers.iter().map(|t| (Some(t.description.as_str()), t.qty)));
    let (labels, quantities) = chart_arrays(&top_n(&materials, TOP_MATERIALS), LABEL_LIMIT);

    let stores = count_by(transfers.iter().map(|t| t.store.as_deref()));
    let filters = Filters {
        stores: distinct_sorted(transfers.iter().map(|t| t.store.as_deref())),
        from_projects: distinct_sorted(transfers.iter().map(|t| t.from_project.as_deref())),
        to_projects: distinct_sorted(transfers.iter().map(|t| t.to_project.as_deref())),
        units: distinct_sorted(transfers.iter().map(|t| t.unit.as_deref())),
    };

    let confirmed = transfers.iter().filter(|t| t.remark == CONFIRMED).count();
    let summary = Summary {
        total_transfers: transfers.len(),
        total_quantity: transfers.iter().map(|t| t.qty).sum(),
        unique_materials: materials.len(),
        active_stores: filters.stores.len(),
        confirmed_count: confirmed,
        pending_count: transfers.len() - confirmed,
    };

    SurplusReport {
        summary,
        monthly: monthly_series(&transfers),
        top_materials: TopMaterials { labels, quantities },
        by_store: ByStore {
            labels: stores.keys().cloned().collect(),
            counts: stores.values().copied().collect(),
        },
        filters,
        transfers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawValue;
    use chrono::NaiveDateTime;

    fn sheet(rows: Vec<Vec<RawValue>>) -> Sheet {
        // the raw header titles don't matter; LAYOUT renames them
        let raw = ["#", "Item", "Quantity", "Store", "UOM", "From", "To", "Date", "Notes"];
        let mut s = Sheet::from_rows(&raw, rows);
        for (c, title) in s.columns.iter_mut().zip(HEADERS) {
            c.title = title.to_string();
        }
        s
    }

    fn transfer(desc: &str, qty: f64, store: &str, date: RawValue, remark: &str) -> Vec<RawValue> {
        let text = |s: &str| if s.is_empty() { RawValue::Empty } else { s.into() };
        vec![
            RawValue::Empty,
            text(desc),
            RawValue::Number(qty),
            text(store),
            "PCS".into(),
            "Asir Modon-1".into(),
            "Asir Modon-2".into(),
            date,
            text(remark),
        ]
    }

    fn at(s: &str) -> RawValue {
        NaiveDateTime::parse_from_str(&format!("{s} 00:00:00"), "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .into()
    }

    #[test]
    fn transfers_roll_up_by_month_store_and_material() {
        let s = sheet(vec![
            transfer("PVC Pipe 4in", 10.9, "Main Store", at("2025-10-03"), "Confirmed"),
            transfer("", 99.0, "Main Store", at("2025-10-03"), ""),
            transfer("Copper Lug", 4.0, "Site Store", "15/09/2025".into(), ""),
            transfer("PVC Pipe 4in", 5.0, "Main Store", at("2025-10-20"), "Pending"),
            transfer("Cable Tie", 1.0, "", RawValue::Empty, ""),
        ]);
        let transfers = extract(&s);
        assert_eq!(transfers.len(), 4);
        assert_eq!(transfers[1].id, 3);
        assert_eq!(transfers[0].qty, 10);
        assert_eq!(transfers[1].date.as_deref(), Some("2025-09-15"));
        assert_eq!(transfers[1].remark, "Pending");

        let r = summarize(transfers);
        assert_eq!(r.summary.total_transfers, 4);
        assert_eq!(r.summary.total_quantity, 20);
        assert_eq!(r.summary.unique_materials, 3);
        assert_eq!(r.summary.active_stores, 2);
        assert_eq!((r.summary.confirmed_count, r.summary.pending_count), (1, 3));

        assert_eq!(r.monthly.labels(), ["Sep 2025", "Oct 2025"]);
        assert_eq!(r.monthly.counts(), [1, 2]);
        assert_eq!(r.monthly.quantities(), [4, 15]);

        assert_eq!(r.top_materials.labels, ["PVC Pipe 4in", "Copper Lug", "Cable Tie"]);
        assert_eq!(r.top_materials.quantities, [15, 4, 1]);
        assert_eq!(r.by_store.labels, ["Main Store", "Site Store"]);
        assert_eq!(r.by_store.counts, [2, 1]);
        assert_eq!(r.filters.units, ["PCS"]);
    }

    #[test]
    fn long_material_names_are_shortened_in_charts_only() {
        let long = "GALVANIZED STEEL CABLE TRAY 300MM WITH COVER";
        let rows = vec![transfer(long, 2.0, "Main Store", RawValue::Empty, "")];
        let r = summarize(extract(&sheet(rows)));
        assert_eq!(r.top_materials.labels[0], "GALVANIZED STEEL CABLE TRAY 30...");
        assert_eq!(r.transfers[0].description, long);
        assert!(r.monthly.is_empty());
    }
}
