// src/sources/warehouse/movements.rs
//
// Daily issuance grid: one row per material, one column per calendar day.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::fetch::SheetLayout;
use crate::process::aggregate::{average, chart_arrays, top_n, week_start};
use crate::process::normalize::{clean_text, iso_date, parse_number};
use crate::process::WORKBOOK_DATE_FORMATS;
use crate::schema::{FieldMap, Sheet};

pub const DEFAULT_SHEET: &str = "Issued Materials";
pub const LAYOUT: SheetLayout = SheetLayout::new(WORKBOOK_DATE_FORMATS);

static FIELD_MAP: FieldMap = FieldMap::new(&[
    ("S/N", "serial"),
    ("MATERIALS DESCRIPTION", "description"),
]);

const TOP_MATERIALS: usize = 10;
const LABEL_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_issued_items: usize,
    pub total_issued_quantity: i64,
    pub active_days: usize,
    pub avg_daily_issuance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Daily {
    pub labels: Vec<String>,
    pub dates: Vec<String>,
    pub quantities: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Weekly {
    pub labels: Vec<String>,
    pub quantities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMaterials {
    pub labels: Vec<String>,
    pub quantities: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementsReport {
    pub summary: Summary,
    pub daily: Daily,
    pub weekly: Weekly,
    pub top_materials: TopMaterials,
}

/// Issued quantities folded per day and per material.
#[derive(Debug, Default)]
pub struct Issuance {
    pub per_day: BTreeMap<NaiveDate, f64>,
    pub per_material: IndexMap<String, f64>,
}

pub fn extract(sheet: &Sheet) -> Issuance {
    let fields = FIELD_MAP.resolve(&sheet.columns);
    let date_columns: Vec<_> = sheet.date_columns().map(|(c, d)| (c.id, d)).collect();
    debug!(date_columns = date_columns.len(), "issuance grid");

    let mut issuance = Issuance::default();
    for row in &sheet.rows {
        let p = fields.project(row);
        if p.get("serial").is_empty() {
            continue;
        }
        let Some(description) = clean_text(p.get("description")) else {
            continue;
        };

        let mut issued = 0.0;
        for (column, day) in &date_columns {
            let qty = parse_number(row.cell(*column));
            if qty > 0.0 {
                *issuance.per_day.entry(*day).or_default() += qty;
                issued += qty;
            }
        }
        if issued > 0.0 {
            *issuance.per_material.entry(description).or_default() += issued;
        }
    }
    issuance
}

pub fn summarize(issuance: Issuance) -> MovementsReport {
    let Issuance { per_day, per_material } = issuance;

    let total: f64 = per_day.values().sum();
    let summary = Summary {
        total_issued_items: per_material.len(),
        total_issued_quantity: total.trunc() as i64,
        active_days: per_day.len(),
        avg_daily_issuance: average(total, per_day.len()),
    };

    let mut daily = Daily::default();
    let mut per_week: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (day, qty) in &per_day {
        daily.labels.push(day.format("%b %d").to_string());
        daily.dates.push(iso_date(*day));
        daily.quantities.push(*qty);
        *per_week.entry(week_start(*day)).or_default() += qty;
    }

    let mut weekly = Weekly::default();
    for (week, qty) in per_week {
        weekly.labels.push(week.format("Week of %b %d").to_string());
        weekly.quantities.push(qty);
    }

    let (labels, quantities) = chart_arrays(&top_n(&per_material, TOP_MATERIALS), LABEL_LIMIT);

    MovementsReport {
        summary,
        daily,
        weekly,
        top_materials: TopMaterials {
            labels,
            quantities: quantities.into_iter().map(|q| q.trunc() as i64).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawValue;

    fn grid() -> Sheet {
        const E: RawValue = RawValue::Empty;
        let mut s = Sheet::from_rows(
            &["S/N", "MATERIALS DESCRIPTION", "UNIT", "06/10/2025", "08/10/2025", "13/10/2025"],
            vec![
                vec![1.0.into(), "PVC Pipe 4in".into(), "M".into(), 5.0.into(), E, "2.5".into()],
                vec![2.0.into(), "Copper Lug".into(), "PCS".into(), E, 3.0.into(), (-4.0).into()],
                vec![E, "Subtotal".into(), E, 8.0.into(), 3.0.into(), 2.5.into()],
                vec![3.0.into(), "Cable Tie".into(), "PCS".into(), E, E, E],
                vec![4.0.into(), "PVC Pipe 4in".into(), "M".into(), 1.0.into(), E, E],
            ],
        );
        for col in s.columns.iter_mut() {
            col.date = crate::process::date_parser::parse_with(&col.title, WORKBOOK_DATE_FORMATS);
        }
        s
    }

    #[test]
    fn issuance_rolls_up_by_day_week_and_material() {
        let issuance = extract(&grid());
        assert_eq!(issuance.per_material.len(), 2);
        assert_eq!(issuance.per_material["PVC Pipe 4in"], 8.5);

        let r = summarize(issuance);
        assert_eq!(r.summary.total_issued_items, 2);
        assert_eq!(r.summary.total_issued_quantity, 11);
        assert_eq!(r.summary.active_days, 3);
        assert_eq!(r.summary.avg_daily_issuance, 3.8);

        assert_eq!(r.daily.dates, ["2025-10-06", "2025-10-08", "2025-10-13"]);
        assert_eq!(r.daily.labels, ["Oct 06", "Oct 08", "Oct 13"]);
        assert_eq!(r.daily.quantities, [6.0, 3.0, 2.5]);

        assert_eq!(r.weekly.labels, ["Week of Oct 06", "Week of Oct 13"]);
        assert_eq!(r.weekly.quantities, [9.0, 2.5]);

        assert_eq!(r.top_materials.labels, ["PVC Pipe 4in", "Copper Lug"]);
        assert_eq!(r.top_materials.quantities, [8, 3]);
    }

    #[test]
    fn sheet_without_date_columns_is_empty() {
        let s = Sheet::from_rows(
            &["S/N", "MATERIALS DESCRIPTION", "Total"],
            vec![vec![1.0.into(), "PVC Pipe 4in".into(), 10.0.into()]],
        );
        let r = summarize(extract(&s));
        assert_eq!(r.summary.active_days, 0);
        assert_eq!(r.summary.avg_daily_issuance, 0.0);
        assert!(r.daily.dates.is_empty());
        assert!(r.top_materials.labels.is_empty());
    }
}
