// src/sources/vendors.rs
//
// Vendor evaluation scores from the spreadsheet service.

use anyhow::{Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::fetch::SmartsheetClient;
use crate::output::{generated_at, write_bundle};
use crate::process::aggregate::{distinct_sorted, rate, ScoreDistribution, ScoreStats};
use crate::process::normalize::{clean_text, parse_number, round_to};
use crate::schema::{Attachment, FieldMap, Sheet};

pub const OUTPUT_FILE: &str = "vendor_data.json";
pub const DEFAULT_SHEET_ID: u64 = 1185309157969796;

pub static FIELD_MAP: FieldMap = FieldMap::new(&[
    ("Vendor Name", "name"),
    ("Vendor Category", "category"),
    ("Average %", "score"),
]);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorEvaluation {
    pub name: String,
    pub category: Option<String>,
    pub score: f64,
    pub attachments: Vec<Attachment>,
    pub row_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_vendors: usize,
    pub evaluations_requested: usize,
    pub evaluations_done: usize,
    pub evaluations_pending: usize,
    pub average_score: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorBundle {
    pub last_updated: String,
    pub source_sheet: Option<String>,
    pub source_sheet_id: u64,
    pub summary: Summary,
    pub score_distribution: ScoreDistribution,
    pub filters: Filters,
    pub vendors: Vec<VendorEvaluation>,
}

pub fn build_bundle(sheet: &Sheet, sheet_id: u64, last_updated: String) -> VendorBundle {
    let fields = FIELD_MAP.resolve(&sheet.columns);
    let mut scores = ScoreStats::default();
    let mut vendors = Vec::new();

    for row in &sheet.rows {
        let p = fields.project(row);
        let Some(name) = clean_text(p.get("name")) else {
            continue;
        };
        let score = parse_number(p.get("score"));
        scores.record(score);
        vendors.push(VendorEvaluation {
            name,
            category: clean_text(p.get("category")),
            score: round_to(score, 1),
            attachments: row.attachments.clone(),
            row_id: row.id,
        });
    }

    // sort_by is stable: equal scores keep sheet order
    vendors.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let done = scores.evaluated();
    let summary = Summary {
        total_vendors: vendors.len(),
        evaluations_requested: vendors.len(),
        evaluations_done: done,
        evaluations_pending: vendors.iter().filter(|v| v.score == 0.0).count(),
        average_score: scores.average(),
        completion_rate: rate(done, vendors.len()),
    };
    let filters = Filters {
        categories: distinct_sorted(vendors.iter().map(|v| v.category.as_deref())),
    };

    VendorBundle {
        last_updated,
        source_sheet: sheet.name.clone(),
        source_sheet_id: sheet_id,
        summary,
        score_distribution: scores.distribution(),
        filters,
        vendors,
    }
}

/// Fetch the evaluation sheet (with attachments) and write `vendor_data.json`.
#[instrument(level = "info", skip(client, out_dir))]
pub async fn export(client: &SmartsheetClient, sheet_id: u64, out_dir: &Path) -> Result<PathBuf> {
    let sheet = client
        .get_sheet(sheet_id, true)
        .await
        .with_context(|| format!("fetching vendor sheet {sheet_id}"))?;

    let bundle = build_bundle(&sheet, sheet_id, generated_at());
    info!(
        vendors = bundle.summary.total_vendors,
        evaluated = bundle.summary.evaluations_done,
        average_score = bundle.summary.average_score,
        "vendor summary"
    );
    write_bundle(out_dir, OUTPUT_FILE, &bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawValue;

    fn sheet(rows: Vec<(&str, &str, RawValue)>) -> Sheet {
        let rows = rows
            .into_iter()
            .map(|(name, category, score)| {
                let text = |s: &str| if s.is_empty() { RawValue::Empty } else { s.into() };
                vec![text(name), text(category), score]
            })
            .collect();
        let mut s = Sheet::from_rows(&["Vendor Name", "Vendor Category", "Average %"], rows);
        for (i, row) in s.rows.iter_mut().enumerate() {
            row.id = Some(100 + i as u64);
        }
        s
    }

    #[test]
    fn sorts_by_score_and_counts_evaluations() {
        let s = sheet(vec![
            ("Al Rajhi Steel", "Steel", RawValue::Number(55.0)),
            ("Gulf Cables", "Electrical", RawValue::Number(0.0)),
            ("Najd Concrete", "Civil", "82.46".into()),
            ("", "Civil", RawValue::Number(90.0)),
            ("Eastern Pipes", "Mechanical", RawValue::Number(55.0)),
            ("Sadara Trading", "", RawValue::Number(12.0)),
        ]);
        let b = build_bundle(&s, DEFAULT_SHEET_ID, "t".into());

        let names: Vec<_> = b.vendors.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            ["Najd Concrete", "Al Rajhi Steel", "Eastern Pipes", "Sadara Trading", "Gulf Cables"]
        );
        assert_eq!(b.vendors[0].score, 82.5);
        assert_eq!(b.vendors[1].row_id, Some(100));

        assert_eq!(b.summary.total_vendors, 5);
        assert_eq!(b.summary.evaluations_requested, 5);
        assert_eq!(b.summary.evaluations_done, 4);
        assert_eq!(b.summary.evaluations_pending, 1);
        assert_eq!(b.summary.completion_rate, 80.0);
        // (55 + 82.46 + 55 + 12) / 4
        assert_eq!(b.summary.average_score, 51.1);

        let d = b.score_distribution;
        let buckets = (
            d.below_20,
            d.from_20_to_40,
            d.from_40_to_60,
            d.from_60_to_70,
            d.above_70,
        );
        assert_eq!(buckets, (1, 0, 2, 0, 1));
        assert_eq!(b.filters.categories, ["Civil", "Electrical", "Mechanical", "Steel"]);
    }

    #[test]
    fn empty_sheet_has_zero_rates() {
        let b = build_bundle(&sheet(vec![]), 1, "t".into());
        assert_eq!(b.summary.total_vendors, 0);
        assert_eq!(b.summary.completion_rate, 0.0);
        assert_eq!(b.summary.average_score, 0.0);
        assert_eq!(b.score_distribution.total(), 0);
    }

    #[test]
    fn attachments_travel_with_vendor() {
        let mut s = sheet(vec![("Gulf Cables", "Electrical", RawValue::Number(71.0))]);
        s.rows[0].attachments.push(Attachment {
            id: 7,
            name: "evaluation.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 88,
        });
        let b = build_bundle(&s, 1, "t".into());
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["vendors"][0]["attachments"][0]["name"], "evaluation.pdf");
        assert_eq!(v["vendors"][0]["attachments"][0]["size"], 88);
        assert_eq!(v["score_distribution"]["above_70"], 1);
    }
}
