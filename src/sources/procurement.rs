// src/sources/procurement.rs
//
// PR-to-PO report: purchase requests from the spreadsheet service, rolled up
// into status counts, a target-year monthly breakdown, value totals, rankings
// and per-agent stats.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::fetch::SmartsheetClient;
use crate::output::{generated_at, write_bundle};
use crate::process::aggregate::{
    average, count_by, distinct_sorted, rate, sum_by, top_n, MonthlyCounts, MONTH_LABELS,
};
use crate::process::normalize::{
    clean_text, iso_date, parse_date, parse_nonzero, parse_number, round_to,
};
use crate::process::SERVICE_DATE_FORMATS;
use crate::schema::{FieldMap, Projection, Sheet};

pub const OUTPUT_FILE: &str = "pr_data.json";
pub const DEFAULT_SHEET_ID: u64 = 5789339180027780;

const TOP_N: usize = 15;

const APPROVED: &str = "APPROVED";
const RETURNED: &str = "RETURNED";
const REJECTED: &str = "REJECTED";
const IN_PROCESS: &str = "IN PROCESS";
const INCOMPLETE: &str = "INCOMPLETE";

pub static FIELD_MAP: FieldMap = FieldMap::new(&[
    ("S.No", "serial_no"),
    ("Project Name", "project"),
    ("PR Num", "pr_num"),
    ("Description", "description"),
    ("PR Status", "status"),
    ("PR Closed", "pr_closed"),
    ("PR Submission Date", "submission_date"),
    ("Pending With", "pending_with"),
    ("Pending Since", "pending_since"),
    ("PR Approved Date", "approved_date"),
    ("PR Return Date", "return_date"),
    ("PR Reject Date", "reject_date"),
    ("PR Note", "pr_note"),
    ("PR Value", "pr_value"),
    ("PO Num", "po_num"),
    ("Revision Num", "revision_num"),
    ("PO Type", "po_type"),
    ("Vendor Name", "vendor"),
    ("Currency Code", "currency"),
    ("PO Value", "po_value"),
    ("PO Status", "po_status"),
    ("PO Approved Date", "po_approved_date"),
    ("Saving Amount", "saving_amount"),
    ("PR to PO in days", "pr_to_po_days"),
    ("Agent", "agent"),
]);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRequest {
    pub pr_num: String,
    pub serial_no: Option<String>,
    pub project: String,
    pub description: String,
    pub status: String,
    pub pr_closed: Option<String>,
    pub submission_date: Option<String>,
    pub approved_date: Option<String>,
    pub return_date: Option<String>,
    pub reject_date: Option<String>,
    pub vendor: Option<String>,
    pub pr_value: f64,
    pub po_num: Option<String>,
    pub revision_num: Option<String>,
    pub po_type: String,
    pub po_value: f64,
    pub po_status: String,
    pub po_approved_date: Option<String>,
    /// Zero in the sheet means the PO isn't raised yet.
    pub pr_to_po_days: Option<f64>,
    pub pr_note: String,
    pub pending_with: String,
    pub pending_since: Option<String>,
    pub agent: String,
    pub currency: String,
    pub saving_amount: f64,
    /// Submission date, else approval date; drives year/month bucketing.
    #[serde(skip)]
    pub record_date: Option<NaiveDate>,
}

impl PurchaseRequest {
    /// `None` when the row has no PR number.
    pub fn from_projection(p: &Projection<'_>) -> Option<Self> {
        let pr_num = clean_text(p.get("pr_num"))?;
        let text = |field: &str| clean_text(p.get(field));
        let text_or_blank = |field: &str| text(field).unwrap_or_default();
        let date = |field: &str| parse_date(p.get(field), SERVICE_DATE_FORMATS);

        let submission = date("submission_date");
        let approved = date("approved_date");

        Some(Self {
            pr_num,
            serial_no: text("serial_no"),
            project: text_or_blank("project"),
            description: text_or_blank("description"),
            status: text_or_blank("status"),
            pr_closed: text("pr_closed"),
            submission_date: submission.map(iso_date),
            approved_date: approved.map(iso_date),
            return_date: date("return_date").map(iso_date),
            reject_date: date("reject_date").map(iso_date),
            vendor: text("vendor"),
            pr_value: parse_number(p.get("pr_value")),
            po_num: text("po_num"),
            revision_num: text("revision_num"),
            po_type: text_or_blank("po_type"),
            po_value: parse_number(p.get("po_value")),
            po_status: text_or_blank("po_status"),
            po_approved_date: date("po_approved_date").map(iso_date),
            pr_to_po_days: parse_nonzero(p.get("pr_to_po_days")),
            pr_note: text_or_blank("pr_note"),
            pending_with: text_or_blank("pending_with"),
            pending_since: date("pending_since").map(iso_date),
            agent: text_or_blank("agent"),
            currency: text("currency").unwrap_or_else(|| "SAR".to_string()),
            saving_amount: parse_number(p.get("saving_amount")),
            record_date: submission.or(approved),
        })
    }

    pub fn year(&self) -> Option<i32> {
        self.record_date.map(|d| d.year())
    }
}

/// Project every row; rows without a PR number are dropped.
pub fn extract(sheet: &Sheet) -> Vec<PurchaseRequest> {
    let fields = FIELD_MAP.resolve(&sheet.columns);
    sheet
        .rows
        .iter()
        .filter_map(|row| PurchaseRequest::from_projection(&fields.project(row)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_prs: usize,
    pub total_approved: usize,
    pub total_returned: usize,
    pub total_rejected: usize,
    pub total_in_process: usize,
    pub total_incomplete: usize,
    pub target_year: i32,
    pub total_approved_target_year: usize,
    pub total_returned_target_year: usize,
    pub return_rate_target_year: f64,
    pub status_breakdown: IndexMap<String, usize>,
    pub avg_pr_to_po_days: f64,
    pub within_30_days: usize,
    pub after_30_days: usize,
    pub total_with_po: usize,
    pub total_pr_value: f64,
    pub total_po_value: f64,
    pub total_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Monthly {
    pub labels: [&'static str; 12],
    pub approved: MonthlyCounts,
    pub returned: MonthlyCounts,
    pub rejected: MonthlyCounts,
    pub return_rate: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filters {
    pub projects: Vec<String>,
    pub vendors: Vec<String>,
    pub agents: Vec<String>,
    pub statuses: Vec<String>,
    pub years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charts {
    pub top_projects: IndexMap<String, usize>,
    pub top_vendors: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub total: usize,
    pub approved: usize,
    pub returned: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub summary: Summary,
    pub monthly: Monthly,
    pub filters: Filters,
    pub charts: Charts,
    pub agent_stats: IndexMap<String, AgentStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcurementBundle {
    pub last_updated: String,
    pub source_sheet: Option<String>,
    pub source_sheet_id: u64,
    #[serde(flatten)]
    pub stats: Stats,
    pub all_prs: Vec<PurchaseRequest>,
}

fn monthly_breakdown(prs: &[PurchaseRequest], target_year: i32) -> Monthly {
    let mut approved = MonthlyCounts::default();
    let mut returned = MonthlyCounts::default();
    let mut rejected = MonthlyCounts::default();

    for pr in prs {
        let Some(date) = pr.record_date.filter(|d| d.year() == target_year) else {
            continue;
        };
        match pr.status.as_str() {
            APPROVED => approved.add(date),
            RETURNED => returned.add(date),
            REJECTED => rejected.add(date),
            _ => {}
        }
    }

    let return_rate = (0..12)
        .map(|m| rate(returned.get(m), approved.get(m) + returned.get(m)))
        .collect();

    Monthly {
        labels: MONTH_LABELS,
        approved,
        returned,
        rejected,
        return_rate,
    }
}

fn agent_breakdown(prs: &[PurchaseRequest]) -> IndexMap<String, AgentStats> {
    let mut agents: IndexMap<String, AgentStats> = IndexMap::new();
    for pr in prs.iter().filter(|pr| !pr.agent.is_empty()) {
        let entry = agents.entry(pr.agent.clone()).or_default();
        entry.total += 1;
        match pr.status.as_str() {
            APPROVED => entry.approved += 1,
            RETURNED => entry.returned += 1,
            REJECTED => entry.rejected += 1,
            _ => {}
        }
    }
    agents
}

/// Fold the records into every aggregate the dashboard shows.
pub fn summarize(prs: &[PurchaseRequest], target_year: i32) -> Stats {
    let status_breakdown = count_by(prs.iter().map(|pr| Some(pr.status.as_str())));
    let status_total = |s: &str| status_breakdown.get(s).copied().unwrap_or(0);

    let monthly = monthly_breakdown(prs, target_year);
    let approved_year = monthly.approved.total();
    let returned_year = monthly.returned.total();

    let days: Vec<f64> = prs.iter().filter_map(|pr| pr.pr_to_po_days).collect();

    let summary = Summary {
        total_prs: prs.len(),
        total_approved: status_total(APPROVED),
        total_returned: status_total(RETURNED),
        total_rejected: status_total(REJECTED),
        total_in_process: status_total(IN_PROCESS),
        total_incomplete: status_total(INCOMPLETE),
        target_year,
        total_approved_target_year: approved_year,
        total_returned_target_year: returned_year,
        return_rate_target_year: rate(returned_year, approved_year),
        status_breakdown: status_breakdown.clone(),
        avg_pr_to_po_days: average(days.iter().sum(), days.len()),
        within_30_days: days.iter().filter(|d| **d <= 30.0).count(),
        after_30_days: days.iter().filter(|d| **d > 30.0).count(),
        total_with_po: prs.iter().filter(|pr| pr.po_num.is_some()).count(),
        total_pr_value: round_to(prs.iter().map(|pr| pr.pr_value).sum(), 2),
        total_po_value: round_to(prs.iter().map(|pr| pr.po_value).sum(), 2),
        total_savings: round_to(prs.iter().map(|pr| pr.saving_amount).sum(), 2),
    };

    let years: BTreeSet<i32> = prs.iter().filter_map(PurchaseRequest::year).collect();
    let filters = Filters {
        projects: distinct_sorted(prs.iter().map(|pr| Some(pr.project.as_str()))),
        vendors: distinct_sorted(prs.iter().map(|pr| pr.vendor.as_deref())),
        agents: distinct_sorted(prs.iter().map(|pr| Some(pr.agent.as_str()))),
        statuses: distinct_sorted(prs.iter().map(|pr| Some(pr.status.as_str()))),
        years: years.iter().rev().map(i32::to_string).collect(),
    };

    let project_counts = count_by(prs.iter().map(|pr| Some(pr.project.as_str())));
    let vendor_values = sum_by(prs.iter().map(|pr| (pr.vendor.as_deref(), pr.po_value)));
    let charts = Charts {
        top_projects: top_n(&project_counts, TOP_N).into_iter().collect(),
        top_vendors: top_n(&vendor_values, TOP_N)
            .into_iter()
            .map(|(vendor, value)| (vendor, round_to(value, 2)))
            .collect(),
    };

    Stats {
        summary,
        monthly,
        filters,
        charts,
        agent_stats: agent_breakdown(prs),
    }
}

/// Normalize, aggregate and assemble one sheet into the output document.
pub fn build_bundle(
    sheet: &Sheet,
    sheet_id: u64,
    target_year: i32,
    last_updated: String,
) -> ProcurementBundle {
    let prs = extract(sheet);
    info!(rows = sheet.rows.len(), prs = prs.len(), "extracted purchase requests");
    let stats = summarize(&prs, target_year);
    ProcurementBundle {
        last_updated,
        source_sheet: sheet.name.clone(),
        source_sheet_id: sheet_id,
        stats,
        all_prs: prs,
    }
}

/// Fetch the PR-to-PO sheet and write `pr_data.json`.
#[instrument(level = "info", skip(client, out_dir))]
pub async fn export(
    client: &SmartsheetClient,
    sheet_id: u64,
    target_year: i32,
    out_dir: &Path,
) -> Result<PathBuf> {
    let sheet = client
        .get_sheet(sheet_id, false)
        .await
        .with_context(|| format!("fetching PR sheet {sheet_id}"))?;

    let bundle = build_bundle(&sheet, sheet_id, target_year, generated_at());
    let s = &bundle.stats.summary;
    info!(
        total = s.total_prs,
        approved = s.total_approved,
        returned = s.total_returned,
        rejected = s.total_rejected,
        in_process = s.total_in_process,
        avg_pr_to_po_days = s.avg_pr_to_po_days,
        total_pr_value = s.total_pr_value,
        total_po_value = s.total_po_value,
        total_savings = s.total_savings,
        "procurement summary"
    );

    write_bundle(out_dir, OUTPUT_FILE, &bundle)
}
