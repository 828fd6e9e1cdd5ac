// src/process/aggregate.rs
//
// Fold helpers shared by every export. Ordered maps keep output stable:
// `IndexMap` where first-occurrence order matters, `BTreeSet` where the
// dashboard wants sorted values.

use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::hash::Hash;

use super::normalize::round_to;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Percentage `numerator / denominator * 100` to one decimal; zero when the
/// denominator is zero.
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64 * 100.0, 1)
}

/// Mean to one decimal; zero for an empty population.
pub fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round_to(total / count as f64, 1)
}

/// Occurrences per non-empty key, in first-seen order.
pub fn count_by<'a, I>(keys: I) -> IndexMap<String, usize>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = IndexMap::new();
    for key in keys.into_iter().flatten().filter(|k| !k.is_empty()) {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Summed value per non-empty key, in first-seen order.
pub fn sum_by<'a, I, V>(pairs: I) -> IndexMap<String, V>
where
    I: IntoIterator<Item = (Option<&'a str>, V)>,
    V: Copy + Default + std::ops::AddAssign,
{
    let mut totals: IndexMap<String, V> = IndexMap::new();
    for (key, value) in pairs {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            continue;
        };
        *totals.entry(key.to_string()).or_default() += value;
    }
    totals
}

/// Highest `n` entries by value. The sort is stable, so equal values keep
/// the map's (first-seen) order.
pub fn top_n<K, V>(totals: &IndexMap<K, V>, n: usize) -> Vec<(K, V)>
where
    K: Clone + Hash + Eq,
    V: Copy + PartialOrd,
{
    let mut ranked: Vec<(K, V)> = totals.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(n);
    ranked
}

/// Shorten a display label to `limit` characters plus `...`.
pub fn truncate_label(label: &str, limit: usize) -> String {
    if label.chars().count() > limit {
        let head: String = label.chars().take(limit).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

/// Split a ranking into parallel label/value arrays for a chart.
pub fn chart_arrays<V: Copy>(ranked: &[(String, V)], label_limit: usize) -> (Vec<String>, Vec<V>) {
    ranked
        .iter()
        .map(|(label, value)| (truncate_label(label, label_limit), *value))
        .unzip()
}

/// Distinct non-empty values, ascending.
pub fn distinct_sorted<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// One counter per calendar month, January first. Always twelve entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthlyCounts([usize; 12]);

impl MonthlyCounts {
    pub fn add(&mut self, date: NaiveDate) {
        self.0[date.month0() as usize] += 1;
    }

    pub fn get(&self, month0: usize) -> usize {
        self.0[month0]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Parallel `labels`/`counts`/`quantities` arrays. Pushing is the only way
/// in, so the three always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountSeries {
    labels: Vec<String>,
    counts: Vec<usize>,
    quantities: Vec<i64>,
}

impl CountSeries {
    pub fn push(&mut self, label: impl Into<String>, count: usize, quantity: i64) {
        self.labels.push(label.into());
        self.counts.push(count);
        self.quantities.push(quantity);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn quantities(&self) -> &[i64] {
        &self.quantities
    }
}

/// Evaluation score buckets: [<20), [20,40), [40,60), [60,70), [70,∞).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub below_20: usize,
    #[serde(rename = "20_40")]
    pub from_20_to_40: usize,
    #[serde(rename = "40_60")]
    pub from_40_to_60: usize,
    #[serde(rename = "60_70")]
    pub from_60_to_70: usize,
    pub above_70: usize,
}

impl ScoreDistribution {
    pub fn total(&self) -> usize {
        self.below_20 + self.from_20_to_40 + self.from_40_to_60 + self.from_60_to_70 + self.above_70
    }
}

/// Running score distribution and average. A score of exactly zero means
/// "not evaluated yet" and is left out of both.
#[derive(Debug, Clone, Default)]
pub struct ScoreStats {
    distribution: ScoreDistribution,
    evaluated: usize,
    total: f64,
}

impl ScoreStats {
    /// Returns whether the score counted as an evaluation.
    pub fn record(&mut self, score: f64) -> bool {
        let d = &mut self.distribution;
        if score == 0.0 {
            return false;
        } else if score < 20.0 {
            d.below_20 += 1;
        } else if score < 40.0 {
            d.from_20_to_40 += 1;
        } else if score < 60.0 {
            d.from_40_to_60 += 1;
        } else if score < 70.0 {
            d.from_60_to_70 += 1;
        } else {
            d.above_70 += 1;
        }
        self.evaluated += 1;
        self.total += score;
        true
    }

    pub fn distribution(&self) -> ScoreDistribution {
        self.distribution
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    pub fn average(&self) -> f64 {
        average(self.total, self.evaluated)
    }
}
