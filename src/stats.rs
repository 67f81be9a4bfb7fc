//! Pure derivations over cached collections. No I/O, no mutation of input;
//! empty inputs produce empty or zeroed outputs, never errors.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{Donation, Donor, Personnel};

/// Client-side counterpart of the backend's `/stats/summary`, computed from
/// whatever is cached so the dashboard still renders when the aggregate
/// endpoint is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub donor_count: usize,
    pub donation_count: usize,
    pub total_amount: Decimal,
    pub employee_count: usize,
    pub volunteer_count: usize,
}

pub fn summarize(donors: &[Donor], donations: &[Donation], personnel: &[Personnel]) -> Summary {
    Summary {
        donor_count: donors.len(),
        donation_count: donations.len(),
        total_amount: donations
            .iter()
            .filter_map(|d| d.amount)
            .sum::<Decimal>(),
        employee_count: personnel.iter().filter(|p| p.is_employee).count(),
        volunteer_count: personnel.iter().filter(|p| p.is_volunteer).count(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    /// `YYYY-MM`.
    pub month: String,
    pub total_amount: Decimal,
    pub count: u32,
}

/// One bucket per calendar month present in the input, chronologically
/// ascending. Months absent from the input are never fabricated; donations
/// without a date are excluded.
pub fn monthly_series(donations: &[Donation]) -> Vec<MonthBucket> {
    let mut buckets: Vec<MonthBucket> = Vec::new();
    for donation in donations {
        let Some(date) = donation.date else { continue };
        let month = date.format("%Y-%m").to_string();
        let amount = donation.amount.unwrap_or_default();
        match buckets.iter_mut().find(|b| b.month == month) {
            Some(bucket) => {
                bucket.total_amount += amount;
                bucket.count += 1;
            }
            None => buckets.push(MonthBucket {
                month,
                total_amount: amount,
                count: 1,
            }),
        }
    }
    buckets.sort_by(|a, b| a.month.cmp(&b.month));
    buckets
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySlice {
    pub name: String,
    pub amount: Decimal,
}

/// Summed amount per category, ranked descending; ties keep the order the
/// categories first appeared in the input. Uncategorized donations count
/// under "Other".
pub fn by_category(donations: &[Donation]) -> Vec<CategorySlice> {
    let mut slices: Vec<CategorySlice> = Vec::new();
    for donation in donations {
        let name = donation
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Other".to_string());
        let amount = donation.amount.unwrap_or_default();
        match slices.iter_mut().find(|s| s.name == name) {
            Some(slice) => slice.amount += amount,
            None => slices.push(CategorySlice { name, amount }),
        }
    }
    // Stable sort: equal amounts preserve first-seen order.
    slices.sort_by(|a, b| b.amount.cmp(&a.amount));
    slices
}

/// Proportional bar height for chart rendering. Zero (never NaN or infinite)
/// when the series is empty or the maximum is not positive.
pub fn bar_height_percent(value: Decimal, max: Decimal) -> f64 {
    if max <= Decimal::ZERO {
        return 0.0;
    }
    let ratio = value / max * Decimal::from(100);
    ratio.to_f64().unwrap_or(0.0)
}

/// The `n` records with the greatest key, descending; ties keep their
/// original relative order.
pub fn top_n<'a, T, K, F>(records: &'a [T], n: usize, key: F) -> Vec<&'a T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut ranked: Vec<&T> = records.iter().collect();
    ranked.sort_by(|a, b| key(b).cmp(&key(a)));
    ranked.truncate(n);
    ranked
}

/// Mean donation amount; zero for an empty input.
pub fn average_donation(donations: &[Donation]) -> Decimal {
    if donations.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = donations.iter().filter_map(|d| d.amount).sum();
    total / Decimal::from(donations.len() as i64)
}

/// Donor counts per demographic segment, first-seen order.
pub fn donor_type_distribution(donors: &[Donor]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for donor in donors {
        let segment = donor
            .demographic_segment
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Other".to_string());
        match counts.iter_mut().find(|(name, _)| *name == segment) {
            Some((_, count)) => *count += 1,
            None => counts.push((segment, 1)),
        }
    }
    counts
}

/// Percent change of each month against the one before it; the first bucket
/// (and any bucket following a zero month) reports zero growth.
pub fn monthly_growth(series: &[MonthBucket]) -> Vec<(String, f64)> {
    series
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let growth = if i == 0 {
                0.0
            } else {
                let prev = series[i - 1].total_amount;
                if prev <= Decimal::ZERO {
                    0.0
                } else {
                    let delta = (bucket.total_amount - prev) / prev * Decimal::from(100);
                    delta.to_f64().unwrap_or(0.0)
                }
            };
            (bucket.month.clone(), growth)
        })
        .collect()
}

/// Most recent donations first; undated donations sort last.
pub fn recent_donations<'a>(donations: &'a [Donation], n: usize) -> Vec<&'a Donation> {
    let mut sorted: Vec<&Donation> = donations.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.truncate(n);
    sorted
}
