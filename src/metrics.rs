//! Aggregation primitives shared by every page.
//!
//! All functions are pure: they read bookings and return small owned views.
//! Groups with no rows never appear in the output.

use crate::error::{HotelError, Result};
use crate::types::Booking;
use crate::util::round1;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::RangeInclusive;

/// How category counts are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    /// By key, for numeric and canonically ordered categories.
    KeyAscending,
    /// Most frequent first; ties keep the order categories were first seen.
    CountDescending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRate<K> {
    pub key: K,
    /// Cancelled share of the group in percent, one decimal.
    pub rate_pct: f64,
    pub bookings: usize,
    pub cancelled: usize,
}

/// Tally keys in first-encounter order. `None` keys are skipped.
fn tally<'a, K, I, F>(rows: I, key: F) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&Booking) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for b in rows {
        let Some(k) = key(b) else { continue };
        match slots.get(&k) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(k.clone(), counts.len());
                counts.push((k, 1));
            }
        }
    }
    counts
}

/// Count rows per category.
pub fn count_by<'a, K, I, F>(rows: I, key: F, order: CategoryOrder) -> Vec<(K, usize)>
where
    K: Ord + Hash + Clone,
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&Booking) -> Option<K>,
{
    let mut counts = tally(rows, key);
    match order {
        CategoryOrder::KeyAscending => counts.sort_by(|a, b| a.0.cmp(&b.0)),
        // `sort_by` is stable, so equal counts stay in encounter order.
        CategoryOrder::CountDescending => counts.sort_by(|a, b| b.1.cmp(&a.1)),
    }
    counts
}

/// Cancellation rate per category.
///
/// With `top_n`, only the `top_n` most frequent categories (by raw booking
/// count) are kept before rates are computed. Output is sorted by rate,
/// highest first.
pub fn cancellation_rate_by<'a, K, I, F>(rows: I, key: F, top_n: Option<usize>) -> Vec<GroupRate<K>>
where
    K: Ord + Hash + Clone,
    I: IntoIterator<Item = &'a Booking> + Clone,
    F: Fn(&Booking) -> Option<K>,
{
    let mut frequent = count_by(rows.clone(), &key, CategoryOrder::CountDescending);
    if let Some(n) = top_n {
        frequent.truncate(n);
    }
    let mut cancelled: HashMap<K, usize> = frequent.iter().map(|(k, _)| (k.clone(), 0)).collect();
    for b in rows.into_iter().filter(|b| b.is_canceled) {
        let Some(k) = key(b) else { continue };
        if let Some(slot) = cancelled.get_mut(&k) {
            *slot += 1;
        }
    }

    let mut rates: Vec<GroupRate<K>> = frequent
        .into_iter()
        .map(|(k, bookings)| {
            let c = cancelled.get(&k).copied().unwrap_or(0);
            GroupRate {
                rate_pct: percent(c, bookings),
                key: k,
                bookings,
                cancelled: c,
            }
        })
        .collect();
    rates.sort_by(|a, b| b.rate_pct.total_cmp(&a.rate_pct));
    rates
}

/// The `n` categories with the most cancelled bookings.
pub fn top_cancelled<'a, K, I, F>(rows: I, key: F, n: usize) -> Vec<(K, usize)>
where
    K: Ord + Hash + Clone,
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&Booking) -> Option<K>,
{
    let mut ranked = count_by(
        rows.into_iter().filter(|b| b.is_canceled),
        key,
        CategoryOrder::CountDescending,
    );
    ranked.truncate(n);
    ranked
}

/// Mean ADR per reservation-status date, ascending by date. `years`
/// restricts rows by status-date year (inclusive) before grouping.
pub fn mean_adr_by_date<'a, I>(rows: I, years: Option<RangeInclusive<i32>>) -> Vec<(NaiveDate, f64)>
where
    I: IntoIterator<Item = &'a Booking>,
{
    let mut groups: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for b in rows {
        if let Some(range) = &years {
            if !range.contains(&b.year) {
                continue;
            }
        }
        let e = groups.entry(b.reservation_status_date).or_insert((0.0, 0));
        e.0 += b.adr;
        e.1 += 1;
    }
    groups
        .into_iter()
        .map(|(date, (sum, n))| (date, sum / n as f64))
        .collect()
}

/// Sum of ADR per category, ascending by key.
pub fn sum_adr_by<'a, K, I, F>(rows: I, key: F) -> Vec<(K, f64)>
where
    K: Ord,
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&Booking) -> Option<K>,
{
    let mut groups: BTreeMap<K, f64> = BTreeMap::new();
    for b in rows {
        if let Some(k) = key(b) {
            *groups.entry(k).or_insert(0.0) += b.adr;
        }
    }
    groups.into_iter().collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    round1(part as f64 * 100.0 / whole as f64)
}

/// Number of bookings.
pub fn booking_count(rows: &[Booking]) -> Result<usize> {
    if rows.is_empty() {
        return Err(HotelError::EmptyDataset {
            metric: "booking count",
        });
    }
    Ok(rows.len())
}

/// Share of cancelled bookings in percent, one decimal.
pub fn cancellation_rate<'a, I>(rows: I) -> Result<f64>
where
    I: IntoIterator<Item = &'a Booking>,
{
    let (mut total, mut cancelled) = (0usize, 0usize);
    for b in rows {
        total += 1;
        cancelled += usize::from(b.is_canceled);
    }
    if total == 0 {
        return Err(HotelError::EmptyDataset {
            metric: "cancellation rate",
        });
    }
    Ok(percent(cancelled, total))
}

/// Arithmetic mean of `value` over `rows`.
pub fn mean_of<'a, I, F>(rows: I, metric: &'static str, value: F) -> Result<f64>
where
    I: IntoIterator<Item = &'a Booking>,
    F: Fn(&Booking) -> f64,
{
    let (mut sum, mut n) = (0.0, 0usize);
    for b in rows {
        sum += value(b);
        n += 1;
    }
    if n == 0 {
        return Err(HotelError::EmptyDataset { metric });
    }
    Ok(sum / n as f64)
}

pub fn mean_adr<'a, I>(rows: I) -> Result<f64>
where
    I: IntoIterator<Item = &'a Booking>,
{
    mean_of(rows, "mean ADR", |b| b.adr)
}

/// A metric split by cancellation status. A side with no rows has no value;
/// the other side still does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSplit {
    pub metric: &'static str,
    pub cancelled: Option<f64>,
    pub not_cancelled: Option<f64>,
}

impl StatusSplit {
    fn of<F>(rows: &[Booking], metric: &'static str, value: F) -> Self
    where
        F: Fn(&Booking) -> f64,
    {
        Self {
            metric,
            cancelled: mean_of(rows.iter().filter(|b| b.is_canceled), metric, &value).ok(),
            not_cancelled: mean_of(rows.iter().filter(|b| !b.is_canceled), metric, &value).ok(),
        }
    }

    /// Value for one side, or `EmptyDataset` when that side has no rows.
    pub fn side(&self, canceled: bool) -> Result<f64> {
        let value = if canceled {
            self.cancelled
        } else {
            self.not_cancelled
        };
        value.ok_or(HotelError::EmptyDataset {
            metric: self.metric,
        })
    }

    pub fn difference(&self) -> Option<f64> {
        Some(self.cancelled? - self.not_cancelled?)
    }

    /// Difference relative to the not-cancelled value, in percent.
    pub fn difference_pct(&self) -> Option<f64> {
        let base = self.not_cancelled?;
        if base == 0.0 {
            None
        } else {
            Some(self.difference()? / base * 100.0)
        }
    }
}

pub fn mean_adr_by_status(rows: &[Booking]) -> StatusSplit {
    StatusSplit::of(rows, "mean ADR", |b| b.adr)
}

pub fn mean_lead_time_by_status(rows: &[Booking]) -> StatusSplit {
    StatusSplit::of(rows, "mean lead time", |b| b.lead_time as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HotelType;
    use chrono::{Datelike, Month};

    fn booking(country: &str, canceled: bool, adr: f64, date: (i32, u32, u32)) -> Booking {
        let d = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        Booking {
            hotel: HotelType::City,
            is_canceled: canceled,
            lead_time: 10,
            arrival_date_month: Month::July,
            children: 0.0,
            country: country.to_string(),
            adr,
            market_segment: None,
            distribution_channel: None,
            reservation_status: String::from("Check-Out"),
            reservation_status_date: d,
            month: d.month(),
            year: d.year(),
            passthrough: Vec::new(),
        }
    }

    #[test]
    fn count_descending_keeps_encounter_order_on_ties() {
        let rows = vec![
            booking("ESP", false, 90.0, (2016, 1, 1)),
            booking("FRA", false, 90.0, (2016, 1, 1)),
            booking("PRT", false, 90.0, (2016, 1, 1)),
            booking("PRT", true, 90.0, (2016, 1, 1)),
        ];
        let counts = count_by(&rows, |b| Some(b.country.clone()), CategoryOrder::CountDescending);
        let keys: Vec<&str> = counts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["PRT", "ESP", "FRA"]);
    }

    #[test]
    fn rate_is_restricted_to_most_booked_categories() {
        // GBR is rarely booked but always cancelled; it must not displace
        // the frequent categories when only the top two are requested.
        let mut rows = Vec::new();
        for i in 0..4 {
            rows.push(booking("PRT", i < 3, 80.0, (2016, 2, 1)));
            rows.push(booking("ESP", i < 1, 80.0, (2016, 2, 1)));
        }
        rows.push(booking("GBR", true, 80.0, (2016, 2, 1)));
        let rates = cancellation_rate_by(&rows, |b| Some(b.country.clone()), Some(2));
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].key, "PRT");
        assert_eq!(rates[0].rate_pct, 75.0);
        assert_eq!(rates[1].key, "ESP");
        assert_eq!(rates[1].rate_pct, 25.0);
    }

    #[test]
    fn year_filter_is_inclusive() {
        let rows = vec![
            booking("PRT", true, 100.0, (2015, 12, 31)),
            booking("PRT", true, 100.0, (2016, 1, 1)),
            booking("PRT", true, 50.0, (2016, 1, 1)),
            booking("PRT", true, 70.0, (2017, 12, 31)),
        ];
        let series = mean_adr_by_date(&rows, Some(2016..=2017));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1, 75.0);
        assert_eq!(series[1].1, 70.0);
    }

    #[test]
    fn status_split_keeps_the_populated_side() {
        let rows = vec![booking("PRT", true, 100.0, (2016, 1, 1))];
        let split = mean_adr_by_status(&rows);
        assert_eq!(split.cancelled, Some(100.0));
        assert_eq!(split.not_cancelled, None);
        assert_eq!(split.difference(), None);
        assert_eq!(split.difference_pct(), None);
        assert!(matches!(
            split.side(false),
            Err(HotelError::EmptyDataset { metric: "mean ADR" })
        ));
    }
}
