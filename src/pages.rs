//! View models for the six dashboard pages.
//!
//! Every builder is a pure function of the prepared table. Pages carry
//! plain data only; rendering lives in `output`.

use crate::error::Result;
use crate::loader::PreparedTable;
use crate::metrics::{
    self, count_by, cancellation_rate_by, mean_adr_by_date, sum_adr_by, top_cancelled,
    CategoryOrder, GroupRate, StatusSplit,
};
use crate::types::{
    month_name, status_label, AdrPoint, Booking, CountRow, HotelType, MonthTotalRow, RateRow,
    ShareRow, StatusCountRow,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Status-date years shown on the ADR-over-time chart.
pub const REVENUE_YEARS: RangeInclusive<i32> = 2016..=2017;
pub const TOP_COUNTRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Cancellations,
    Revenue,
    Geography,
    Seasonality,
    Channels,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Overview,
        Page::Cancellations,
        Page::Revenue,
        Page::Geography,
        Page::Seasonality,
        Page::Channels,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Page::Overview => "overview",
            Page::Cancellations => "cancellations",
            Page::Revenue => "revenue",
            Page::Geography => "geography",
            Page::Seasonality => "seasonality",
            Page::Channels => "channels",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Overview => "Executive Summary",
            Page::Cancellations => "Cancellation Deep Dive",
            Page::Revenue => "Revenue Analysis & Pricing Patterns",
            Page::Geography => "Geographic Patterns & International Trends",
            Page::Seasonality => "Seasonal Booking Patterns",
            Page::Channels => "Booking Channel Analysis",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Page::ALL
            .into_iter()
            .find(|p| p.slug() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Page::ALL.iter().map(Page::slug).collect();
                format!("unknown page '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Sidebar facts shown next to every page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub total_records: usize,
    pub first_year: i32,
    pub last_year: i32,
    pub countries: usize,
}

pub fn dataset_info(table: &PreparedTable) -> Result<DatasetInfo> {
    let rows = table.rows();
    let total_records = metrics::booking_count(rows)?;
    // Non-empty past this point.
    let first_year = rows.iter().map(|b| b.year).min().unwrap_or_default();
    let last_year = rows.iter().map(|b| b.year).max().unwrap_or_default();
    let countries = rows
        .iter()
        .map(|b| b.country.as_str())
        .collect::<HashSet<_>>()
        .len();
    Ok(DatasetInfo {
        total_records,
        first_year,
        last_year,
        countries,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewPage {
    pub total_bookings: usize,
    pub cancellation_rate: f64,
    pub avg_adr: f64,
    pub hotel_types: usize,
    pub status_distribution: Vec<CountRow>,
    pub by_hotel_status: Vec<StatusCountRow>,
    pub hotel_rates: Vec<RateRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationsPage {
    pub monthly: Vec<StatusCountRow>,
    pub lead_time: StatusSplitView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelSeries {
    pub hotel: String,
    pub points: Vec<AdrPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenuePage {
    pub cancelled_adr: Vec<AdrPoint>,
    pub not_cancelled_adr: Vec<AdrPoint>,
    pub adr: StatusSplitView,
    pub hotel_adr: Vec<HotelSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographyPage {
    pub top_cancelling_countries: Vec<ShareRow>,
    pub top_booking_country_rates: Vec<RateRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityPage {
    pub cancelled_adr_by_month: Vec<MonthTotalRow>,
    pub yearly: Vec<StatusCountRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelsPage {
    pub segments: Vec<CountRow>,
    pub cancelled_segments: Vec<CountRow>,
    pub segment_rates: Vec<RateRow>,
    pub channel_status: Vec<StatusCountRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSplitView {
    pub cancelled: Option<f64>,
    pub not_cancelled: Option<f64>,
    pub difference: Option<f64>,
    pub difference_pct: Option<f64>,
}

impl From<StatusSplit> for StatusSplitView {
    fn from(s: StatusSplit) -> Self {
        Self {
            cancelled: s.cancelled,
            not_cancelled: s.not_cancelled,
            difference: s.difference(),
            difference_pct: s.difference_pct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum PageView {
    Overview(OverviewPage),
    Cancellations(CancellationsPage),
    Revenue(RevenuePage),
    Geography(GeographyPage),
    Seasonality(SeasonalityPage),
    Channels(ChannelsPage),
}

pub fn build(page: Page, table: &PreparedTable) -> Result<PageView> {
    Ok(match page {
        Page::Overview => PageView::Overview(overview(table)?),
        Page::Cancellations => PageView::Cancellations(cancellations(table)),
        Page::Revenue => PageView::Revenue(revenue(table)),
        Page::Geography => PageView::Geography(geography(table)),
        Page::Seasonality => PageView::Seasonality(seasonality(table)),
        Page::Channels => PageView::Channels(channels(table)),
    })
}

fn status_rows<G: fmt::Display>(counts: Vec<((G, bool), usize)>) -> Vec<StatusCountRow> {
    counts
        .into_iter()
        .map(|((group, canceled), count)| StatusCountRow {
            group: group.to_string(),
            status: status_label(canceled).to_string(),
            count,
        })
        .collect()
}

fn rate_rows<K: fmt::Display>(rates: Vec<GroupRate<K>>) -> Vec<RateRow> {
    rates
        .into_iter()
        .map(|r| RateRow {
            label: r.key.to_string(),
            rate_pct: r.rate_pct,
            bookings: r.bookings,
        })
        .collect()
}

fn count_rows<K: fmt::Display>(counts: Vec<(K, usize)>) -> Vec<CountRow> {
    counts
        .into_iter()
        .map(|(k, count)| CountRow {
            label: k.to_string(),
            count,
        })
        .collect()
}

fn adr_points(series: Vec<(chrono::NaiveDate, f64)>) -> Vec<AdrPoint> {
    series
        .into_iter()
        .map(|(date, adr)| AdrPoint { date, adr })
        .collect()
}

pub fn overview(table: &PreparedTable) -> Result<OverviewPage> {
    let rows = table.rows();
    let total_bookings = metrics::booking_count(rows)?;
    let cancellation_rate = metrics::cancellation_rate(rows)?;
    let avg_adr = metrics::mean_adr(rows)?;

    let status_distribution = count_by(rows, |b| Some(b.is_canceled), CategoryOrder::KeyAscending)
        .into_iter()
        .map(|(canceled, count)| CountRow {
            label: status_label(canceled).to_string(),
            count,
        })
        .collect();
    let by_hotel_status = status_rows(count_by(
        rows,
        |b| Some((b.hotel, b.is_canceled)),
        CategoryOrder::KeyAscending,
    ));
    let hotel_rates = rate_rows(cancellation_rate_by(rows, |b| Some(b.hotel), None));
    let hotel_types = rows
        .iter()
        .map(|b| b.hotel)
        .collect::<HashSet<HotelType>>()
        .len();

    Ok(OverviewPage {
        total_bookings,
        cancellation_rate,
        avg_adr,
        hotel_types,
        status_distribution,
        by_hotel_status,
        hotel_rates,
    })
}

pub fn cancellations(table: &PreparedTable) -> CancellationsPage {
    let rows = table.rows();
    let lead_time = metrics::mean_lead_time_by_status(rows).into();
    let monthly = count_by(
        rows,
        |b| Some((b.month, b.is_canceled)),
        CategoryOrder::KeyAscending,
    )
    .into_iter()
    .map(|((month, canceled), count)| StatusCountRow {
        group: month_name(month).to_string(),
        status: status_label(canceled).to_string(),
        count,
    })
    .collect();
    CancellationsPage { monthly, lead_time }
}

pub fn revenue(table: &PreparedTable) -> RevenuePage {
    let rows = table.rows();
    let adr = metrics::mean_adr_by_status(rows).into();
    let cancelled_adr = adr_points(mean_adr_by_date(
        rows.iter().filter(|b| b.is_canceled),
        Some(REVENUE_YEARS),
    ));
    let not_cancelled_adr = adr_points(mean_adr_by_date(
        rows.iter().filter(|b| !b.is_canceled),
        Some(REVENUE_YEARS),
    ));
    let hotel_adr = HotelType::ALL
        .into_iter()
        .map(|hotel| HotelSeries {
            hotel: hotel.to_string(),
            points: adr_points(mean_adr_by_date(
                rows.iter().filter(|b| b.hotel == hotel),
                None,
            )),
        })
        .filter(|s| !s.points.is_empty())
        .collect();
    RevenuePage {
        cancelled_adr,
        not_cancelled_adr,
        adr,
        hotel_adr,
    }
}

pub fn geography(table: &PreparedTable) -> GeographyPage {
    let rows = table.rows();
    let top = top_cancelled(rows, |b| Some(b.country.clone()), TOP_COUNTRIES);
    let top_total: usize = top.iter().map(|(_, n)| n).sum();
    let top_cancelling_countries = top
        .into_iter()
        .enumerate()
        .map(|(i, (country, count))| ShareRow {
            rank: i + 1,
            label: country,
            count,
            // top_total > 0 whenever any entry exists.
            share_pct: count as f64 * 100.0 / top_total as f64,
        })
        .collect();
    let top_booking_country_rates = rate_rows(cancellation_rate_by(
        rows,
        |b| Some(b.country.clone()),
        Some(TOP_COUNTRIES),
    ));
    GeographyPage {
        top_cancelling_countries,
        top_booking_country_rates,
    }
}

pub fn seasonality(table: &PreparedTable) -> SeasonalityPage {
    let rows = table.rows();
    let cancelled_adr_by_month = sum_adr_by(rows.iter().filter(|b| b.is_canceled), |b| {
        Some(b.arrival_date_month.number_from_month())
    })
    .into_iter()
    .map(|(month, total_adr)| MonthTotalRow {
        month: month_name(month).to_string(),
        total_adr,
    })
    .collect();
    let yearly = status_rows(count_by(
        rows,
        |b| Some((b.year, b.is_canceled)),
        CategoryOrder::KeyAscending,
    ));
    SeasonalityPage {
        cancelled_adr_by_month,
        yearly,
    }
}

fn segment(b: &Booking) -> Option<String> {
    b.market_segment.clone()
}

pub fn channels(table: &PreparedTable) -> ChannelsPage {
    let rows = table.rows();
    let segments = count_rows(count_by(rows, segment, CategoryOrder::CountDescending));
    let cancelled_segments = count_rows(count_by(
        rows.iter().filter(|b| b.is_canceled),
        segment,
        CategoryOrder::CountDescending,
    ));
    let segment_rates = rate_rows(cancellation_rate_by(rows, segment, None));
    let channel_status = status_rows(count_by(
        rows,
        |b| {
            b.distribution_channel
                .clone()
                .map(|channel| (channel, b.is_canceled))
        },
        CategoryOrder::KeyAscending,
    ));
    ChannelsPage {
        segments,
        cancelled_segments,
        segment_rates,
        channel_status,
    }
}

/// Scalar metrics written to `summary.json` on export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub dataset: DatasetInfo,
    pub cancellation_rate: f64,
    pub avg_adr: f64,
    pub adr: StatusSplitView,
    pub lead_time: StatusSplitView,
    pub outliers_removed: usize,
    pub children_imputed: usize,
    pub countries_imputed: usize,
}

pub fn summary(table: &PreparedTable) -> Result<SummaryStats> {
    let rows = table.rows();
    let report = table.report();
    Ok(SummaryStats {
        dataset: dataset_info(table)?,
        cancellation_rate: metrics::cancellation_rate(rows)?,
        avg_adr: metrics::mean_adr(rows)?,
        adr: metrics::mean_adr_by_status(rows).into(),
        lead_time: metrics::mean_lead_time_by_status(rows).into(),
        outliers_removed: report.outliers_removed,
        children_imputed: report.children_imputed,
        countries_imputed: report.countries_imputed,
    })
}
