use crate::util::{format_money, format_pct};
use chrono::{Month, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HotelType {
    #[serde(rename = "City Hotel")]
    City,
    #[serde(rename = "Resort Hotel")]
    Resort,
}

impl HotelType {
    pub const ALL: [HotelType; 2] = [HotelType::Resort, HotelType::City];

    pub fn label(&self) -> &'static str {
        match self {
            HotelType::City => "City Hotel",
            HotelType::Resort => "Resort Hotel",
        }
    }
}

impl fmt::Display for HotelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HotelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "City Hotel" => Ok(HotelType::City),
            "Resort Hotel" => Ok(HotelType::Resort),
            other => Err(format!("unknown hotel type '{other}'")),
        }
    }
}

pub fn status_label(is_canceled: bool) -> &'static str {
    if is_canceled {
        "Cancelled"
    } else {
        "Not Cancelled"
    }
}

pub fn month_name(number: u32) -> &'static str {
    Month::try_from(number as u8)
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

/// One row of the source file after type conversion, before cleaning.
///
/// `children` and `country` stay optional here; imputation fills them in
/// `loader::prepare`. `company` and `agent` are never materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBooking {
    /// 1-based line in the source file, kept for diagnostics.
    pub line: u64,
    pub hotel: HotelType,
    pub is_canceled: bool,
    pub lead_time: i64,
    pub arrival_date_month: Month,
    pub children: Option<f64>,
    pub country: Option<String>,
    pub adr: f64,
    pub market_segment: Option<String>,
    pub distribution_channel: Option<String>,
    pub reservation_status: String,
    pub reservation_status_date: String,
    /// Values of columns this crate does not interpret, in header order.
    pub passthrough: Vec<String>,
}

/// A row of the prepared table.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub hotel: HotelType,
    pub is_canceled: bool,
    pub lead_time: i64,
    pub arrival_date_month: Month,
    pub children: f64,
    pub country: String,
    pub adr: f64,
    pub market_segment: Option<String>,
    pub distribution_channel: Option<String>,
    pub reservation_status: String,
    pub reservation_status_date: NaiveDate,
    /// Month (1-12) of `reservation_status_date`.
    pub month: u32,
    /// Year of `reservation_status_date`.
    pub year: i32,
    pub passthrough: Vec<String>,
}

fn serialize_date<S: Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&d.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CountRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub label: String,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StatusCountRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RateRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub label: String,
    #[serde(rename = "CancellationRate")]
    #[tabled(rename = "CancellationRate", display_with = "format_pct")]
    pub rate_pct: f64,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub bookings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ShareRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub label: String,
    #[serde(rename = "Cancellations")]
    #[tabled(rename = "Cancellations")]
    pub count: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share", display_with = "format_pct")]
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AdrPoint {
    #[serde(rename = "Date", serialize_with = "serialize_date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "AvgADR")]
    #[tabled(rename = "AvgADR", display_with = "format_money")]
    pub adr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthTotalRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "TotalADR")]
    #[tabled(rename = "TotalADR", display_with = "format_money")]
    pub total_adr: f64,
}

/// Label/value pair for metric cards.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MetricRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    pub fn new(metric: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
        }
    }
}
