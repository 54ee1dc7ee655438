use crate::error::{HotelError, Result};
use crate::types::{Booking, HotelType, RawBooking};
use crate::util::{
    format_int, median, non_missing, parse_date_dayfirst, parse_f64_opt, parse_flag, parse_i64,
    quantile,
};
use chrono::{Datelike, Month};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_DATA_FILE: &str = "hotel_booking.csv";

/// Placeholder written into `country` when the source has no value.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Columns removed from the table unconditionally.
pub const DROPPED_COLUMNS: [&str; 2] = ["company", "agent"];

const HOTEL: &str = "hotel";
const IS_CANCELED: &str = "is_canceled";
const LEAD_TIME: &str = "lead_time";
const ARRIVAL_MONTH: &str = "arrival_date_month";
const CHILDREN: &str = "children";
const COUNTRY: &str = "country";
const ADR: &str = "adr";
const MARKET_SEGMENT: &str = "market_segment";
const DISTRIBUTION_CHANNEL: &str = "distribution_channel";
const RESERVATION_STATUS: &str = "reservation_status";
const RESERVATION_STATUS_DATE: &str = "reservation_status_date";

const REQUIRED_COLUMNS: [&str; 11] = [
    HOTEL,
    IS_CANCELED,
    LEAD_TIME,
    ARRIVAL_MONTH,
    CHILDREN,
    COUNTRY,
    ADR,
    MARKET_SEGMENT,
    DISTRIBUTION_CHANNEL,
    RESERVATION_STATUS,
    RESERVATION_STATUS_DATE,
];

/// Rows as read from the source, typed but not yet cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Headers of the columns carried through untouched.
    pub passthrough_headers: Vec<String>,
    pub rows: Vec<RawBooking>,
}

/// Inclusive `adr` range that survives outlier removal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl AdrBounds {
    /// Tukey fences at 1.5 IQR around the quartiles of `values`.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - 1.5 * iqr,
            upper: q3 + 1.5 * iqr,
        })
    }

    pub fn contains(&self, adr: f64) -> bool {
        adr >= self.lower && adr <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub retained_rows: usize,
    pub children_imputed: usize,
    pub children_median: Option<f64>,
    pub countries_imputed: usize,
    pub outliers_removed: usize,
    pub adr_bounds: Option<AdrBounds>,
}

/// The cleaned, outlier-filtered table every view reads from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable {
    bookings: Vec<Booking>,
    passthrough_headers: Vec<String>,
    report: LoadReport,
}

impl PreparedTable {
    /// Wrap bookings that are already clean.
    pub fn from_bookings(bookings: Vec<Booking>) -> Self {
        let n = bookings.len();
        Self {
            bookings,
            passthrough_headers: Vec::new(),
            report: LoadReport {
                total_rows: n,
                retained_rows: n,
                children_imputed: 0,
                children_median: None,
                countries_imputed: 0,
                outliers_removed: 0,
                adr_bounds: None,
            },
        }
    }

    pub fn rows(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn passthrough_headers(&self) -> &[String] {
        &self.passthrough_headers
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Open `path` and read every booking row.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| HotelError::DataUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    read_raw_from(file, path)
}

/// Read booking rows from any reader; `origin` is only used in errors.
pub fn read_raw_from<R: Read>(reader: R, origin: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_failure(e, origin, 1))?
        .clone();

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HotelError::MissingColumns(missing));
    }
    let columns = ColumnIndex::new(&index);

    let passthrough_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = h.trim();
            !REQUIRED_COLUMNS.contains(&h) && !DROPPED_COLUMNS.contains(&h)
        })
        .map(|(i, _)| i)
        .collect();
    let passthrough_headers = passthrough_idx
        .iter()
        .map(|&i| headers[i].trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        let line = rdr.position().line();
        match rdr.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(csv_failure(e, origin, line)),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(line);
        rows.push(columns.parse(&record, line, &passthrough_idx)?);
    }
    debug!("Read {} raw row(s) from {}", rows.len(), origin.display());
    Ok(RawTable {
        passthrough_headers,
        rows,
    })
}

fn csv_failure(err: csv::Error, origin: &Path, line: u64) -> HotelError {
    let line = err.position().map(|p| p.line()).unwrap_or(line);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => HotelError::DataUnavailable {
            path: origin.to_path_buf(),
            source,
        },
        other => HotelError::Parse {
            line,
            column: String::from("<record>"),
            value: String::new(),
            reason: format!("{other:?}"),
        },
    }
}

struct ColumnIndex {
    hotel: usize,
    is_canceled: usize,
    lead_time: usize,
    arrival_month: usize,
    children: usize,
    country: usize,
    adr: usize,
    market_segment: usize,
    distribution_channel: usize,
    reservation_status: usize,
    reservation_status_date: usize,
}

impl ColumnIndex {
    fn new(index: &HashMap<&str, usize>) -> Self {
        // Presence was checked against REQUIRED_COLUMNS by the caller.
        let at = |name: &str| index[name];
        Self {
            hotel: at(HOTEL),
            is_canceled: at(IS_CANCELED),
            lead_time: at(LEAD_TIME),
            arrival_month: at(ARRIVAL_MONTH),
            children: at(CHILDREN),
            country: at(COUNTRY),
            adr: at(ADR),
            market_segment: at(MARKET_SEGMENT),
            distribution_channel: at(DISTRIBUTION_CHANNEL),
            reservation_status: at(RESERVATION_STATUS),
            reservation_status_date: at(RESERVATION_STATUS_DATE),
        }
    }

    fn parse(&self, rec: &StringRecord, line: u64, passthrough: &[usize]) -> Result<RawBooking> {
        let cell = |i: usize| rec.get(i).unwrap_or("");
        let fail = |column: &str, i: usize, reason: String| HotelError::Parse {
            line,
            column: column.to_string(),
            value: cell(i).to_string(),
            reason,
        };

        let hotel = cell(self.hotel)
            .parse::<HotelType>()
            .map_err(|r| fail(HOTEL, self.hotel, r))?;
        let is_canceled =
            parse_flag(cell(self.is_canceled)).map_err(|r| fail(IS_CANCELED, self.is_canceled, r))?;
        let lead_time =
            parse_i64(cell(self.lead_time)).map_err(|r| fail(LEAD_TIME, self.lead_time, r))?;
        let arrival_date_month = cell(self.arrival_month)
            .trim()
            .parse::<Month>()
            .map_err(|_| fail(ARRIVAL_MONTH, self.arrival_month, "not a month name".into()))?;
        let children =
            parse_f64_opt(cell(self.children)).map_err(|r| fail(CHILDREN, self.children, r))?;
        let adr = parse_f64_opt(cell(self.adr))
            .map_err(|r| fail(ADR, self.adr, r))?
            .ok_or_else(|| fail(ADR, self.adr, "value is missing".into()))?;
        let text = |i: usize| non_missing(cell(i)).map(str::to_string);

        Ok(RawBooking {
            line,
            hotel,
            is_canceled,
            lead_time,
            arrival_date_month,
            children,
            country: text(self.country),
            adr,
            market_segment: text(self.market_segment),
            distribution_channel: text(self.distribution_channel),
            reservation_status: cell(self.reservation_status).trim().to_string(),
            reservation_status_date: cell(self.reservation_status_date).to_string(),
            passthrough: passthrough.iter().map(|&i| cell(i).to_string()).collect(),
        })
    }
}

/// Clean a raw table into the prepared table.
///
/// Steps run in a fixed order over the whole table: parse the status date
/// (day first), drop `company`/`agent`, impute `children` with the median,
/// impute `country` with [`UNKNOWN_COUNTRY`], remove `adr` rows outside the
/// 1.5 IQR fences, and derive `month`/`year` from the status date. Any
/// unparseable date fails the whole load.
pub fn prepare(raw: RawTable) -> Result<PreparedTable> {
    let RawTable {
        passthrough_headers,
        rows,
    } = raw;
    let total_rows = rows.len();

    let mut dated = Vec::with_capacity(rows.len());
    for row in rows {
        let date = parse_date_dayfirst(&row.reservation_status_date).ok_or_else(|| {
            HotelError::Parse {
                line: row.line,
                column: RESERVATION_STATUS_DATE.to_string(),
                value: row.reservation_status_date.clone(),
                reason: "not a day-first date".to_string(),
            }
        })?;
        dated.push((row, date));
    }

    let present: Vec<f64> = dated.iter().filter_map(|(r, _)| r.children).collect();
    let children_missing = dated.len() - present.len();
    let children_median = median(present);
    if children_missing > 0 && children_median.is_none() {
        return Err(HotelError::EmptyColumn(CHILDREN.to_string()));
    }

    let mut countries_imputed = 0usize;
    let bookings: Vec<Booking> = dated
        .into_iter()
        .map(|(row, date)| {
            let country = row.country.unwrap_or_else(|| {
                countries_imputed += 1;
                UNKNOWN_COUNTRY.to_string()
            });
            Booking {
                hotel: row.hotel,
                is_canceled: row.is_canceled,
                lead_time: row.lead_time,
                arrival_date_month: row.arrival_date_month,
                // Median exists whenever a value is missing (checked above).
                children: row.children.or(children_median).unwrap_or_default(),
                country,
                adr: row.adr,
                market_segment: row.market_segment,
                distribution_channel: row.distribution_channel,
                reservation_status: row.reservation_status,
                reservation_status_date: date,
                month: date.month(),
                year: date.year(),
                passthrough: row.passthrough,
            }
        })
        .collect();

    let adrs: Vec<f64> = bookings.iter().map(|b| b.adr).collect();
    let adr_bounds = AdrBounds::from_values(&adrs);
    let bookings: Vec<Booking> = match adr_bounds {
        Some(bounds) => bookings
            .into_iter()
            .filter(|b| bounds.contains(b.adr))
            .collect(),
        None => bookings,
    };
    let retained_rows = bookings.len();

    let report = LoadReport {
        total_rows,
        retained_rows,
        children_imputed: children_missing,
        children_median,
        countries_imputed,
        outliers_removed: total_rows - retained_rows,
        adr_bounds,
    };
    Ok(PreparedTable {
        bookings,
        passthrough_headers,
        report,
    })
}

/// Read and prepare the file at `path`.
pub fn load_prepared(path: &Path) -> Result<PreparedTable> {
    info!("Loading bookings from {}", path.display());
    let table = prepare(read_raw(path)?)?;
    let report = table.report();
    info!(
        "Prepared {} of {} row(s); {} ADR outlier(s) removed",
        format_int(report.retained_rows),
        format_int(report.total_rows),
        format_int(report.outliers_removed)
    );
    if let Some(bounds) = report.adr_bounds {
        info!(
            "ADR bounds [{:.2}, {:.2}] from Q1 {:.2} / Q3 {:.2}",
            bounds.lower, bounds.upper, bounds.q1, bounds.q3
        );
    }
    if report.children_imputed > 0 || report.countries_imputed > 0 {
        info!(
            "Imputed children for {} row(s) (median {}), country for {} row(s)",
            format_int(report.children_imputed),
            report.children_median.unwrap_or_default(),
            format_int(report.countries_imputed)
        );
    }
    Ok(table)
}
