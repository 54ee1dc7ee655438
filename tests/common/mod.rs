#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

pub const HEADER: &str = "hotel,is_canceled,lead_time,arrival_date_year,arrival_date_month,\
children,country,adr,agent,company,market_segment,distribution_channel,\
reservation_status,reservation_status_date";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// One booking line with sensible defaults; override fields per test.
#[derive(Debug, Clone)]
pub struct Row {
    pub hotel: &'static str,
    pub canceled: bool,
    pub lead_time: i64,
    pub arrival_month: &'static str,
    pub children: String,
    pub country: String,
    pub adr: f64,
    pub segment: String,
    pub channel: String,
    pub status_date: String,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            hotel: "City Hotel",
            canceled: false,
            lead_time: 30,
            arrival_month: "July",
            children: String::from("0"),
            country: String::from("PRT"),
            adr: 100.0,
            segment: String::from("Online TA"),
            channel: String::from("TA/TO"),
            status_date: String::from("01-07-2016"),
        }
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resort(mut self) -> Self {
        self.hotel = "Resort Hotel";
        self
    }

    pub fn canceled(mut self, canceled: bool) -> Self {
        self.canceled = canceled;
        self
    }

    pub fn lead_time(mut self, days: i64) -> Self {
        self.lead_time = days;
        self
    }

    pub fn children(mut self, value: &str) -> Self {
        self.children = value.to_string();
        self
    }

    pub fn country(mut self, value: &str) -> Self {
        self.country = value.to_string();
        self
    }

    pub fn adr(mut self, adr: f64) -> Self {
        self.adr = adr;
        self
    }

    pub fn segment(mut self, value: &str) -> Self {
        self.segment = value.to_string();
        self
    }

    pub fn status_date(mut self, value: &str) -> Self {
        self.status_date = value.to_string();
        self
    }

    pub fn line(&self) -> String {
        let year = self.status_date.rsplit(['-', '/']).next().unwrap_or("2016");
        let status = if self.canceled { "Canceled" } else { "Check-Out" };
        format!(
            "{},{},{},{},{},{},{},{},9,,{},{},{},{}",
            self.hotel,
            u8::from(self.canceled),
            self.lead_time,
            year,
            self.arrival_month,
            self.children,
            self.country,
            self.adr,
            self.segment,
            self.channel,
            status,
            self.status_date,
        )
    }
}

pub fn bookings_csv(rows: &[Row]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.line());
        out.push('\n');
    }
    out
}

/// `total` rows of which the first `cancelled` are cancelled, all with the
/// same ADR so no row is an outlier.
pub fn rows_with_cancellations(total: usize, cancelled: usize) -> Vec<Row> {
    (0..total)
        .map(|i| Row::new().canceled(i < cancelled))
        .collect()
}
