use crate::error::Result;
use crate::loader::PreparedTable;
use crate::pages::{
    CancellationsPage, ChannelsPage, DatasetInfo, GeographyPage, OverviewPage, PageView,
    RevenuePage, SeasonalityPage, StatusSplitView,
};
use crate::types::{status_label, MetricRow};
use crate::util::{format_int, format_number};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn markdown_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return String::from("(no rows)");
    }
    let mut table = Table::new(slice).with(Style::markdown()).to_string();
    if rows.len() > max_rows {
        table.push_str(&format!("\n({} of {} rows shown)", max_rows, rows.len()));
    }
    table
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    println!("{}\n", markdown_table(rows, max_rows));
}

fn split_rows(label: &str, split: &StatusSplitView, decimals: usize, unit: &str) -> Vec<MetricRow> {
    let value = |v: Option<f64>| match v {
        Some(v) => format!("{}{unit}", format_number(v, decimals)),
        None => String::from("n/a (no bookings)"),
    };
    let mut rows = vec![
        MetricRow::new(
            format!("{label} ({})", status_label(true)),
            value(split.cancelled),
        ),
        MetricRow::new(
            format!("{label} ({})", status_label(false)),
            value(split.not_cancelled),
        ),
        MetricRow::new("Difference", value(split.difference)),
    ];
    if let Some(pct) = split.difference_pct {
        rows.push(MetricRow::new("Difference (%)", format!("{:.1}%", pct)));
    }
    rows
}

pub fn dataset_rows(info: &DatasetInfo) -> Vec<MetricRow> {
    vec![
        MetricRow::new("Total Records", format_int(info.total_records)),
        MetricRow::new(
            "Date Range",
            format!("{} - {}", info.first_year, info.last_year),
        ),
        MetricRow::new("Countries", format_int(info.countries)),
    ]
}

fn overview_cards(page: &OverviewPage) -> Vec<MetricRow> {
    vec![
        MetricRow::new("Total Bookings", format_int(page.total_bookings)),
        MetricRow::new(
            "Cancellation Rate",
            format!("{:.1}%", page.cancellation_rate),
        ),
        MetricRow::new("Avg Daily Rate", format!("${:.2}", page.avg_adr)),
        MetricRow::new("Hotel Types", page.hotel_types.to_string()),
    ]
}

/// Print a page's views as markdown tables.
pub fn render_page(view: &PageView, max_rows: usize) {
    match view {
        PageView::Overview(p) => {
            preview_table("Key Metrics", &overview_cards(p), max_rows);
            preview_table("Booking Status Distribution", &p.status_distribution, max_rows);
            preview_table("Bookings by Hotel Type and Status", &p.by_hotel_status, max_rows);
            preview_table("Cancellation Rate by Hotel Type", &p.hotel_rates, max_rows);
        }
        PageView::Cancellations(p) => {
            preview_table("Monthly Booking Trends", &p.monthly, max_rows);
            preview_table(
                "Average Lead Time (Days Before Arrival)",
                &split_rows("Lead time", &p.lead_time, 0, " days"),
                max_rows,
            );
        }
        PageView::Revenue(p) => {
            preview_table(
                "Average Daily Rate Comparison",
                &split_rows("Avg ADR", &p.adr, 2, ""),
                max_rows,
            );
            preview_table(
                "Average Daily Rate Over Time (Cancelled, 2016-2017)",
                &p.cancelled_adr,
                max_rows,
            );
            preview_table(
                "Average Daily Rate Over Time (Not Cancelled, 2016-2017)",
                &p.not_cancelled_adr,
                max_rows,
            );
            for series in &p.hotel_adr {
                preview_table(
                    &format!("Average Daily Rate Over Time ({})", series.hotel),
                    &series.points,
                    max_rows,
                );
            }
        }
        PageView::Geography(p) => {
            preview_table(
                "Top Countries with Highest Cancellations",
                &p.top_cancelling_countries,
                max_rows,
            );
            preview_table(
                "Cancellation Rate by Country (Top Booking Countries)",
                &p.top_booking_country_rates,
                max_rows,
            );
        }
        PageView::Seasonality(p) => {
            preview_table(
                "Total ADR by Month (Cancelled Bookings Only)",
                &p.cancelled_adr_by_month,
                max_rows,
            );
            preview_table("Annual Booking Trends", &p.yearly, max_rows);
        }
        PageView::Channels(p) => {
            preview_table("Market Segments (All Bookings)", &p.segments, max_rows);
            preview_table(
                "Market Segments (Cancelled Bookings Only)",
                &p.cancelled_segments,
                max_rows,
            );
            preview_table("Cancellation Rate by Market Segment", &p.segment_rates, max_rows);
            preview_table("Bookings by Distribution Channel", &p.channel_status, max_rows);
        }
    }
}

/// Write each derived view of a page as CSV under `dir`; returns the files written.
pub fn export_page(view: &PageView, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut emit = |name: &str, write: &dyn Fn(&Path) -> Result<()>| -> Result<()> {
        let path = dir.join(format!("{name}.csv"));
        write(&path)?;
        written.push(path);
        Ok(())
    };
    match view {
        PageView::Overview(OverviewPage {
            status_distribution,
            by_hotel_status,
            hotel_rates,
            ..
        }) => {
            emit("overview_status", &|p| write_csv(p, status_distribution))?;
            emit("overview_hotel_status", &|p| write_csv(p, by_hotel_status))?;
            emit("overview_hotel_rates", &|p| write_csv(p, hotel_rates))?;
        }
        PageView::Cancellations(CancellationsPage { monthly, lead_time }) => {
            emit("cancellations_monthly", &|p| write_csv(p, monthly))?;
            emit("cancellations_lead_time", &|p| {
                write_csv(p, &split_rows("Lead time", lead_time, 2, ""))
            })?;
        }
        PageView::Revenue(RevenuePage {
            cancelled_adr,
            not_cancelled_adr,
            adr,
            hotel_adr,
        }) => {
            emit("revenue_adr_cancelled", &|p| write_csv(p, cancelled_adr))?;
            emit("revenue_adr_not_cancelled", &|p| write_csv(p, not_cancelled_adr))?;
            emit("revenue_adr_comparison", &|p| {
                write_csv(p, &split_rows("Avg ADR", adr, 2, ""))
            })?;
            for series in hotel_adr {
                let stem = format!(
                    "revenue_adr_{}",
                    series.hotel.to_ascii_lowercase().replace(' ', "_")
                );
                emit(&stem, &|p| write_csv(p, &series.points))?;
            }
        }
        PageView::Geography(GeographyPage {
            top_cancelling_countries,
            top_booking_country_rates,
        }) => {
            emit("geography_top_cancellations", &|p| {
                write_csv(p, top_cancelling_countries)
            })?;
            emit("geography_country_rates", &|p| {
                write_csv(p, top_booking_country_rates)
            })?;
        }
        PageView::Seasonality(SeasonalityPage {
            cancelled_adr_by_month,
            yearly,
        }) => {
            emit("seasonality_cancelled_adr", &|p| {
                write_csv(p, cancelled_adr_by_month)
            })?;
            emit("seasonality_yearly", &|p| write_csv(p, yearly))?;
        }
        PageView::Channels(ChannelsPage {
            segments,
            cancelled_segments,
            segment_rates,
            channel_status,
        }) => {
            emit("channels_segments", &|p| write_csv(p, segments))?;
            emit("channels_cancelled_segments", &|p| {
                write_csv(p, cancelled_segments)
            })?;
            emit("channels_segment_rates", &|p| write_csv(p, segment_rates))?;
            emit("channels_distribution", &|p| write_csv(p, channel_status))?;
        }
    }
    Ok(written)
}

pub const PREPARED_EXPORT: &str = "prepared_bookings.csv";

/// Write the prepared table: interpreted columns, then pass-through
/// columns in source order, then the derived `month` and `year`.
pub fn write_prepared(path: &Path, table: &PreparedTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = vec![
        "hotel",
        "is_canceled",
        "lead_time",
        "arrival_date_month",
        "children",
        "country",
        "adr",
        "market_segment",
        "distribution_channel",
        "reservation_status",
        "reservation_status_date",
    ];
    header.extend(table.passthrough_headers().iter().map(String::as_str));
    header.extend(["month", "year"]);
    wtr.write_record(&header)?;

    for b in table.rows() {
        let mut record: Vec<String> = vec![
            b.hotel.to_string(),
            u8::from(b.is_canceled).to_string(),
            b.lead_time.to_string(),
            b.arrival_date_month.name().to_string(),
            b.children.to_string(),
            b.country.clone(),
            b.adr.to_string(),
            b.market_segment.clone().unwrap_or_default(),
            b.distribution_channel.clone().unwrap_or_default(),
            b.reservation_status.clone(),
            b.reservation_status_date.format("%Y-%m-%d").to_string(),
        ];
        record.extend(b.passthrough.iter().cloned());
        record.push(b.month.to_string());
        record.push(b.year.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    info!(
        "Wrote {} prepared row(s) to {}",
        format_int(table.len()),
        path.display()
    );
    Ok(())
}
