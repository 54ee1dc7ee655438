mod common;

use chrono::{Datelike, NaiveDate};
use common::{bookings_csv, Row, TestWorkspace, HEADER};
use hotel_insights::loader::{self, prepare, read_raw, UNKNOWN_COUNTRY};
use hotel_insights::Error;

fn load(ws: &TestWorkspace, rows: &[Row]) -> loader::PreparedTable {
    let path = ws.write("bookings.csv", &bookings_csv(rows));
    loader::load_prepared(&path).expect("prepare bookings")
}

#[test]
fn extreme_adr_outlier_is_removed() {
    let ws = TestWorkspace::new();
    let mut rows: Vec<Row> = (0..9).map(|i| Row::new().adr(50.0 + 10.0 * i as f64)).collect();
    rows.push(Row::new().adr(10_000.0).country("ESP"));

    let table = load(&ws, &rows);
    assert_eq!(table.len(), 9);
    assert!(table.rows().iter().all(|b| b.adr != 10_000.0));
    assert!(table.rows().iter().all(|b| b.country != "ESP"));

    let report = table.report();
    assert_eq!(report.total_rows, 10);
    assert_eq!(report.outliers_removed, 1);
    let bounds = report.adr_bounds.expect("bounds");
    assert!((bounds.q1 - 72.5).abs() < 1e-9);
    assert!((bounds.q3 - 117.5).abs() < 1e-9);
    assert!(table.rows().iter().all(|b| bounds.contains(b.adr)));
}

#[test]
fn rows_equal_to_a_collapsed_fence_are_kept() {
    let ws = TestWorkspace::new();
    let mut rows: Vec<Row> = (0..4).map(|_| Row::new().adr(100.0)).collect();
    rows.push(Row::new().adr(500.0));

    let table = load(&ws, &rows);
    assert_eq!(table.len(), 4);
    assert!(table.rows().iter().all(|b| b.adr == 100.0));
    let bounds = table.report().adr_bounds.expect("bounds");
    assert_eq!((bounds.lower, bounds.upper), (100.0, 100.0));
    assert_eq!(table.report().outliers_removed, 1);
}

#[test]
fn row_on_the_upper_fence_survives() {
    let ws = TestWorkspace::new();
    let on_fence: Vec<Row> = [0.0, 10.0, 20.0, 30.0, 60.0]
        .into_iter()
        .map(|adr| Row::new().adr(adr))
        .collect();
    let table = load(&ws, &on_fence);
    let bounds = table.report().adr_bounds.expect("bounds");
    assert_eq!((bounds.q1, bounds.q3, bounds.upper), (10.0, 30.0, 60.0));
    assert_eq!(table.len(), 5);
    assert!(table.rows().iter().any(|b| b.adr == 60.0));

    let ws = TestWorkspace::new();
    let past_fence: Vec<Row> = [0.0, 10.0, 20.0, 30.0, 61.0]
        .into_iter()
        .map(|adr| Row::new().adr(adr))
        .collect();
    let table = load(&ws, &past_fence);
    assert_eq!(table.len(), 4);
    assert!(table.rows().iter().all(|b| b.adr != 61.0));
}

#[test]
fn missing_children_takes_the_median() {
    let ws = TestWorkspace::new();
    let rows = vec![
        Row::new().children(""),
        Row::new().children("0"),
        Row::new().children("0"),
        Row::new().children("1"),
        Row::new().children("2"),
    ];
    let table = load(&ws, &rows);
    assert_eq!(table.len(), 5);
    assert_eq!(table.rows()[0].children, 0.5);
    assert_eq!(table.report().children_imputed, 1);
    assert_eq!(table.report().children_median, Some(0.5));
}

#[test]
fn missing_country_becomes_unknown() {
    let ws = TestWorkspace::new();
    let rows = vec![Row::new().country("NA"), Row::new().country(""), Row::new()];
    let table = load(&ws, &rows);
    let countries: Vec<&str> = table.rows().iter().map(|b| b.country.as_str()).collect();
    assert_eq!(countries, vec![UNKNOWN_COUNTRY, UNKNOWN_COUNTRY, "PRT"]);
    assert_eq!(table.report().countries_imputed, 2);
}

#[test]
fn status_date_is_read_day_first_and_split() {
    let ws = TestWorkspace::new();
    let table = load(&ws, &[Row::new().status_date("03-04-2016")]);
    let booking = &table.rows()[0];
    assert_eq!(
        booking.reservation_status_date,
        NaiveDate::from_ymd_opt(2016, 4, 3).unwrap()
    );
    assert_eq!(booking.month, 4);
    assert_eq!(booking.year, 2016);
}

#[test]
fn prepared_rows_hold_every_invariant() {
    let ws = TestWorkspace::new();
    let rows = vec![
        Row::new().children("").country("").adr(80.0),
        Row::new().children("2").adr(95.5).status_date("15/08/2015"),
        Row::new().resort().adr(120.0).status_date("2017-01-31"),
        Row::new().children("1").country("GBR").adr(101.0),
    ];
    let table = load(&ws, &rows);
    for b in table.rows() {
        assert!(!b.country.is_empty());
        assert!(b.children.is_finite());
        assert_eq!(b.month, b.reservation_status_date.month());
        assert_eq!(b.year, b.reservation_status_date.year());
    }
}

#[test]
fn prepare_is_deterministic() {
    let ws = TestWorkspace::new();
    let mut rows: Vec<Row> = (0..20)
        .map(|i| {
            Row::new()
                .canceled(i % 3 == 0)
                .adr(60.0 + i as f64 * 3.5)
                .children(if i % 7 == 0 { "" } else { "1" })
        })
        .collect();
    rows.push(Row::new().adr(4_000.0));
    let path = ws.write("bookings.csv", &bookings_csv(&rows));

    let first = prepare(read_raw(&path).unwrap()).unwrap();
    let second = prepare(read_raw(&path).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn company_and_agent_are_dropped_and_other_columns_kept() {
    let ws = TestWorkspace::new();
    let table = load(&ws, &[Row::new()]);
    let headers = table.passthrough_headers();
    assert_eq!(headers, ["arrival_date_year"]);
    assert_eq!(table.rows()[0].passthrough, vec!["2016".to_string()]);
}

#[test]
fn missing_file_is_data_unavailable() {
    let ws = TestWorkspace::new();
    let err = loader::load_prepared(&ws.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, Error::DataUnavailable { .. }));
    assert!(err.is_fatal());
}

#[test]
fn unparseable_date_fails_the_whole_load() {
    let ws = TestWorkspace::new();
    let rows = vec![Row::new(), Row::new().status_date("someday")];
    let path = ws.write("bookings.csv", &bookings_csv(&rows));
    match loader::load_prepared(&path) {
        Err(Error::Parse { line, column, .. }) => {
            assert_eq!(line, 3);
            assert_eq!(column, "reservation_status_date");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn two_digit_year_is_a_parse_error() {
    let ws = TestWorkspace::new();
    let rows = vec![Row::new().status_date("03-04-16")];
    let path = ws.write("bookings.csv", &bookings_csv(&rows));
    match loader::load_prepared(&path) {
        Err(Error::Parse { line, column, value, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, "reservation_status_date");
            assert_eq!(value, "03-04-16");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn malformed_number_is_a_parse_error() {
    let ws = TestWorkspace::new();
    let csv = format!("{HEADER}\nCity Hotel,1,soon,2016,July,0,PRT,90,,,Direct,Direct,Canceled,01-07-2016\n");
    let path = ws.write("bookings.csv", &csv);
    let err = loader::load_prepared(&path).unwrap_err();
    assert!(matches!(err, Error::Parse { ref column, .. } if column == "lead_time"));
}

#[test]
fn missing_required_column_is_reported() {
    let ws = TestWorkspace::new();
    let csv = "hotel,is_canceled,lead_time\nCity Hotel,0,10\n";
    let path = ws.write("bookings.csv", csv);
    match loader::load_prepared(&path) {
        Err(Error::MissingColumns(cols)) => {
            assert!(cols.contains(&"adr".to_string()));
            assert!(cols.contains(&"reservation_status_date".to_string()));
            assert!(!cols.contains(&"hotel".to_string()));
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[test]
fn children_without_any_value_cannot_be_imputed() {
    let ws = TestWorkspace::new();
    let rows = vec![Row::new().children(""), Row::new().children("NaN")];
    let path = ws.write("bookings.csv", &bookings_csv(&rows));
    let err = loader::load_prepared(&path).unwrap_err();
    assert!(matches!(err, Error::EmptyColumn(ref c) if c == "children"));
}

#[test]
fn header_only_file_prepares_to_an_empty_table() {
    let ws = TestWorkspace::new();
    let path = ws.write("bookings.csv", &format!("{HEADER}\n"));
    let table = loader::load_prepared(&path).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.report().adr_bounds, None);
}
