mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{bookings_csv, rows_with_cancellations, TestWorkspace};
use hotel_insights::cache::PreparedCache;
use hotel_insights::loader::PreparedTable;
use hotel_insights::Error;

#[test]
fn concurrent_callers_share_one_load() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = PreparedCache::with_loader("slow", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        Ok(PreparedTable::from_bookings(Vec::new()))
    });

    let seen: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| cache.get().map(|t| t as *const PreparedTable as usize)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("load"))
            .collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn file_backed_cache_loads_once() {
    let ws = TestWorkspace::new();
    let path = ws.write("bookings.csv", &bookings_csv(&rows_with_cancellations(5, 2)));
    let cache = PreparedCache::from_path(&path);
    assert!(!cache.is_loaded());

    let first = cache.get().unwrap();
    assert_eq!(first.len(), 5);
    std::fs::remove_file(&path).unwrap();

    let second = cache.get().unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(cache.is_loaded());
}

#[test]
fn failed_load_exposes_no_table() {
    let ws = TestWorkspace::new();
    let cache = PreparedCache::from_path(ws.path().join("hotel_booking.csv"));
    assert!(matches!(cache.get(), Err(Error::DataUnavailable { .. })));
    assert!(cache.loaded().is_none());
}
