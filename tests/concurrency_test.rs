//! Concurrent replace/read behaviour of the rate store and service
//!
//! Readers must only ever observe a complete old or a complete new dataset.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rusty_fxrates::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn dataset(rows: usize, marker: i64) -> Vec<RateRow> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..rows)
        .map(|i| {
            RateRow::empty(start + Duration::days(i as i64))
                .with_rate("USD", Decimal::from(marker))
                .with_rate("EUR", Decimal::from(marker * 2))
        })
        .collect()
}

#[test]
fn test_no_torn_reads_during_replace() {
    const SMALL: usize = 10;
    const LARGE: usize = 2_000;

    let store = Arc::new(InMemoryRateStore::with_rows(dataset(SMALL, 1)));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0usize;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let snapshot = store.snapshot();
                    let len = snapshot.len();
                    assert!(len == SMALL || len == LARGE, "torn read: {} rows", len);

                    // every row of one snapshot comes from the same upload
                    let marker = snapshot.rows()[0].rate("USD");
                    assert!(snapshot.rows().iter().all(|row| row.rate("USD") == marker));
                    observed += 1;
                    if finished {
                        break;
                    }
                }
                observed
            })
        })
        .collect();

    for i in 0..200 {
        if i % 2 == 0 {
            store.replace(dataset(LARGE, 2));
        } else {
            store.replace(dataset(SMALL, 1));
        }
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(store.snapshot().generation(), 201);
}

#[test]
fn test_service_queries_during_uploads() {
    let service = Arc::new(RateService::from_config(&ServiceConfig::default()).unwrap());
    service.replace_dataset(dataset(30, 1));

    let first = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let last = first + Duration::days(29);

    let writer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for i in 0..100 {
                let marker = if i % 2 == 0 { 3 } else { 1 };
                service.replace_dataset(dataset(30, marker));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..500 {
                    // USD and EUR always come from the same dataset within a query
                    let eur_per_usd = service
                        .convert(first, "USD", "EUR", Decimal::from(1))
                        .unwrap();
                    assert_eq!(eur_per_usd, Decimal::from(2));

                    let highest = service.highest(first, last, "USD").unwrap();
                    assert!(highest == Decimal::from(1) || highest == Decimal::from(3));

                    let average = service.average(first, last, "USD").unwrap();
                    assert!(average == Decimal::from(1) || average == Decimal::from(3));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // last write wins and the cache serves the final dataset
    assert_eq!(service.highest(first, last, "USD").unwrap(), Decimal::from(1));
}

#[test]
fn test_concurrent_uploads_last_write_wins() {
    let service = Arc::new(RateService::from_config(&ServiceConfig::default()).unwrap());

    let writers: Vec<_> = (1..=8)
        .map(|n| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service.replace_dataset(dataset(n, n as i64));
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let snapshot = service.current_dataset();
    assert_eq!(snapshot.generation(), 8);
    let marker = snapshot.rows()[0].rate("USD").unwrap();
    assert_eq!(Decimal::from(snapshot.len()), marker);
}
