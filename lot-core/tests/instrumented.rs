//! Checks the event ledger the directory emits, analysed through the
//! instrument crate's tables and polars.
#![cfg(feature = "instrument")]

use instrument::{EventSubscriber, Recorder, Values, load_by_entrance, revenue_by_type};
use lot_core::{Coordinates, Directory, EntranceId, LotConfig, ManualClock, SpotType};
use polars::prelude::*;
use tracing::subscriber::with_default;

/// Run a short day at a two-gate lot and return the recorded ledger plus the fees billed.
fn recorded_day() -> (Recorder, f64) {
    instrument::clear();
    with_default(EventSubscriber, || {
        let clock = ManualClock::default();
        let config = LotConfig::grid(12, 8.0)
            .with_entrances(vec![Coordinates::new(0, 0), Coordinates::new(5, 5)]);
        let mut lot = Directory::new(config, clock.clone()).unwrap();

        lot.assign("AB-1", SpotType::Small, EntranceId(1)).unwrap();
        lot.assign("AB-2", SpotType::Large, EntranceId(2)).unwrap();
        lot.assign("AB-3", SpotType::Small, EntranceId(2)).unwrap();
        clock.advance_hours(2);

        let mut billed = 0.0;
        billed += lot.release("AB-1").unwrap().fee.amount;
        clock.advance_hours(1);
        billed += lot.release("AB-2").unwrap().fee.amount;
        billed += lot.release("AB-3").unwrap().fee.amount;

        let _ = lot.release("AB-1");
        let _ = lot.assign("AB-4", SpotType::Medium, EntranceId(7));

        (instrument::drain(), billed)
    })
}

#[test]
fn every_operation_is_recorded() {
    let (recorder, _) = recorded_day();
    assert_eq!(recorder.count("directory"), 1);
    assert_eq!(recorder.count("assign"), 3);
    assert_eq!(recorder.count("release"), 3);
    assert_eq!(recorder.count("reject"), 2);

    let kinds = recorder.tables["reject"].column("kind").and_then(Values::as_str).unwrap();
    assert_eq!(kinds, &["UnknownRequest".to_string(), "InvalidInput".to_string()][..]);
}

#[test]
fn ledger_fees_match_receipts() {
    let (recorder, billed) = recorded_day();
    let fees = recorder.tables["release"].column("fee").and_then(Values::as_f64).unwrap();
    let total: f64 = fees.iter().sum();
    assert!((total - billed).abs() < 1e-9);
    // 2h small, 3h large, 3h small at 8/h
    assert!((billed - 64.0).abs() < 1e-9);
}

#[test]
fn revenue_and_load_breakdowns() {
    let (recorder, _) = recorded_day();

    let releases = recorder.tables["release"].to_dataframe().unwrap();
    let revenue = revenue_by_type(&releases).unwrap();
    let types = revenue.column("spot_type").unwrap().as_materialized_series().str().unwrap();
    let sums = revenue.column("revenue").unwrap().as_materialized_series().f64().unwrap();
    assert_eq!(revenue.height(), 2);
    assert_eq!(types.get(0), Some("small"));
    assert!((sums.get(0).unwrap() - 40.0).abs() < 1e-9);
    assert_eq!(types.get(1), Some("large"));
    assert!((sums.get(1).unwrap() - 24.0).abs() < 1e-9);

    let assignments = recorder.tables["assign"].to_dataframe().unwrap();
    let load = load_by_entrance(&assignments).unwrap();
    assert_eq!(load.height(), 2);
}

#[test]
fn small_spot_takings_from_the_release_frame() {
    let (recorder, _) = recorded_day();
    let releases = recorder.tables["release"].to_dataframe().unwrap();

    let small = releases
        .lazy()
        .filter(col("spot_type").eq(lit("small")))
        .select([
            col("fee").sum().alias("takings"),
            col("elapsed_ms").max().alias("longest_ms"),
        ])
        .collect()
        .unwrap();

    let takings = small.column("takings").unwrap().as_materialized_series().f64().unwrap();
    let longest = small.column("longest_ms").unwrap().as_materialized_series().u64().unwrap();
    // 2h + 3h at 8/h
    assert!((takings.get(0).unwrap() - 40.0).abs() < 1e-9);
    assert_eq!(longest.get(0), Some(3 * 3_600_000));
}
