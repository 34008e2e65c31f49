//! Event capture for the allocation engine.
//!
//! `lot-core` emits one `tracing` event per assignment, release and rejection
//! (targets `assign`, `release`, `reject`, `directory`). The subscriber here
//! turns each target into a column table whose schema is whatever fields the
//! events carried, so tests and offline analysis can look at the ledger as
//! polars DataFrames.
//!
//! ```ignore
//! let recorder = tracing::subscriber::with_default(instrument::EventSubscriber, || {
//!     // ... assign / release ...
//!     instrument::drain()
//! });
//! let releases = recorder.tables["release"].to_dataframe()?;
//! let revenue = instrument::revenue_by_type(&releases)?;
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// One column of a ledger table. The first value seen for a field fixes its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::U64(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::F64(v) => v.len(),
            Values::Bool(v) => v.len(),
            Values::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            Values::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Values::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Values::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            Values::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            Values::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    pub fn as_str(&self) -> Option<&[String]> {
        match self {
            Values::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Values::F64(v) => Some(v),
            _ => None,
        }
    }
}

/// All events of one target. Every column has `rows` entries; fields an event
/// did not carry are filled with the type's zero value.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: HashMap<String, Values>,
    pub rows: usize,
}

impl EventTable {
    fn align(&mut self) {
        let rows = self.rows;
        for col in self.columns.values_mut() {
            col.fill_to(rows);
        }
    }

    pub fn column(&self, name: &str) -> Option<&Values> {
        self.columns.get(name)
    }
}

/// Tables keyed by event target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, EventTable>,
}

impl Recorder {
    /// Rows recorded for `target`, zero if none.
    pub fn count(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.rows)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

struct RowWriter<'a> {
    table: &'a mut EventTable,
    row: usize,
}

impl RowWriter<'_> {
    fn column(&mut self, field: &Field, empty: impl FnOnce(usize) -> Values) -> &mut Values {
        let row = self.row;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(row))
    }
}

impl Visit for RowWriter<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let Values::U64(v) = self.column(field, |n| Values::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Values::I64(v) = self.column(field, |n| Values::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Values::F64(v) = self.column(field, |n| Values::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let Values::Bool(v) = self.column(field, |n| Values::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let Values::Str(v) = self.column(field, |n| Values::Str(vec![String::new(); n])) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%display` fields arrive here too; their Debug prints the Display form
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Subscriber that appends every info-level event to its target's table.
pub struct EventSubscriber;

impl Subscriber for EventSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();
            table.align();
            let row = table.rows;
            event.record(&mut RowWriter { table, row });
            table.rows += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the subscriber process-wide. Later calls are ignored.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(EventSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

// === Polars Integration ===

use polars::prelude::*;

impl EventTable {
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        // Sorted so frames built from the same events have the same layout
        let mut names: Vec<_> = self.columns.keys().collect();
        names.sort();
        let columns = names
            .into_iter()
            .map(|name| match &self.columns[name] {
                Values::U64(v) => Column::new(name.into(), v),
                Values::I64(v) => Column::new(name.into(), v),
                Values::F64(v) => Column::new(name.into(), v),
                Values::Bool(v) => Column::new(name.into(), v),
                Values::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Recorder {
    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }
}

/// Fee total and release count per spot type, from a `release` table.
/// Types appear in order of their first release.
pub fn revenue_by_type(releases: &DataFrame) -> PolarsResult<DataFrame> {
    releases
        .clone()
        .lazy()
        .group_by_stable([col("spot_type")])
        .agg([
            col("fee").sum().alias("revenue"),
            col("fee").count().alias("releases"),
        ])
        .collect()
}

/// Assignment count and mean walking distance per entrance, from an `assign` table.
pub fn load_by_entrance(assignments: &DataFrame) -> PolarsResult<DataFrame> {
    assignments
        .clone()
        .lazy()
        .group_by_stable([col("entrance")])
        .agg([
            col("distance").count().alias("assignments"),
            col("distance").mean().alias("mean_distance"),
        ])
        .collect()
}

/// Write each table as `{dir}/{target}.parquet`.
pub fn save_parquet(recorder: &Recorder, dir: &std::path::Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| PolarsError::IO {
        error: e.into(),
        msg: None,
    })?;
    for (name, mut df) in recorder.to_dataframes()? {
        let path = dir.join(format!("{}.parquet", name));
        let file = std::fs::File::create(&path).map_err(|e| PolarsError::IO {
            error: e.into(),
            msg: None,
        })?;
        ParquetWriter::new(file).finish(&mut df)?;
    }
    Ok(())
}
