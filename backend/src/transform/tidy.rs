//! Tidy-metrics engine: melt a date-indexed table into long rows and derive
//! the per-entity daily metrics.
//!
//! # Algorithm
//!
//! ```text
//! DateSeriesTable ─ melt ─▶ (entity, date, value) ─ value >= 10 ─▶ retained rows
//!                                                                      │
//!        group by entity ◀─────────────────────────────────────────────┘
//!          │  days_since_threshold = date - min retained date
//!          │  daily_change / daily_pct_change vs previous day
//!          │  7-sample trailing means, rounded
//!          ▼
//!     backfill gaps ─▶ TidyTable (melt order)
//! ```
//!
//! A rolling window that still contains an entity's first row (which has no
//! delta) yields no mean, so the first mean appears on the 8th retained row.
//! Missing deltas become 0 and missing means take the same-row delta.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::{TidyError, TidyResult};
use crate::models::{DateSeriesTable, LongRecord, LongSeriesTable, TidyRecord, TidyTable};

/// Cumulative deaths an entity needs before it is charted.
pub const DEATH_THRESHOLD: i64 = 10;

/// Samples per rolling mean.
pub const ROLLING_WINDOW: usize = 7;

/// One `(entity, date, value)` row per cell, entity-major.
pub fn melt(table: &DateSeriesTable) -> LongSeriesTable {
    let mut records = Vec::with_capacity(table.dates.len() * table.entities.len());

    for (e, entity) in table.entities.iter().enumerate() {
        for (d, date) in table.dates.iter().enumerate() {
            records.push(LongRecord {
                entity: entity.clone(),
                date: *date,
                value: table.values[d][e],
            });
        }
    }

    LongSeriesTable {
        key_column: table.key_column.clone(),
        records,
    }
}

/// Inverse of [`melt`]: dates ascending, entities in first-appearance order.
///
/// Combinations absent from the long table are filled with 0.
pub fn pivot(long: &LongSeriesTable) -> DateSeriesTable {
    let dates: Vec<NaiveDate> = long
        .records
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let date_pos: HashMap<NaiveDate, usize> = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut entities: Vec<String> = Vec::new();
    let mut entity_pos: HashMap<&str, usize> = HashMap::new();
    for record in &long.records {
        if !entity_pos.contains_key(record.entity.as_str()) {
            entity_pos.insert(record.entity.as_str(), entities.len());
            entities.push(record.entity.clone());
        }
    }

    let mut values = vec![vec![0; entities.len()]; dates.len()];
    for record in &long.records {
        values[date_pos[&record.date]][entity_pos[record.entity.as_str()]] = record.value;
    }

    DateSeriesTable {
        key_column: long.key_column.clone(),
        dates,
        entities,
        values,
    }
}

/// Melt and tidy in one step.
pub fn tidy(table: &DateSeriesTable) -> TidyResult<TidyTable> {
    tidy_long(&melt(table))
}

/// Filter, align and derive metrics for a long table.
///
/// Output keeps the input order of the retained rows.
pub fn tidy_long(long: &LongSeriesTable) -> TidyResult<TidyTable> {
    let retained: Vec<&LongRecord> = long
        .records
        .iter()
        .filter(|r| r.value >= DEATH_THRESHOLD)
        .collect();

    if retained.is_empty() {
        return Err(TidyError::EmptyInput {
            threshold: DEATH_THRESHOLD,
        });
    }

    let n = retained.len();
    let mut days = vec![0i64; n];
    let mut change: Vec<Option<i64>> = vec![None; n];
    let mut pct: Vec<Option<f64>> = vec![None; n];
    let mut change_mean: Vec<Option<f64>> = vec![None; n];
    let mut pct_mean: Vec<Option<f64>> = vec![None; n];

    for rows in EntityGroups::build(&retained).iter() {
        let Some(anchor) = rows.iter().map(|&i| retained[i].date).min() else {
            continue;
        };
        for &i in rows {
            days[i] = (retained[i].date - anchor).num_days();
        }

        let mut by_day = rows.clone();
        by_day.sort_by_key(|&i| days[i]);
        for pair in by_day.windows(2) {
            let (prev, cur) = (retained[pair[0]].value, retained[pair[1]].value);
            change[pair[1]] = Some(cur - prev);
            pct[pair[1]] = Some((cur - prev) as f64 / prev as f64 * 100.0);
        }

        let mut change_window = TrailingWindow::new(ROLLING_WINDOW);
        let mut pct_window = TrailingWindow::new(ROLLING_WINDOW);
        for &i in rows {
            change_mean[i] = change_window
                .push(change[i].map(|c| c as f64))
                .map(f64::round_ties_even);
            pct_mean[i] = pct_window.push(pct[i]).map(f64::round_ties_even);
        }
    }

    let records = retained
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let daily_change = change[i].unwrap_or(0);
            let daily_pct_change = pct[i].unwrap_or(0.0);
            TidyRecord {
                entity: r.entity.clone(),
                date: r.date,
                value: r.value,
                days_since_threshold: days[i],
                daily_change,
                daily_pct_change,
                daily_roll_avg: change_mean[i].unwrap_or(daily_change as f64),
                daily_pctchange_roll_avg: pct_mean[i].unwrap_or(daily_pct_change),
            }
        })
        .collect();

    Ok(TidyTable {
        key_column: long.key_column.clone(),
        records,
    })
}

/// Row indices per entity, groups in first-appearance order and rows in
/// table order.
struct EntityGroups {
    groups: Vec<Vec<usize>>,
}

impl EntityGroups {
    fn build(records: &[&LongRecord]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let g = *index.entry(record.entity.as_str()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(i);
        }

        Self { groups }
    }

    fn iter(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.groups.iter()
    }
}

/// Fixed-size trailing buffer. A mean is produced only when the buffer is
/// full and every sample in it is present.
struct TrailingWindow {
    samples: VecDeque<Option<f64>>,
    size: usize,
}

impl TrailingWindow {
    fn new(size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(size),
            size,
        }
    }

    fn push(&mut self, sample: Option<f64>) -> Option<f64> {
        if self.samples.len() == self.size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        if self.samples.len() < self.size {
            return None;
        }
        let mut sum = 0.0;
        for s in &self.samples {
            sum += (*s)?;
        }
        Some(sum / self.size as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + chrono::Duration::days(n)
    }

    /// Date table from per-entity series sharing consecutive dates.
    fn series(columns: &[(&str, &[i64])]) -> DateSeriesTable {
        let len = columns[0].1.len();
        DateSeriesTable {
            key_column: "Country/Region".into(),
            dates: (0..len as i64).map(day).collect(),
            entities: columns.iter().map(|(e, _)| e.to_string()).collect(),
            values: (0..len).map(|d| columns.iter().map(|(_, v)| v[d]).collect()).collect(),
        }
    }

    fn field<T: Copy>(table: &TidyTable, entity: &str, f: impl Fn(&TidyRecord) -> T) -> Vec<T> {
        table.entity_records(entity).map(f).collect()
    }

    #[test]
    fn test_single_entity_scenario() {
        let input = series(&[("A", &[1, 2, 5, 9, 10, 12, 15, 20, 25, 30])]);
        let out = tidy(&input).unwrap();

        assert_eq!(out.records.len(), 6);
        assert_eq!(out.records[0].date, day(4));
        assert_eq!(field(&out, "A", |r| r.days_since_threshold), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(field(&out, "A", |r| r.daily_change), vec![0, 2, 3, 5, 5, 5]);
        assert_eq!(
            field(&out, "A", |r| r.daily_roll_avg),
            vec![0.0, 2.0, 3.0, 5.0, 5.0, 5.0]
        );
        assert_eq!(out.records[1].daily_pct_change, 20.0);
    }

    #[test]
    fn test_first_row_per_entity() {
        let input = series(&[
            ("B", &[10, 11, 13, 16, 20, 25, 31, 38, 46]),
            ("C", &[0, 0, 4, 12, 30, 31, 40, 41, 60]),
        ]);
        let out = tidy(&input).unwrap();

        for entity in ["B", "C"] {
            let first = out.entity_records(entity).next().unwrap();
            assert_eq!(first.days_since_threshold, 0);
            assert_eq!(first.daily_change, 0);
            assert_eq!(first.daily_pct_change, 0.0);
        }
    }

    #[test]
    fn test_change_reconstructs_value() {
        let input = series(&[
            ("B", &[10, 11, 13, 16, 20, 25, 31, 38, 46]),
            ("C", &[0, 0, 4, 12, 30, 31, 40, 41, 60]),
        ]);
        let out = tidy(&input).unwrap();

        for entity in ["B", "C"] {
            let mut rows: Vec<&TidyRecord> = out.entity_records(entity).collect();
            rows.sort_by_key(|r| r.days_since_threshold);
            for pair in rows.windows(2) {
                assert_eq!(pair[1].value, pair[0].value + pair[1].daily_change);
            }
        }
    }

    #[test]
    fn test_rolling_starts_after_seven_deltas() {
        // deltas: -, 1, 2, 3, 4, 5, 6, 7, 8
        let input = series(&[("B", &[10, 11, 13, 16, 20, 25, 31, 38, 46])]);
        let out = tidy(&input).unwrap();

        let change = field(&out, "B", |r| r.daily_change);
        let roll = field(&out, "B", |r| r.daily_roll_avg);

        // window still holds the first row: backfilled
        for i in 0..7 {
            assert_eq!(roll[i], change[i] as f64);
        }
        assert_eq!(roll[7], 4.0); // mean(1..=7)
        assert_eq!(roll[8], 5.0); // mean(2..=8)

        let pct = field(&out, "B", |r| r.daily_pct_change);
        let pct_roll = field(&out, "B", |r| r.daily_pctchange_roll_avg);
        for i in 0..7 {
            assert_eq!(pct_roll[i], pct[i]);
        }
        // 10, 18.18, 23.08, 25, 25, 24, 22.58 -> 21.12
        assert_eq!(pct_roll[7], 21.0);
        // 18.18, 23.08, 25, 25, 24, 22.58, 21.05 -> 22.70
        assert_eq!(pct_roll[8], 23.0);
    }

    #[test]
    fn test_rolling_mean_is_rounded() {
        // deltas: -, 1, 1, 1, 1, 1, 1, 2 -> mean 8/7
        let input = series(&[("D", &[10, 11, 12, 13, 14, 15, 16, 18])]);
        let out = tidy(&input).unwrap();

        let last = out.records.last().unwrap();
        assert_eq!(last.daily_change, 2);
        assert_eq!(last.daily_roll_avg, 1.0);
    }

    #[test]
    fn test_short_group_fully_backfilled() {
        let input = series(&[("E", &[10, 20, 40, 50])]);
        let out = tidy(&input).unwrap();

        for r in &out.records {
            assert_eq!(r.daily_roll_avg, r.daily_change as f64);
            assert_eq!(r.daily_pctchange_roll_avg, r.daily_pct_change);
        }
        assert_eq!(field(&out, "E", |r| r.daily_pct_change), vec![0.0, 100.0, 100.0, 25.0]);
    }

    #[test]
    fn test_output_keeps_melt_order() {
        let input = series(&[("Zed", &[10, 20]), ("Abe", &[30, 40])]);
        let out = tidy(&input).unwrap();

        let order: Vec<&str> = out.records.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(order, vec!["Zed", "Zed", "Abe", "Abe"]);
    }

    #[test]
    fn test_offset_anchors_at_min_retained_date() {
        // dips below the threshold after crossing it
        let input = series(&[("F", &[3, 12, 8, 15])]);
        let out = tidy(&input).unwrap();

        assert_eq!(field(&out, "F", |r| r.days_since_threshold), vec![0, 2]);
        assert_eq!(field(&out, "F", |r| r.daily_change), vec![0, 3]);
        assert_eq!(out.records[0].date, day(1));
    }

    #[test]
    fn test_entities_below_threshold_dropped() {
        let input = series(&[("G", &[1, 2, 3]), ("H", &[9, 10, 11])]);
        let out = tidy(&input).unwrap();

        assert!(!out.contains_entity("G"));
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_empty_after_threshold() {
        let input = series(&[("G", &[1, 2, 3]), ("H", &[0, 9, 9])]);
        assert!(matches!(
            tidy(&input),
            Err(TidyError::EmptyInput { threshold: 10 })
        ));
    }

    #[test]
    fn test_melt_pivot_round_trip() {
        let input = series(&[
            ("Italy", &[0, 2, 5, 17]),
            ("Spain", &[1, 1, 3, 9]),
            ("Chile", &[0, 0, 0, 12]),
        ]);
        let long = melt(&input);

        assert_eq!(long.records.len(), 12);
        assert_eq!(pivot(&long), input);
    }
}
