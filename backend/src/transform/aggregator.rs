//! Collapse sub-regional rows into one row per entity.
//!
//! ```text
//! Wide Input (per province)              →  Aggregated (per country)
//! ┌──────────────────────────────┐       ┌──────────────────────────┐
//! │ China (Hubei)    17  24  40  │       │ China     17  24  41     │
//! │ China (Beijing)   0   0   1  │  →    ├──────────────────────────┤
//! │ Italy             0   2   5  │       │ Italy      0   2   5     │
//! └──────────────────────────────┘       └──────────────────────────┘
//! ```
//!
//! Output rows are sorted by entity key. Running it again on its own output
//! returns the same table.

use std::collections::BTreeMap;

use crate::models::{WideRow, WideSeriesTable};

/// Sum every date column across rows sharing an entity key.
pub fn aggregate_by_entity(table: &WideSeriesTable) -> WideSeriesTable {
    let width = table.columns.len();
    let mut sums: BTreeMap<&str, Vec<i64>> = BTreeMap::new();

    for row in &table.rows {
        let acc = sums.entry(row.entity.as_str()).or_insert_with(|| vec![0; width]);
        for (slot, value) in acc.iter_mut().zip(&row.values) {
            *slot += value;
        }
    }

    WideSeriesTable {
        key_column: table.key_column.clone(),
        columns: table.columns.clone(),
        rows: sums
            .into_iter()
            .map(|(entity, values)| WideRow {
                entity: entity.to_string(),
                values,
            })
            .collect(),
    }
}
