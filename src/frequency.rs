use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::assemble::AssembledTable;

pub const EMPTY_LABEL: &str = "<empty>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Value counts for one column, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub column: String,
    pub total: usize,
    pub entries: Vec<FrequencyEntry>,
}

impl FrequencyTable {
    pub fn count_of(&self, value: &str) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.count)
            .unwrap_or_default()
    }

    /// `[value, count, percent]` rows for the report.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|entry| {
                vec![
                    entry.value.clone(),
                    entry.count.to_string(),
                    format!("{:.2}%", entry.percent),
                ]
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct FrequencyAccumulator {
    total: usize,
    counts: HashMap<String, usize>,
}

impl FrequencyAccumulator {
    fn ingest(&mut self, value: &str) {
        let key = if value.is_empty() { EMPTY_LABEL } else { value };
        self.total += 1;
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }

    fn finish(self, column: &str) -> FrequencyTable {
        let total = self.total;
        let entries = self
            .counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(value, count)| FrequencyEntry {
                value,
                count,
                percent: (count as f64 / total as f64) * 100.0,
            })
            .collect();
        FrequencyTable {
            column: column.to_string(),
            total,
            entries,
        }
    }
}

pub fn count_values<'a, I>(column: &str, values: I) -> FrequencyTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut accumulator = FrequencyAccumulator::default();
    for value in values {
        accumulator.ingest(value);
    }
    accumulator.finish(column)
}

/// Frequency tables for each named column present in the table, in the order
/// requested. Absent columns are skipped.
pub fn column_frequencies(table: &AssembledTable, columns: &[&str]) -> Vec<FrequencyTable> {
    columns
        .iter()
        .filter_map(|name| table.column(name).map(|values| count_values(name, values)))
        .collect()
}
