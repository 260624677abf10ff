//! Result assembly.
//!
//! Lays the joined rows and every computed comparison out in one fixed column
//! order and renders each cell for output: missing values become empty
//! strings and flags become `True`/`False`.

use log::debug;

use crate::{
    compare::{self, FlagColumn, STRENGTH_COLUMN},
    config::{MatchMode, MatchPlan},
    data::render_bool,
    join::{FUZZY_KEY_COLUMN, Joined, MATCH_COLUMN},
    temporal::{self, OVERLAP_COLUMN, TemporalColumns},
};

/// Every comparison computed for a joined table. Skipped comparators are
/// simply absent.
#[derive(Debug, Clone)]
pub struct Comparisons {
    pub coordinates: Vec<FlagColumn>,
    pub admin_type: Option<FlagColumn>,
    pub temporal: Option<TemporalColumns>,
    pub strength: Vec<u32>,
}

impl Comparisons {
    pub fn compute(joined: &Joined, plan: &MatchPlan) -> Self {
        let coordinates = compare::compare_coordinates(joined, plan.coordinates);
        let admin_type = compare::compare_admin_type(joined, plan.type_key);
        let temporal = temporal::compare_years(joined);

        let mut comparisons = Self {
            coordinates,
            admin_type,
            temporal,
            strength: Vec::new(),
        };
        comparisons.strength =
            compare::content_match_strength(joined.len(), &comparisons.flag_columns());
        comparisons
    }

    /// Boolean columns in output order.
    pub fn flag_columns(&self) -> Vec<&FlagColumn> {
        let mut columns = self.coordinates.iter().collect::<Vec<_>>();
        columns.extend(self.admin_type.as_ref());
        if let Some(temporal) = &self.temporal {
            columns.push(&temporal.beg_match);
            columns.push(&temporal.end_match);
        }
        columns
    }

    /// Names of the comparison and aggregate columns, in output order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self
            .coordinates
            .iter()
            .chain(self.admin_type.as_ref())
            .map(|column| column.name.clone())
            .collect::<Vec<_>>();
        if let Some(temporal) = &self.temporal {
            names.push(temporal.beg_match.name.clone());
            names.push(temporal.end_match.name.clone());
            names.push(OVERLAP_COLUMN.to_string());
        }
        names.push(STRENGTH_COLUMN.to_string());
        names
    }

    fn render_row(&self, row: usize) -> Vec<String> {
        let flag = |column: &FlagColumn| render_bool(column.values[row]).to_string();
        let mut cells = self
            .coordinates
            .iter()
            .chain(self.admin_type.as_ref())
            .map(flag)
            .collect::<Vec<_>>();
        if let Some(temporal) = &self.temporal {
            cells.push(flag(&temporal.beg_match));
            cells.push(flag(&temporal.end_match));
            cells.push(temporal.overlap[row].label().to_string());
        }
        cells.push(self.strength[row].to_string());
        cells
    }
}

/// The final rendered table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AssembledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }
}

/// Column order: `fuzzy_nm` (fuzzy name matching only), target fields,
/// incoming fields, `match`, then the comparison columns.
pub fn assemble(joined: &Joined, comparisons: &Comparisons) -> AssembledTable {
    let fuzzy = joined.mode == MatchMode::Fuzzy;
    let target_fields = joined.target.fields();
    let incoming_fields = joined.incoming.fields();

    let mut headers = Vec::new();
    if fuzzy {
        headers.push(FUZZY_KEY_COLUMN.to_string());
    }
    headers.extend(target_fields.iter().cloned());
    headers.extend(incoming_fields.iter().cloned());
    headers.push(MATCH_COLUMN.to_string());
    headers.extend(comparisons.column_names());

    let rows = joined
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut cells = Vec::with_capacity(headers.len());
            if fuzzy {
                cells.push(row.fuzzy_key.clone().unwrap_or_default());
            }
            let target_cell = |column: usize| {
                row.target
                    .and_then(|t| joined.target.frame.cell(t, column))
                    .unwrap_or_default()
                    .to_string()
            };
            cells.extend((0..target_fields.len()).map(target_cell));
            cells.extend((0..incoming_fields.len()).map(|column| {
                joined
                    .incoming
                    .frame
                    .cell(row.incoming, column)
                    .unwrap_or_default()
                    .to_string()
            }));
            cells.push(row.status().label().to_string());
            cells.extend(comparisons.render_row(idx));
            cells
        })
        .collect::<Vec<_>>();
    debug!("Assembled {} row(s) across {} column(s)", rows.len(), headers.len());

    AssembledTable { headers, rows }
}
