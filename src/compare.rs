//! Attribute comparators and the match-strength aggregator.
//!
//! Every comparator yields [`FlagColumn`]s aligned with the joined rows.
//! Comparators that cannot run (the incoming data lacks the attribute) yield
//! nothing at all, so they never count against a row's strength.

use log::{info, warn};
use rust_decimal::Decimal;

use crate::{
    config::{CoordinateMode, TypeKey},
    data::{coerce_decimal, round_decimal},
    join::Joined,
    vocabulary::{SharedField, Side},
};

pub const STRENGTH_COLUMN: &str = "out_content_match_strength";

/// Coordinates rarely carry more than this many decimal places.
pub const TYPICAL_MAX_COORDINATE_PLACES: i64 = 7;

/// A named Boolean comparison result, one value per joined row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagColumn {
    pub name: String,
    pub values: Vec<bool>,
}

impl FlagColumn {
    pub fn new(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    fn shared_field(self) -> SharedField {
        match self {
            Axis::X => SharedField::XCoord,
            Axis::Y => SharedField::YCoord,
        }
    }

    fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
        }
    }

    /// Output column for this axis under the given mode.
    pub fn column_name(self, mode: CoordinateMode) -> String {
        match mode {
            CoordinateMode::Strict => format!("out_{}_coord_match", self.letter()),
            CoordinateMode::Fuzzy { .. } => format!("fuzzy_out_{}_coord_match", self.letter()),
        }
    }
}

/// Compares two coordinate cells. Values that are not numbers never match,
/// not even each other.
pub fn coordinates_match(incoming: Option<&str>, target: Option<&str>, mode: CoordinateMode) -> bool {
    let normalize = |value: Decimal| match mode {
        CoordinateMode::Strict => value,
        CoordinateMode::Fuzzy { places, .. } => round_decimal(value, places),
    };
    match (coerce_decimal(incoming), coerce_decimal(target)) {
        (Some(a), Some(b)) => normalize(a) == normalize(b),
        _ => false,
    }
}

/// One flag column per coordinate axis present in the incoming data.
pub fn compare_coordinates(joined: &Joined, mode: CoordinateMode) -> Vec<FlagColumn> {
    let axes = Axis::ALL
        .into_iter()
        .filter(|axis| {
            joined
                .incoming
                .has_field(Side::Incoming.field(axis.shared_field()))
        })
        .collect::<Vec<_>>();
    if axes.is_empty() {
        info!("No spatial coordinate fields available for matching");
        return Vec::new();
    }
    if let CoordinateMode::Fuzzy { places, .. } = mode {
        info!("Comparing coordinates rounded to {places} decimal place(s)");
        if places > TYPICAL_MAX_COORDINATE_PLACES {
            warn!(
                "Coordinates rarely have more than {TYPICAL_MAX_COORDINATE_PLACES} decimal places; rounding to {places} is close to strict matching"
            );
        }
    } else {
        info!("Comparing coordinates strictly");
    }

    axes.into_iter()
        .map(|axis| {
            let incoming_field = Side::Incoming.field(axis.shared_field());
            let target_field = Side::Target.field(axis.shared_field());
            if !joined.target.has_field(target_field) {
                warn!("Target data has no '{target_field}' field; every {incoming_field} comparison will be false");
            }
            let values = joined
                .rows
                .iter()
                .map(|row| {
                    coordinates_match(
                        joined.value(row, Side::Incoming, incoming_field),
                        joined.value(row, Side::Target, target_field),
                        mode,
                    )
                })
                .collect();
            FlagColumn::new(axis.column_name(mode), values)
        })
        .collect()
}

pub fn type_column_name(key: TypeKey) -> String {
    format!("out_{}_match", key.label())
}

/// Compares the administrative type on the chosen key; `None` skips the comparator.
pub fn compare_admin_type(joined: &Joined, key: Option<TypeKey>) -> Option<FlagColumn> {
    let Some(key) = key else {
        info!("Administrative type could not be found in incoming data; matching will not be attempted");
        return None;
    };
    let incoming_field = Side::Incoming.field(key.shared_field());
    let target_field = Side::Target.field(key.shared_field());
    info!("Matching administrative type on '{incoming_field}'");
    let values = joined
        .rows
        .iter()
        .map(|row| {
            match (
                joined.value(row, Side::Incoming, incoming_field),
                joined.value(row, Side::Target, target_field),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        })
        .collect();
    Some(FlagColumn::new(type_column_name(key), values))
}

/// Per-row count of true flags across the comparisons that were computed.
pub fn content_match_strength(rows: usize, columns: &[&FlagColumn]) -> Vec<u32> {
    let mut strength = vec![0u32; rows];
    for column in columns {
        for (total, flag) in strength.iter_mut().zip(&column.values) {
            *total += u32::from(*flag);
        }
    }
    strength
}
