//! Name-key matching.
//!
//! Outer-joins the normalized target and incoming tables on one canonical name
//! field, then keeps only the rows an incoming record participates in: matched
//! pairs are labelled `found`, incoming records with no partner `not_found`,
//! and target records nobody matched are discarded.
//!
//! In fuzzy mode the join key is the first two characters of each name, so
//! `張掖` pairs with `張掖居延屬國`. This is many-to-many on purpose. Pinyin
//! names are always joined strictly.

use std::{collections::HashMap, fmt};

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::{MatchMode, NameKey},
    data::char_prefix,
    schema::NormalizedTable,
    vocabulary::Side,
};

/// Characters kept from each name when building the fuzzy key.
pub const FUZZY_PREFIX_CHARS: usize = 2;

pub const MATCH_COLUMN: &str = "match";
pub const FUZZY_KEY_COLUMN: &str = "fuzzy_nm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    NotFound,
}

impl MatchStatus {
    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::Found => "found",
            MatchStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One output row: an incoming record and the target record it matched, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub target: Option<usize>,
    pub incoming: usize,
    /// Truncated name key; only set in fuzzy mode.
    pub fuzzy_key: Option<String>,
}

impl JoinedRow {
    pub fn status(&self) -> MatchStatus {
        if self.target.is_some() {
            MatchStatus::Found
        } else {
            MatchStatus::NotFound
        }
    }
}

#[derive(Debug, Clone)]
pub struct Joined {
    pub target: NormalizedTable,
    pub incoming: NormalizedTable,
    pub key: NameKey,
    pub mode: MatchMode,
    pub rows: Vec<JoinedRow>,
    /// Target records that matched no incoming record and were dropped.
    pub discarded_target_rows: usize,
}

impl Joined {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self, side: Side) -> &NormalizedTable {
        match side {
            Side::Incoming => &self.incoming,
            Side::Target => &self.target,
        }
    }

    /// Cell of a canonical field for the given output row; the target side of
    /// a `not_found` row and absent fields read as missing.
    pub fn value(&self, row: &JoinedRow, side: Side, field: &str) -> Option<&str> {
        let index = match side {
            Side::Incoming => Some(row.incoming),
            Side::Target => row.target,
        }?;
        self.table(side).frame.value(index, field)
    }

    pub fn count(&self, status: MatchStatus) -> usize {
        self.rows.iter().filter(|row| row.status() == status).count()
    }
}

pub fn match_names(
    target: NormalizedTable,
    incoming: NormalizedTable,
    key: NameKey,
    requested: MatchMode,
) -> Joined {
    let mode = key.effective_mode(requested);
    let derive_key = |value: &str| match mode {
        MatchMode::Strict => value.to_string(),
        MatchMode::Fuzzy => char_prefix(value, FUZZY_PREFIX_CHARS).to_string(),
    };

    let target_field = key.field(Side::Target);
    let incoming_field = key.field(Side::Incoming);
    let lookup: HashMap<String, Vec<usize>> = match target.frame.column_index(target_field) {
        Some(column) => target.frame.group_by(column, derive_key),
        None => HashMap::new(),
    };
    let incoming_column = incoming.frame.column_index(incoming_field);

    let mut matched_target = vec![false; target.frame.len()];
    let mut rows = Vec::with_capacity(incoming.frame.len());
    for incoming_idx in 0..incoming.frame.len() {
        let name = incoming_column.and_then(|column| incoming.frame.cell(incoming_idx, column));
        let join_key = name.map(derive_key);
        let fuzzy_key = join_key.clone().filter(|_| mode == MatchMode::Fuzzy);
        let partners = join_key
            .as_ref()
            .and_then(|k| lookup.get(k))
            .map(Vec::as_slice)
            .unwrap_or_default();
        if partners.is_empty() {
            debug!("Incoming row {} ({:?}) has no match", incoming_idx + 1, name);
            rows.push(JoinedRow {
                target: None,
                incoming: incoming_idx,
                fuzzy_key,
            });
            continue;
        }
        for &target_idx in partners {
            matched_target[target_idx] = true;
            rows.push(JoinedRow {
                target: Some(target_idx),
                incoming: incoming_idx,
                fuzzy_key: fuzzy_key.clone(),
            });
        }
    }

    let discarded_target_rows = matched_target.iter().filter(|m| !**m).count();
    let joined = Joined {
        target,
        incoming,
        key,
        mode,
        rows,
        discarded_target_rows,
    };
    info!(
        "Matched on {} ({} mode): {} found, {} not found, {} target-only row(s) dropped",
        key,
        mode,
        joined.count(MatchStatus::Found),
        joined.count(MatchStatus::NotFound),
        discarded_target_rows
    );
    joined
}
