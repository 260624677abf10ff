//! Temporal-interval classification.
//!
//! Each joined row carries an incoming `[beg, end]` year pair and a target
//! `[beg, end]` pair. The classifier assigns exactly one [`YearOverlap`]
//! category by testing the rules below in order, the last rule that holds
//! winning:
//!
//! 1. adjacent
//! 2. partial overlap including the start of the target
//! 3. partial overlap including the end of the target
//! 4. incoming nested in target
//! 5. target nested in incoming
//! 6. perfect match
//! 7. a zero year anywhere (year 0 does not exist)
//! 8. an interval ending before it begins
//! 9. a non-numeric year on a `found` row
//!
//! Downstream reports key off these labels, so the precedence is fixed even
//! where rules overlap.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::{
    compare::FlagColumn,
    data::coerce_number,
    join::{Joined, MatchStatus},
    vocabulary::{SharedField, Side},
};

pub const BEG_MATCH_COLUMN: &str = "out_beg_match";
pub const END_MATCH_COLUMN: &str = "out_end_match";
pub const OVERLAP_COLUMN: &str = "out_year_overlap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum YearOverlap {
    /// No rule applied (typically a `not_found` row).
    Unclassified,
    Adjacent,
    PartialInclStartOfTarget,
    PartialInclEndOfTarget,
    IncomingNestedInTarget,
    TargetNestedInIncoming,
    PerfectMatch,
    CautionZeroes,
    ErrorEndBeforeBeg,
    ErrorNonNumericYearValue,
}

impl YearOverlap {
    pub fn label(self) -> &'static str {
        match self {
            YearOverlap::Unclassified => "",
            YearOverlap::Adjacent => "adjacent",
            YearOverlap::PartialInclStartOfTarget => "partial_incl_start_of_target",
            YearOverlap::PartialInclEndOfTarget => "partial_incl_end_of_target",
            YearOverlap::IncomingNestedInTarget => "incoming_nested_in_target",
            YearOverlap::TargetNestedInIncoming => "target_nested_in_incoming",
            YearOverlap::PerfectMatch => "perfect_match",
            YearOverlap::CautionZeroes => "CAUTION__ZEROES",
            YearOverlap::ErrorEndBeforeBeg => "ERROR__END_BEFORE_BEG",
            YearOverlap::ErrorNonNumericYearValue => "ERROR__NON_NUMERIC_YEAR_VALUE",
        }
    }
}

impl fmt::Display for YearOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A begin/end pair after numeric coercion; `None` marks a missing or
/// non-numeric year.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YearSpan {
    pub beg: Option<f64>,
    pub end: Option<f64>,
}

impl YearSpan {
    pub fn new(beg: Option<f64>, end: Option<f64>) -> Self {
        Self { beg, end }
    }

    pub fn years(beg: f64, end: f64) -> Self {
        Self::new(Some(beg), Some(end))
    }

    pub fn parse(beg: Option<&str>, end: Option<&str>) -> Self {
        Self::new(coerce_number(beg), coerce_number(end))
    }

    fn is_complete(&self) -> bool {
        self.beg.is_some() && self.end.is_some()
    }
}

// Comparisons against a missing year are false, whichever way round.
fn eq(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a <= b)
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    lt(b, a)
}

fn ge(a: Option<f64>, b: Option<f64>) -> bool {
    le(b, a)
}

fn offset(a: Option<f64>, delta: f64) -> Option<f64> {
    a.map(|v| v + delta)
}

pub fn classify(incoming: YearSpan, target: YearSpan, status: MatchStatus) -> YearOverlap {
    let (ib, ie) = (incoming.beg, incoming.end);
    let (tb, te) = (target.beg, target.end);
    let mut category = YearOverlap::Unclassified;

    if eq(ib, offset(te, 1.0)) || eq(ie, offset(tb, -1.0)) {
        category = YearOverlap::Adjacent;
    }
    if le(ib, tb) && ge(ie, tb) && lt(ie, te) {
        category = YearOverlap::PartialInclStartOfTarget;
    }
    if gt(ib, tb) && le(ib, te) && ge(ie, te) {
        category = YearOverlap::PartialInclEndOfTarget;
    }
    if (ge(ib, tb) && lt(ie, te)) || (gt(ib, tb) && le(ie, te)) {
        category = YearOverlap::IncomingNestedInTarget;
    }
    if (le(ib, tb) && gt(ie, te)) || (lt(ib, tb) && ge(ie, te)) {
        category = YearOverlap::TargetNestedInIncoming;
    }
    if eq(ib, tb) && eq(ie, te) {
        category = YearOverlap::PerfectMatch;
    }
    if [ib, ie, tb, te].iter().any(|year| *year == Some(0.0)) {
        category = YearOverlap::CautionZeroes;
    }
    if gt(ib, ie) || gt(tb, te) {
        category = YearOverlap::ErrorEndBeforeBeg;
    }
    if status == MatchStatus::Found && !(incoming.is_complete() && target.is_complete()) {
        category = YearOverlap::ErrorNonNumericYearValue;
    }
    category
}

/// Year comparison output: two equality flags plus the overlap category.
#[derive(Debug, Clone)]
pub struct TemporalColumns {
    pub beg_match: FlagColumn,
    pub end_match: FlagColumn,
    pub overlap: Vec<YearOverlap>,
}

/// Compares years on every joined row. Returns `None` (and computes nothing,
/// not even the equality flags) when the incoming data lacks a begin or end
/// year field.
pub fn compare_years(joined: &Joined) -> Option<TemporalColumns> {
    let incoming_beg = Side::Incoming.field(SharedField::YearBegin);
    let incoming_end = Side::Incoming.field(SharedField::YearEnd);
    if !(joined.incoming.has_field(incoming_beg) && joined.incoming.has_field(incoming_end)) {
        info!(
            "Incoming data lacks a beginning and/or ending year field; no date comparisons will be made"
        );
        return None;
    }
    let target_beg = Side::Target.field(SharedField::YearBegin);
    let target_end = Side::Target.field(SharedField::YearEnd);

    let mut beg_match = Vec::with_capacity(joined.len());
    let mut end_match = Vec::with_capacity(joined.len());
    let mut overlap = Vec::with_capacity(joined.len());
    for row in &joined.rows {
        let incoming = YearSpan::parse(
            joined.value(row, Side::Incoming, incoming_beg),
            joined.value(row, Side::Incoming, incoming_end),
        );
        let target = YearSpan::parse(
            joined.value(row, Side::Target, target_beg),
            joined.value(row, Side::Target, target_end),
        );
        beg_match.push(eq(incoming.beg, target.beg));
        end_match.push(eq(incoming.end, target.end));
        let category = classify(incoming, target, row.status());
        debug!("{incoming:?} vs {target:?} -> {category:?}");
        overlap.push(category);
    }

    Some(TemporalColumns {
        beg_match: FlagColumn::new(BEG_MATCH_COLUMN, beg_match),
        end_match: FlagColumn::new(END_MATCH_COLUMN, end_match),
        overlap,
    })
}
