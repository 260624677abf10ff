//! Schema normalization.
//!
//! Maps a raw table's columns onto the canonical vocabulary of its side,
//! either through a recognized CHGIS reference layout or through the explicit
//! per-field mapping from the configuration. Canonical fields that receive no
//! source column are dropped from the output entirely, never null-filled.
//!
//! ## Responsibilities
//!
//! - Reference schema detection (v5 before v6) with fixed rename rules
//! - Explicit mapping validation (unknown columns, double use)
//! - The name-field guard: at least one of traditional, simplified or pinyin
//!   names must survive, using the configured fallback mappings if needed
//! - Title-casing of name and administrative-type text

use std::fmt;

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::{ConfigError, TableConfig},
    data::title_case,
    frame::Frame,
    vocabulary::{ReferenceSchema, Side},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("at least one {side} name field (traditional, simplified or pinyin) must be mapped")]
    MissingNameField { side: Side },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedField {
    pub source: String,
    pub canonical: String,
}

/// Applied source-to-canonical renames, in output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMapping(Vec<MappedField>);

impl FieldMapping {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(source, canonical)| MappedField { source, canonical })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappedField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn canonical_fields(&self) -> Vec<String> {
        self.0.iter().map(|m| m.canonical.clone()).collect()
    }

    fn pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|m| (m.source.clone(), m.canonical.clone()))
            .collect()
    }

    fn source_of(&self, canonical: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|m| m.canonical == canonical)
            .map(|m| m.source.as_str())
    }

    fn canonical_for_source(&self, source: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|m| m.source == source)
            .map(|m| m.canonical.as_str())
    }
}

/// Where a table's mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingOrigin {
    Manual,
    Reference(ReferenceSchema),
}

impl fmt::Display for MappingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingOrigin::Manual => write!(f, "manual mapping"),
            MappingOrigin::Reference(schema) => write!(f, "{schema} default mapping"),
        }
    }
}

/// A table whose columns are exactly the canonical fields it uses.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub side: Side,
    pub frame: Frame,
    pub mapping: FieldMapping,
    pub origin: MappingOrigin,
}

impl NormalizedTable {
    /// Canonical fields present, in column order.
    pub fn fields(&self) -> &[String] {
        self.frame.headers()
    }

    pub fn has_field(&self, canonical: &str) -> bool {
        self.frame.has_column(canonical)
    }
}

pub fn normalize(raw: &Frame, side: Side, table: &TableConfig) -> Result<NormalizedTable> {
    table.validate_keys(side)?;

    let detected = table
        .schema
        .candidates()
        .iter()
        .copied()
        .find(|schema| schema.matches(raw.headers()));

    let (mapping, origin) = match detected {
        Some(schema) => {
            info!("{side} table matches the {schema} columns; applying its default mapping");
            if !table.fields.values().all(|v| v.trim().is_empty()) {
                debug!("Ignoring explicit {side} field mapping in favour of {schema}");
            }
            (
                FieldMapping::from_pairs(schema.field_mapping()),
                MappingOrigin::Reference(schema),
            )
        }
        None => {
            if !table.schema.candidates().is_empty() {
                warn!(
                    "The columns in the {side} table do not match any reference schema; proceeding with manual mapping"
                );
            }
            let mapping = explicit_mapping(raw, side, table)?;
            (guard_name_fields(raw, side, table, mapping)?, MappingOrigin::Manual)
        }
    };

    let projected = raw.project(&mapping.pairs())?;
    let frame = projected.map_columns(&side.title_cased_fields(), title_case);
    info!(
        "Normalized {side} table: {} of {} column(s) mapped",
        frame.headers().len(),
        raw.headers().len()
    );
    Ok(NormalizedTable {
        side,
        frame,
        mapping,
        origin,
    })
}

fn explicit_mapping(raw: &Frame, side: Side, table: &TableConfig) -> Result<FieldMapping> {
    let mut mapping = FieldMapping::default();
    for field in side.vocabulary() {
        let Some(source) = table.source_for(field.name) else {
            debug!("No {side} column supplied for '{}'; dropping it", field.name);
            continue;
        };
        check_source(raw, side, &mapping, field.name, source)?;
        mapping.0.push(MappedField {
            source: source.to_string(),
            canonical: field.name.to_string(),
        });
    }
    Ok(mapping)
}

/// Ensures a name field is mapped, inserting fallback name mappings in guard
/// order at positions 1, 2, 3 of the field list.
fn guard_name_fields(
    raw: &Frame,
    side: Side,
    table: &TableConfig,
    mut mapping: FieldMapping,
) -> Result<FieldMapping> {
    let name_fields = side.name_fields();
    let has_name = |mapping: &FieldMapping| {
        name_fields
            .iter()
            .any(|name| mapping.source_of(name).is_some())
    };
    if has_name(&mapping) {
        return Ok(mapping);
    }

    warn!("No {side} name field mapped; consulting the name fallback mapping");
    let mut position = 1usize;
    for name in name_fields {
        let Some(source) = table.fallback_for(name) else {
            continue;
        };
        check_source(raw, side, &mapping, name, source)?;
        let at = position.min(mapping.len());
        mapping.0.insert(
            at,
            MappedField {
                source: source.to_string(),
                canonical: name.to_string(),
            },
        );
        position += 1;
    }

    if has_name(&mapping) {
        Ok(mapping)
    } else {
        Err(NormalizeError::MissingNameField { side }.into())
    }
}

fn check_source(
    raw: &Frame,
    side: Side,
    mapping: &FieldMapping,
    canonical: &str,
    source: &str,
) -> Result<(), ConfigError> {
    if !raw.has_column(source) {
        return Err(ConfigError::UnknownSourceColumn {
            side,
            canonical: canonical.to_string(),
            column: source.to_string(),
        });
    }
    if let Some(first) = mapping.canonical_for_source(source) {
        return Err(ConfigError::ColumnAlreadyUsed {
            side,
            column: source.to_string(),
            first: first.to_string(),
            second: canonical.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        config::SchemaChoice,
        vocabulary::{CHGIS_V5_COLUMNS, CHGIS_V6_COLUMNS, TARGET_FIELDS},
    };

    fn table(fields: &[(&str, &str)], fallback: &[(&str, &str)]) -> TableConfig {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        TableConfig {
            schema: SchemaChoice::Manual,
            fields: to_map(fields),
            name_fallback: to_map(fallback),
        }
    }

    fn incoming_raw() -> Frame {
        Frame::from_strings(
            &["id", "name", "pinyin", "begin", "end", "kind"],
            &[
                &["1", "張掖", "zhangye", "-111", "220", "jun"],
                &["2", "酒泉", "JIUQUAN", "-111", "220", "jun"],
            ],
        )
        .expect("frame")
    }

    fn reference_frame(columns: &[&str]) -> Frame {
        let row = columns
            .iter()
            .map(|c| format!("{c}-value"))
            .collect::<Vec<_>>();
        let mut full_row = row.iter().map(|s| s.as_str()).collect::<Vec<_>>();
        full_row.push("ignored");
        let mut headers = columns.to_vec();
        headers.push("extra");
        Frame::from_strings(&headers, &[full_row.as_slice()]).expect("frame")
    }

    #[test]
    fn explicit_mapping_follows_vocabulary_order_and_drops_unmapped() {
        let config = table(
            &[
                ("input_year_beg", "begin"),
                ("input_nm_trad", "name"),
                ("input_id", "id"),
                ("input_dynasty", ""),
            ],
            &[],
        );
        let normalized = normalize(&incoming_raw(), Side::Incoming, &config).expect("normalize");
        assert_eq!(
            normalized.fields(),
            ["input_id", "input_nm_trad", "input_year_beg"]
        );
        assert!(!normalized.has_field("input_dynasty"));
        assert_eq!(normalized.origin, MappingOrigin::Manual);
        assert_eq!(normalized.frame.value(1, "input_nm_trad"), Some("酒泉"));
    }

    #[test]
    fn unknown_source_column_is_a_config_error() {
        let config = table(&[("input_nm_trad", "nom")], &[]);
        let err = normalize(&incoming_raw(), Side::Incoming, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownSourceColumn { column, .. }) if column == "nom"
        ));
    }

    #[test]
    fn a_source_column_cannot_feed_two_fields() {
        let config = table(&[("input_nm_trad", "name"), ("input_nm_simp", "name")], &[]);
        let err = normalize(&incoming_raw(), Side::Incoming, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ColumnAlreadyUsed { .. })
        ));
    }

    #[test]
    fn pinyin_and_type_text_is_title_cased() {
        let config = table(
            &[("input_nm_py", "pinyin"), ("input_type_py", "kind"), ("input_id", "id")],
            &[],
        );
        let normalized = normalize(&incoming_raw(), Side::Incoming, &config).expect("normalize");
        assert_eq!(normalized.frame.value(0, "input_nm_py"), Some("Zhangye"));
        assert_eq!(normalized.frame.value(1, "input_nm_py"), Some("Jiuquan"));
        assert_eq!(normalized.frame.value(0, "input_type_py"), Some("Jun"));
        assert_eq!(normalized.frame.value(0, "input_id"), Some("1"));
    }

    #[test]
    fn name_guard_inserts_fallbacks_in_order() {
        let config = table(
            &[("input_id", "id"), ("input_year_beg", "begin")],
            &[("input_nm_py", "pinyin"), ("input_nm_trad", "name")],
        );
        let normalized = normalize(&incoming_raw(), Side::Incoming, &config).expect("normalize");
        assert_eq!(
            normalized.fields(),
            ["input_id", "input_nm_trad", "input_nm_py", "input_year_beg"]
        );
    }

    #[test]
    fn name_guard_is_skipped_when_a_name_is_mapped() {
        let config = table(
            &[("input_nm_py", "pinyin")],
            &[("input_nm_trad", "name")],
        );
        let normalized = normalize(&incoming_raw(), Side::Incoming, &config).expect("normalize");
        assert_eq!(normalized.fields(), ["input_nm_py"]);
    }

    #[test]
    fn name_guard_failure_is_structural() {
        let config = table(&[("input_id", "id")], &[]);
        let err = normalize(&incoming_raw(), Side::Incoming, &config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<NormalizeError>(),
            Some(&NormalizeError::MissingNameField {
                side: Side::Incoming
            })
        );
    }

    #[test]
    fn v5_reference_schema_is_detected() {
        let raw = reference_frame(CHGIS_V5_COLUMNS);
        let config = TableConfig {
            schema: SchemaChoice::Auto,
            ..TableConfig::default()
        };
        let normalized = normalize(&raw, Side::Target, &config).expect("normalize");
        assert_eq!(
            normalized.origin,
            MappingOrigin::Reference(ReferenceSchema::ChgisV5)
        );
        let expected = TARGET_FIELDS.iter().map(|f| f.name).collect::<Vec<_>>();
        assert_eq!(normalized.fields(), expected.as_slice());
        assert_eq!(
            normalized.frame.value(0, "tgaz_data_source"),
            Some("src-value")
        );
        assert!(normalized.mapping.iter().any(|m| m.source == "src"));
    }

    #[test]
    fn v6_reference_schema_excludes_parent_fields() {
        let raw = reference_frame(CHGIS_V6_COLUMNS);
        let config = TableConfig {
            schema: SchemaChoice::Auto,
            ..TableConfig::default()
        };
        let normalized = normalize(&raw, Side::Target, &config).expect("normalize");
        assert_eq!(
            normalized.origin,
            MappingOrigin::Reference(ReferenceSchema::ChgisV6)
        );
        assert!(normalized.fields().iter().all(|f| !f.contains("prnt")));
        assert_eq!(normalized.frame.value(0, "tgaz_beg"), Some("beg_yr-value"));
        assert_eq!(normalized.frame.value(0, "tgaz_type_ch"), Some("Type_Simp-Value"));
    }

    #[test]
    fn unmatched_reference_schema_falls_back_to_manual() {
        let raw = Frame::from_strings(&["sys_id", "nm_trad"], &[&["hvd_1", "張掖"]]).unwrap();
        let config = TableConfig {
            schema: SchemaChoice::ChgisV5,
            fields: BTreeMap::from([("tgaz_nm_trad".to_string(), "nm_trad".to_string())]),
            name_fallback: BTreeMap::new(),
        };
        let normalized = normalize(&raw, Side::Target, &config).expect("normalize");
        assert_eq!(normalized.origin, MappingOrigin::Manual);
        assert_eq!(normalized.fields(), ["tgaz_nm_trad"]);
    }
}
