//! Match configuration.
//!
//! Every choice the reconciliation needs (field mappings, reference schema,
//! name key and mode, coordinate mode and precision, administrative type key)
//! is collected up front in a [`MatchConfig`], usually loaded from YAML and
//! overridden from the command line. [`MatchingConfig::resolve`] validates the
//! matching choices once, against the fields that survived normalization, and
//! produces the typed [`MatchPlan`] the pipeline runs on.

use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    vocabulary::{INCOMING_FIELDS, ReferenceSchema, SharedField, Side, TARGET_FIELDS},
    yaml_provider,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'{field}' is not a canonical {side} field")]
    UnknownCanonicalField { side: Side, field: String },
    #[error("{side} column '{column}' (for '{canonical}') not found in table")]
    UnknownSourceColumn {
        side: Side,
        canonical: String,
        column: String,
    },
    #[error("{side} column '{column}' is mapped to both '{first}' and '{second}'")]
    ColumnAlreadyUsed {
        side: Side,
        column: String,
        first: String,
        second: String,
    },
    #[error("reference schemas only apply to the target table")]
    ReferenceSchemaOnIncoming,
    #[error("name key '{key}' requires '{field}' in the {side} table")]
    NameKeyUnavailable {
        key: NameKey,
        side: Side,
        field: &'static str,
    },
    #[error("no name field (traditional, simplified, pinyin) is present in both tables")]
    NoSharedNameKey,
    #[error("incoming data has both administrative type fields; set matching.type_key to 'py' or 'ch'")]
    AmbiguousTypeKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub incoming: TableConfig,
    pub target: TableConfig,
    pub matching: MatchingConfig,
}

impl MatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        yaml_provider::load_from_path(path)
            .with_context(|| format!("Loading match configuration from {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        yaml_provider::save_to_path(path, self)
            .with_context(|| format!("Writing match configuration to {path:?}"))
    }

    /// Starter configuration listing every canonical field with no source column.
    pub fn template() -> Self {
        let blank = |fields: &[crate::vocabulary::CanonicalField]| {
            fields
                .iter()
                .map(|field| (field.name.to_string(), String::new()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            incoming: TableConfig {
                schema: SchemaChoice::Manual,
                fields: blank(INCOMING_FIELDS),
                name_fallback: BTreeMap::new(),
            },
            target: TableConfig {
                schema: SchemaChoice::Auto,
                fields: blank(TARGET_FIELDS),
                name_fallback: BTreeMap::new(),
            },
            matching: MatchingConfig {
                name_key: Some(NameKey::Trad),
                ..MatchingConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub schema: SchemaChoice,
    /// Canonical field -> source column. Blank or absent entries drop the field.
    pub fields: BTreeMap<String, String>,
    /// Name-field mappings applied only when no name field survives `fields`.
    pub name_fallback: BTreeMap<String, String>,
}

impl TableConfig {
    /// Source column configured for `canonical`, ignoring blank entries.
    pub fn source_for(&self, canonical: &str) -> Option<&str> {
        lookup(&self.fields, canonical)
    }

    pub fn fallback_for(&self, canonical: &str) -> Option<&str> {
        lookup(&self.name_fallback, canonical)
    }

    /// Rejects keys outside the side's vocabulary.
    pub fn validate_keys(&self, side: Side) -> Result<(), ConfigError> {
        if side == Side::Incoming && !matches!(self.schema, SchemaChoice::Manual) {
            return Err(ConfigError::ReferenceSchemaOnIncoming);
        }
        for key in self.fields.keys().chain(self.name_fallback.keys()) {
            if !side.contains(key) {
                return Err(ConfigError::UnknownCanonicalField {
                    side,
                    field: key.clone(),
                });
            }
        }
        Ok(())
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, canonical: &str) -> Option<&'a str> {
    map.get(canonical)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// How target columns are mapped onto the canonical vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SchemaChoice {
    /// Use the explicit `fields` mapping.
    #[default]
    Manual,
    /// Detect CHGIS v5, then v6, falling back to `fields`.
    Auto,
    ChgisV5,
    ChgisV6,
}

impl SchemaChoice {
    /// Reference schemas to try, in order.
    pub fn candidates(self) -> &'static [ReferenceSchema] {
        match self {
            SchemaChoice::Manual => &[],
            SchemaChoice::Auto => &ReferenceSchema::ALL,
            SchemaChoice::ChgisV5 => &[ReferenceSchema::ChgisV5],
            SchemaChoice::ChgisV6 => &[ReferenceSchema::ChgisV6],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum NameKey {
    /// Traditional characters (繁體字)
    Trad,
    /// Simplified characters (简体字)
    Simp,
    /// Pinyin (拼音)
    Py,
}

impl NameKey {
    /// Preference order when no key is configured.
    pub const PREFERENCE: [NameKey; 3] = [NameKey::Trad, NameKey::Simp, NameKey::Py];

    pub fn shared_field(self) -> SharedField {
        match self {
            NameKey::Trad => SharedField::NameTraditional,
            NameKey::Simp => SharedField::NameSimplified,
            NameKey::Py => SharedField::NamePinyin,
        }
    }

    pub fn field(self, side: Side) -> &'static str {
        side.field(self.shared_field())
    }

    /// Label used in reports (`nm_trad`, `nm_simp`, `nm_py`).
    pub fn label(self) -> &'static str {
        match self {
            NameKey::Trad => "nm_trad",
            NameKey::Simp => "nm_simp",
            NameKey::Py => "nm_py",
        }
    }

    pub fn supports_fuzzy(self) -> bool {
        !matches!(self, NameKey::Py)
    }

    /// The name mode actually applied for a requested one.
    pub fn effective_mode(self, requested: MatchMode) -> MatchMode {
        if self.supports_fuzzy() {
            requested
        } else {
            MatchMode::Strict
        }
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Strict,
    Fuzzy,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Strict => write!(f, "strict"),
            MatchMode::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum TypeKey {
    /// Pinyin ('Xian', 'Zhou', ...)
    Py,
    /// Chinese ('县', '州', ...)
    Ch,
}

impl TypeKey {
    pub fn shared_field(self) -> SharedField {
        match self {
            TypeKey::Py => SharedField::TypePinyin,
            TypeKey::Ch => SharedField::TypeChinese,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TypeKey::Py => "type_py",
            TypeKey::Ch => "type_ch",
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Decimal-place setting exactly as supplied; parsed leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrecision {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawPrecision {
    /// Decimal places to round to, or `None` when the value is not an integer.
    /// Negative values round to tens, hundreds and so on.
    pub fn places(&self) -> Option<i64> {
        match self {
            RawPrecision::Integer(value) => Some(*value),
            RawPrecision::Float(_) => None,
            RawPrecision::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }
}

impl fmt::Display for RawPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawPrecision::Integer(value) => write!(f, "{value}"),
            RawPrecision::Float(value) => write!(f, "{value}"),
            RawPrecision::Text(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub name_key: Option<NameKey>,
    pub name_mode: MatchMode,
    pub coord_mode: MatchMode,
    pub decimal_places: Option<RawPrecision>,
    pub type_key: Option<TypeKey>,
}

/// Coordinate comparison setting after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CoordinateMode {
    Strict,
    Fuzzy {
        places: i64,
        /// True when the requested precision was unusable and 0 was substituted.
        defaulted: bool,
    },
}

impl CoordinateMode {
    pub fn label(self) -> MatchMode {
        match self {
            CoordinateMode::Strict => MatchMode::Strict,
            CoordinateMode::Fuzzy { .. } => MatchMode::Fuzzy,
        }
    }
}

/// The validated matching choices a pipeline run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchPlan {
    pub name_key: NameKey,
    pub name_mode: MatchMode,
    pub coordinates: CoordinateMode,
    pub type_key: Option<TypeKey>,
}

impl MatchingConfig {
    /// Validates the matching choices against the canonical fields each side
    /// actually carries after normalization.
    pub fn resolve(
        &self,
        incoming_fields: &[String],
        target_fields: &[String],
    ) -> Result<MatchPlan, ConfigError> {
        let has = |fields: &[String], name: &str| fields.iter().any(|f| f == name);

        let name_key = match self.name_key {
            Some(key) => {
                for (side, fields) in [
                    (Side::Incoming, incoming_fields),
                    (Side::Target, target_fields),
                ] {
                    if !has(fields, key.field(side)) {
                        return Err(ConfigError::NameKeyUnavailable {
                            key,
                            side,
                            field: key.field(side),
                        });
                    }
                }
                key
            }
            None => NameKey::PREFERENCE
                .into_iter()
                .find(|key| {
                    has(incoming_fields, key.field(Side::Incoming))
                        && has(target_fields, key.field(Side::Target))
                })
                .ok_or(ConfigError::NoSharedNameKey)?,
        };

        let name_mode = name_key.effective_mode(self.name_mode);
        if name_mode != self.name_mode {
            warn!(
                "Fuzzy matching is not supported for pinyin names; proceeding with strict matching"
            );
        }

        let coordinates = match self.coord_mode {
            MatchMode::Strict => CoordinateMode::Strict,
            MatchMode::Fuzzy => match self.decimal_places.as_ref().map(|raw| (raw, raw.places())) {
                Some((_, Some(places))) => CoordinateMode::Fuzzy {
                    places,
                    defaulted: false,
                },
                Some((raw, None)) => {
                    warn!("Decimal places '{raw}' is not a valid integer; defaulting to 0 (integer rounding)");
                    CoordinateMode::Fuzzy {
                        places: 0,
                        defaulted: true,
                    }
                }
                None => {
                    warn!("No decimal places supplied for fuzzy coordinates; defaulting to 0 (integer rounding)");
                    CoordinateMode::Fuzzy {
                        places: 0,
                        defaulted: true,
                    }
                }
            },
        };

        let has_py = has(incoming_fields, Side::Incoming.field(SharedField::TypePinyin));
        let has_ch = has(incoming_fields, Side::Incoming.field(SharedField::TypeChinese));
        let type_key = match (has_py, has_ch) {
            (true, true) => Some(self.type_key.ok_or(ConfigError::AmbiguousTypeKey)?),
            (true, false) => Some(TypeKey::Py),
            (false, true) => Some(TypeKey::Ch),
            (false, false) => None,
        };
        if let (Some(requested), Some(used)) = (self.type_key, type_key)
            && requested != used
        {
            warn!(
                "Administrative type key '{requested}' is not present in incoming data; matching on '{used}'"
            );
        }

        Ok(MatchPlan {
            name_key,
            name_mode,
            coordinates,
            type_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn yaml_round_trips_through_the_template() {
        let template = MatchConfig::template();
        let text = yaml_provider::to_string(&template).expect("serialize");
        let parsed: MatchConfig = yaml_provider::from_str(&text).expect("parse");
        assert_eq!(parsed, template);
    }

    #[test]
    fn parses_documented_layout() {
        let text = r#"
incoming:
  fields:
    input_nm_trad: name
    input_id: ""
target:
  schema: chgis-v6
matching:
  name_key: trad
  name_mode: fuzzy
  coord_mode: fuzzy
  decimal_places: "2"
  type_key: ch
"#;
        let config: MatchConfig = yaml_provider::from_str(text).expect("parse");
        assert_eq!(config.incoming.source_for("input_nm_trad"), Some("name"));
        assert_eq!(config.incoming.source_for("input_id"), None);
        assert_eq!(config.target.schema, SchemaChoice::ChgisV6);
        assert_eq!(config.matching.decimal_places.unwrap().places(), Some(2));
        assert_eq!(config.matching.type_key, Some(TypeKey::Ch));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let table = TableConfig {
            fields: BTreeMap::from([("input_colour".to_string(), "c".to_string())]),
            ..TableConfig::default()
        };
        assert_eq!(
            table.validate_keys(Side::Incoming),
            Err(ConfigError::UnknownCanonicalField {
                side: Side::Incoming,
                field: "input_colour".to_string()
            })
        );
        let on_incoming = TableConfig {
            schema: SchemaChoice::Auto,
            ..TableConfig::default()
        };
        assert_eq!(
            on_incoming.validate_keys(Side::Incoming),
            Err(ConfigError::ReferenceSchemaOnIncoming)
        );
    }

    #[test]
    fn pinyin_forces_strict_name_matching() {
        let matching = MatchingConfig {
            name_key: Some(NameKey::Py),
            name_mode: MatchMode::Fuzzy,
            ..MatchingConfig::default()
        };
        let plan = matching
            .resolve(&fields(&["input_nm_py"]), &fields(&["tgaz_nm_py"]))
            .expect("plan");
        assert_eq!(plan.name_mode, MatchMode::Strict);
    }

    #[test]
    fn name_key_defaults_to_first_shared_variant() {
        let plan = MatchingConfig::default()
            .resolve(
                &fields(&["input_nm_py", "input_nm_simp"]),
                &fields(&["tgaz_nm_simp", "tgaz_nm_py", "tgaz_nm_trad"]),
            )
            .expect("plan");
        assert_eq!(plan.name_key, NameKey::Simp);

        let err = MatchingConfig::default()
            .resolve(&fields(&["input_nm_py"]), &fields(&["tgaz_nm_trad"]))
            .unwrap_err();
        assert_eq!(err, ConfigError::NoSharedNameKey);
    }

    #[test]
    fn configured_name_key_must_exist_on_both_sides() {
        let matching = MatchingConfig {
            name_key: Some(NameKey::Trad),
            ..MatchingConfig::default()
        };
        let err = matching
            .resolve(&fields(&["input_nm_trad"]), &fields(&["tgaz_nm_py"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NameKeyUnavailable {
                side: Side::Target,
                ..
            }
        ));
    }

    #[test]
    fn invalid_decimal_places_default_to_zero() {
        let both = fields(&["input_nm_trad"]);
        let target = fields(&["tgaz_nm_trad"]);
        for raw in [RawPrecision::Text("one".into()), RawPrecision::Float(1.5)] {
            let matching = MatchingConfig {
                coord_mode: MatchMode::Fuzzy,
                decimal_places: Some(raw),
                ..MatchingConfig::default()
            };
            let plan = matching.resolve(&both, &target).expect("plan");
            assert_eq!(
                plan.coordinates,
                CoordinateMode::Fuzzy {
                    places: 0,
                    defaulted: true
                }
            );
        }
    }

    #[test]
    fn integer_decimal_places_are_kept_even_when_negative_or_large() {
        let incoming = fields(&["input_nm_trad"]);
        let target = fields(&["tgaz_nm_trad"]);
        for (raw, expected) in [
            (RawPrecision::Integer(-1), -1),
            (RawPrecision::Text(" -2 ".into()), -2),
            (RawPrecision::Integer(5_000_000_000), 5_000_000_000),
        ] {
            let matching = MatchingConfig {
                coord_mode: MatchMode::Fuzzy,
                decimal_places: Some(raw),
                ..MatchingConfig::default()
            };
            let plan = matching.resolve(&incoming, &target).expect("plan");
            assert_eq!(
                plan.coordinates,
                CoordinateMode::Fuzzy {
                    places: expected,
                    defaulted: false
                }
            );
        }
    }

    #[test]
    fn only_pinyin_downgrades_fuzzy_names() {
        assert_eq!(NameKey::Py.effective_mode(MatchMode::Fuzzy), MatchMode::Strict);
        assert_eq!(NameKey::Trad.effective_mode(MatchMode::Fuzzy), MatchMode::Fuzzy);
        assert_eq!(NameKey::Simp.effective_mode(MatchMode::Strict), MatchMode::Strict);
    }

    #[test]
    fn type_key_resolution() {
        let target = fields(&["tgaz_nm_trad"]);
        let both = fields(&["input_nm_trad", "input_type_py", "input_type_ch"]);
        assert_eq!(
            MatchingConfig::default().resolve(&both, &target).unwrap_err(),
            ConfigError::AmbiguousTypeKey
        );
        let chosen = MatchingConfig {
            type_key: Some(TypeKey::Ch),
            ..MatchingConfig::default()
        };
        assert_eq!(
            chosen.resolve(&both, &target).unwrap().type_key,
            Some(TypeKey::Ch)
        );

        let only_py = fields(&["input_nm_trad", "input_type_py"]);
        assert_eq!(
            chosen.resolve(&only_py, &target).unwrap().type_key,
            Some(TypeKey::Py)
        );
        let none = fields(&["input_nm_trad"]);
        assert_eq!(MatchingConfig::default().resolve(&none, &target).unwrap().type_key, None);
    }
}
