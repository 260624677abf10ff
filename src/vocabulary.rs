//! Canonical field vocabularies and the CHGIS reference schemas.
//!
//! Incoming data is normalized onto `input_*` fields and target data onto
//! `tgaz_*` fields. Vocabulary order is significant: it is the order used for
//! mapping, for output columns, and for the printed field listing.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Side {
    Incoming,
    Target,
}

impl Side {
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Incoming => "input_",
            Side::Target => "tgaz_",
        }
    }

    pub fn vocabulary(self) -> &'static [CanonicalField] {
        match self {
            Side::Incoming => INCOMING_FIELDS,
            Side::Target => TARGET_FIELDS,
        }
    }

    pub fn describe(self, canonical: &str) -> Option<&'static str> {
        self.vocabulary()
            .iter()
            .find(|field| field.name == canonical)
            .map(|field| field.description)
    }

    pub fn contains(self, canonical: &str) -> bool {
        self.describe(canonical).is_some()
    }

    /// Canonical name of `field` on this side.
    pub fn field(self, field: SharedField) -> &'static str {
        match (self, field) {
            (Side::Incoming, SharedField::NamePinyin) => "input_nm_py",
            (Side::Incoming, SharedField::NameSimplified) => "input_nm_simp",
            (Side::Incoming, SharedField::NameTraditional) => "input_nm_trad",
            (Side::Incoming, SharedField::TypePinyin) => "input_type_py",
            (Side::Incoming, SharedField::TypeChinese) => "input_type_ch",
            (Side::Incoming, SharedField::YearBegin) => "input_year_beg",
            (Side::Incoming, SharedField::YearEnd) => "input_year_end",
            (Side::Incoming, SharedField::XCoord) => "input_x_coord",
            (Side::Incoming, SharedField::YCoord) => "input_y_coord",
            (Side::Target, SharedField::NamePinyin) => "tgaz_nm_py",
            (Side::Target, SharedField::NameSimplified) => "tgaz_nm_simp",
            (Side::Target, SharedField::NameTraditional) => "tgaz_nm_trad",
            (Side::Target, SharedField::TypePinyin) => "tgaz_type_py",
            (Side::Target, SharedField::TypeChinese) => "tgaz_type_ch",
            (Side::Target, SharedField::YearBegin) => "tgaz_beg",
            (Side::Target, SharedField::YearEnd) => "tgaz_end",
            (Side::Target, SharedField::XCoord) => "tgaz_x_coord",
            (Side::Target, SharedField::YCoord) => "tgaz_y_coord",
        }
    }

    /// The three name variants in guard order: traditional, simplified, pinyin.
    pub fn name_fields(self) -> [&'static str; 3] {
        [
            self.field(SharedField::NameTraditional),
            self.field(SharedField::NameSimplified),
            self.field(SharedField::NamePinyin),
        ]
    }

    /// Text fields title-cased after normalization.
    pub fn title_cased_fields(self) -> [&'static str; 5] {
        [
            self.field(SharedField::NamePinyin),
            self.field(SharedField::NameSimplified),
            self.field(SharedField::NameTraditional),
            self.field(SharedField::TypePinyin),
            self.field(SharedField::TypeChinese),
        ]
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Incoming => write!(f, "incoming"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Attributes that exist under a different canonical name on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedField {
    NamePinyin,
    NameSimplified,
    NameTraditional,
    TypePinyin,
    TypeChinese,
    YearBegin,
    YearEnd,
    XCoord,
    YCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalField {
    pub name: &'static str,
    pub description: &'static str,
}

const fn field(name: &'static str, description: &'static str) -> CanonicalField {
    CanonicalField { name, description }
}

pub const INCOMING_FIELDS: &[CanonicalField] = &[
    field("input_id", "a unique ID"),
    field("input_nm_py", "a name in pinyin"),
    field("input_nm_simp", "a name in simplified Chinese characters (简体字)"),
    field("input_nm_trad", "a name in traditional Chinese characters (繁體字)"),
    field("input_type_py", "an administrative type in pinyin (e.g. 'Xian')"),
    field(
        "input_type_ch",
        "an administrative type in Chinese (simplified) characters (e.g. '县')",
    ),
    field("input_year_beg", "a beginning year"),
    field("input_year_end", "an ending year"),
    field("input_dynasty", "a dynasty"),
    field("input_other_id", "another, alternate unique ID"),
    field("input_prnt", "the parent administrative unit's name"),
    field("input_obj_type", "a geospatial type (Point/Vector/Polygon)"),
    field("input_x_coord", "an x coordinate"),
    field("input_y_coord", "a y coordinate"),
];

pub const TARGET_FIELDS: &[CanonicalField] = &[
    field("tgaz_sys_id", "a unique ID"),
    field("tgaz_nm_py", "a name in pinyin"),
    field("tgaz_nm_simp", "a name in simplified Chinese characters (简体字)"),
    field("tgaz_nm_trad", "a name in traditional Chinese characters (繁體字)"),
    field("tgaz_beg", "a beginning year"),
    field("tgaz_end", "an ending year"),
    field("tgaz_data_source", "the source of the data"),
    field("tgaz_obj_type", "a geospatial type (Point/Vector/Polygon)"),
    field("tgaz_pres_loc", "the place's present-day name"),
    field(
        "tgaz_prnt_id",
        "the parent administrative unit's unique ID (NOT prefixed 'hvd_')",
    ),
    field("tgaz_prnt_py", "the parent administrative unit's name in pinyin"),
    field(
        "tgaz_prnt_simp",
        "the parent administrative unit's name in simplified Chinese characters (简体字)",
    ),
    field(
        "tgaz_prnt_sysid",
        "the parent administrative unit's unique ID (prefixed 'hvd_')",
    ),
    field(
        "tgaz_type_ch",
        "an administrative type in Chinese (simplified) characters (e.g. 县)",
    ),
    field("tgaz_type_py", "an administrative type in pinyin (e.g. 'Xian')"),
    field("tgaz_x_coord", "an x coordinate"),
    field("tgaz_y_coord", "a y coordinate"),
];

/// A known CHGIS export layout with fixed rename rules onto `tgaz_*` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSchema {
    ChgisV5,
    ChgisV6,
}

impl ReferenceSchema {
    /// Detection order: v5 is tried before v6.
    pub const ALL: [ReferenceSchema; 2] = [ReferenceSchema::ChgisV5, ReferenceSchema::ChgisV6];

    pub fn label(self) -> &'static str {
        match self {
            ReferenceSchema::ChgisV5 => "CHGIS v5",
            ReferenceSchema::ChgisV6 => "CHGIS v6 (Aug. 2016 draft)",
        }
    }

    /// Every column the source table must carry for this layout to apply.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ReferenceSchema::ChgisV5 => CHGIS_V5_COLUMNS,
            ReferenceSchema::ChgisV6 => CHGIS_V6_COLUMNS,
        }
    }

    /// Source columns whose canonical stem differs from their own name.
    pub fn renames(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ReferenceSchema::ChgisV5 => &[("src", "data_source")],
            ReferenceSchema::ChgisV6 => &[
                ("geo_src", "data_source"),
                ("type_simp", "type_ch"),
                ("beg_yr", "beg"),
                ("end_yr", "end"),
            ],
        }
    }

    /// Canonical fields this layout cannot supply.
    pub fn excluded_fields(self) -> &'static [&'static str] {
        match self {
            ReferenceSchema::ChgisV5 => &[],
            ReferenceSchema::ChgisV6 => &[
                "tgaz_prnt_id",
                "tgaz_prnt_sysid",
                "tgaz_prnt_simp",
                "tgaz_prnt_py",
            ],
        }
    }

    pub fn matches(self, headers: &[String]) -> bool {
        self.columns()
            .iter()
            .all(|column| headers.iter().any(|h| h == column))
    }

    /// Ordered `(source column, canonical field)` pairs for every target field
    /// this layout supplies.
    pub fn field_mapping(self) -> Vec<(String, String)> {
        TARGET_FIELDS
            .iter()
            .filter(|field| !self.excluded_fields().contains(&field.name))
            .filter_map(|field| {
                let stem = field.name.strip_prefix(Side::Target.prefix())?;
                let source = self
                    .renames()
                    .iter()
                    .find(|(_, renamed)| *renamed == stem)
                    .map(|(original, _)| *original)
                    .unwrap_or(stem);
                self.columns()
                    .contains(&source)
                    .then(|| (source.to_string(), field.name.to_string()))
            })
            .collect()
    }
}

impl fmt::Display for ReferenceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub const CHGIS_V5_COLUMNS: &[&str] = &[
    "seq",
    "sys_id",
    "src",
    "nm_py",
    "nm_simp",
    "nm_trad",
    "x_coord",
    "y_coord",
    "pres_loc",
    "type_py",
    "type_ch",
    "beg",
    "end",
    "obj_type",
    "prnt_id",
    "prnt_sysid",
    "prnt_simp",
    "prnt_py",
];

pub const CHGIS_V6_COLUMNS: &[&str] = &[
    "beg_rule",
    "beg_type",
    "beg_yr",
    "checker",
    "compiler",
    "end_rule",
    "end_type",
    "end_yr",
    "entry_date",
    "filename",
    "geo_comp",
    "geo_src",
    "level",
    "mdb_id",
    "nm_py",
    "nm_simp",
    "nm_trad",
    "note_id",
    "obj_type",
    "orig_id",
    "pres_loc",
    "sys_id",
    "type_py",
    "type_simp",
    "x_coord",
    "y_coord",
];
