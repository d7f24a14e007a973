//! Table schemas: which sheets a catalog kind lives in and which column
//! tags carry each catalog field

use crate::error::{Error, Result};
use crate::grid::CellValue;
use crate::tags::TagMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two catalogs a player filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogKind {
    Powers,
    MagicItems,
}

/// Sheet names and tags one catalog kind uses across the workbooks
#[derive(Debug)]
pub struct CatalogSheets {
    /// Catalog sheet in the DB workbook
    pub db: &'static str,
    /// Player-edited input sheet in a custom workbook
    pub custom_input: &'static str,
    /// Published sheet in a custom workbook
    pub verified: &'static str,
    /// Allowed values for the input sheet
    pub validation_lists: &'static str,
    /// Selection sheet in a character workbook
    pub filter: &'static str,
    /// Flat copy of the selected entries in a character workbook
    pub cache: &'static str,
    /// Column-tag prefix of the dropdown columns on the Game sheet
    pub dropdown_prefix: &'static str,
    /// Prefix of the Game-sheet columns filled from a dropdown choice
    pub detail_prefix: &'static str,
    pub range_start: &'static str,
    pub range_end: &'static str,
    /// Lowercase plural used in messages
    pub noun: &'static str,
}

static POWER_SHEETS: CatalogSheets = CatalogSheets {
    db: "Powers",
    custom_input: "Powers",
    verified: "VerifiedPowers",
    validation_lists: "PowerValidationLists",
    filter: "Filter Powers",
    cache: "PowerDataCache",
    dropdown_prefix: "powerdropdown",
    detail_prefix: "power",
    range_start: "powertablestart",
    range_end: "powertableend",
    noun: "powers",
};

static MAGIC_ITEM_SHEETS: CatalogSheets = CatalogSheets {
    db: "Magic Items",
    custom_input: "Magic Items",
    verified: "VerifiedMagicItems",
    validation_lists: "MagicItemValidationLists",
    filter: "Filter Magic Items",
    cache: "MagicItemDataCache",
    dropdown_prefix: "magicitemdropdown",
    detail_prefix: "magicitem",
    range_start: "magicitemtablestart",
    range_end: "magicitemtableend",
    noun: "magic items",
};

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::Powers, CatalogKind::MagicItems];

    pub fn sheets(self) -> &'static CatalogSheets {
        match self {
            CatalogKind::Powers => &POWER_SHEETS,
            CatalogKind::MagicItems => &MAGIC_ITEM_SHEETS,
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Powers => write!(f, "Powers"),
            CatalogKind::MagicItems => write!(f, "Magic Items"),
        }
    }
}

/// Canonical catalog fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Dropdown,
    Type,
    SubType,
    TableName,
    Source,
    Usage,
    Action,
    AbilityName,
    Effect,
}

impl Field {
    /// Every field, in the column order of a catalog sheet
    pub const ALL: [Field; 9] = [
        Field::Dropdown,
        Field::Type,
        Field::SubType,
        Field::TableName,
        Field::Source,
        Field::Usage,
        Field::Action,
        Field::AbilityName,
        Field::Effect,
    ];

    /// Normalized column tag in the DB convention
    pub fn tag(self) -> &'static str {
        match self {
            Field::Dropdown => "dropdown",
            Field::Type => "type",
            Field::SubType => "subtype",
            Field::TableName => "tablename",
            Field::Source => "source",
            Field::Usage => "usage",
            Field::Action => "action",
            Field::AbilityName => "abilityname",
            Field::Effect => "effect",
        }
    }

    /// Column heading written above cached rows
    pub fn heading(self) -> &'static str {
        match self {
            Field::Dropdown => "DropDown",
            Field::Type => "Type",
            Field::SubType => "SubType",
            Field::TableName => "TableName",
            Field::Source => "Source",
            Field::Usage => "Usage",
            Field::Action => "Action",
            Field::AbilityName => "AbilityName",
            Field::Effect => "Effect",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// How a sheet names its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceConvention {
    /// DB, Tbls and cache sheets
    Local,
    /// Sheets in player-made custom workbooks
    Custom,
}

impl SourceConvention {
    /// Accepted column tags for a field, most preferred first
    pub fn aliases(self, field: Field) -> &'static [&'static str] {
        match (self, field) {
            (SourceConvention::Custom, Field::AbilityName) => &["abilityname", "name"],
            (SourceConvention::Custom, Field::SubType) => &["subtype", "category"],
            (_, Field::Dropdown) => &["dropdown"],
            (_, Field::Type) => &["type"],
            (_, Field::SubType) => &["subtype"],
            (_, Field::TableName) => &["tablename"],
            (_, Field::Source) => &["source"],
            (_, Field::Usage) => &["usage"],
            (_, Field::Action) => &["action"],
            (_, Field::AbilityName) => &["abilityname"],
            (_, Field::Effect) => &["effect"],
        }
    }
}

/// Field -> column index for one sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    cols: [Option<usize>; 9],
}

impl ColumnMap {
    /// Resolve fields against a sheet's tags
    ///
    /// Fields listed in `required` must be present; the rest are mapped when
    /// their tag exists.
    pub fn resolve(
        tags: &TagMap,
        sheet: &str,
        convention: SourceConvention,
        required: &[Field],
    ) -> Result<Self> {
        let mut map = ColumnMap::default();

        for field in Field::ALL {
            let aliases = convention.aliases(field);
            let found = aliases.iter().find_map(|tag| tags.col(tag));
            match found {
                Some(c) => map.cols[field.index()] = Some(c),
                None if required.contains(&field) => {
                    return Err(Error::missing_column_tag(sheet, aliases[0]));
                }
                None => {}
            }
        }

        Ok(map)
    }

    /// A map over every field in canonical order starting at column 1
    pub fn canonical() -> Self {
        let mut map = ColumnMap::default();
        for (i, field) in Field::ALL.iter().enumerate() {
            map.cols[field.index()] = Some(i + 1);
        }
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.cols[field.index()]
    }

    /// The cell for `field` in `row`, empty when unmapped
    pub fn cell<'r>(&self, row: &'r [CellValue], field: Field) -> Option<&'r CellValue> {
        self.get(field).and_then(|c| row.get(c))
    }

    /// Number of columns a row needs to hold every mapped field
    pub fn width(&self) -> usize {
        self.cols
            .iter()
            .flatten()
            .max()
            .map_or(0, |&c| c + 1)
    }
}
