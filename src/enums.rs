// Described enums - EV type and CAFV eligibility
//
// Every variant carries exactly one human-readable description. The dataset
// ships the description text, the database stores the integer id, and the
// API exposes both through `EnumIdentifier`.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entities::EnumIdentifier;

// ============================================================================
// DESCRIBED ENUM TRAIT
// ============================================================================

/// Static description table for a small, closed enum.
///
/// `Default` is the sentinel returned when a description cannot be matched.
pub trait DescribedEnum: Copy + PartialEq + Default + 'static {
    /// Type name used in API messages ("EvType", "CafvType")
    const NAME: &'static str;

    /// All variants in declaration (= id) order
    const VARIANTS: &'static [Self];

    fn id(self) -> i32;

    fn description(self) -> &'static str;

    fn from_id(id: i32) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.id() == id)
    }

    /// Exact-match reverse lookup; unknown text resolves to the sentinel.
    fn from_description(description: &str) -> Self {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|v| v.description() == description)
            .unwrap_or_default()
    }

    fn identifier(self) -> EnumIdentifier {
        EnumIdentifier {
            id: self.id(),
            description: self.description().to_string(),
        }
    }

    fn identifiers() -> Vec<EnumIdentifier> {
        Self::VARIANTS.iter().map(|v| v.identifier()).collect()
    }
}

/// Description → value lookup for any described enum.
pub fn from_description<E: DescribedEnum>(description: &str) -> E {
    E::from_description(description)
}

/// Id → identifier lookup, `None` when the id is not a variant.
pub fn identifier_by_id<E: DescribedEnum>(id: i32) -> Option<EnumIdentifier> {
    E::from_id(id).map(DescribedEnum::identifier)
}

// ============================================================================
// EV TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvType {
    #[default]
    None = 0,
    /// Plug-in hybrid
    Phev = 1,
    /// Battery electric
    Bev = 2,
}

impl DescribedEnum for EvType {
    const NAME: &'static str = "EvType";
    const VARIANTS: &'static [Self] = &[EvType::None, EvType::Phev, EvType::Bev];

    fn id(self) -> i32 {
        self as i32
    }

    fn description(self) -> &'static str {
        match self {
            EvType::None => "None",
            EvType::Phev => "Plug-in Hybrid Electric Vehicle (PHEV)",
            EvType::Bev => "Battery Electric Vehicle (BEV)",
        }
    }
}

// ============================================================================
// CAFV TYPE (Clean Alternative Fuel Vehicle eligibility)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CafvType {
    #[default]
    None = 0,
    NotEligibleDueToRange = 1,
    EligibilityUnknown = 2,
    Eligible = 3,
}

impl DescribedEnum for CafvType {
    const NAME: &'static str = "CafvType";
    const VARIANTS: &'static [Self] = &[
        CafvType::None,
        CafvType::NotEligibleDueToRange,
        CafvType::EligibilityUnknown,
        CafvType::Eligible,
    ];

    fn id(self) -> i32 {
        self as i32
    }

    fn description(self) -> &'static str {
        match self {
            CafvType::None => "None",
            CafvType::NotEligibleDueToRange => "Not eligible due to low battery range",
            CafvType::EligibilityUnknown => {
                "Eligibility unknown as battery range has not been researched"
            }
            CafvType::Eligible => "Clean Alternative Fuel Vehicle Eligible",
        }
    }
}

// ============================================================================
// WIRE + STORAGE: both enums travel as their integer id
// ============================================================================

fn serialize_id<E: DescribedEnum, S: Serializer>(value: E, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(value.id())
}

fn deserialize_id<'de, E: DescribedEnum, D: Deserializer<'de>>(deserializer: D) -> Result<E, D::Error> {
    let id = i32::deserialize(deserializer)?;
    E::from_id(id).ok_or_else(|| {
        serde::de::Error::custom(format!("there is no {} with an id of {}", E::NAME, id))
    })
}

fn column_to_enum<E: DescribedEnum>(value: ValueRef<'_>) -> FromSqlResult<E> {
    let raw = value.as_i64()?;
    i32::try_from(raw)
        .ok()
        .and_then(E::from_id)
        .ok_or(FromSqlError::OutOfRange(raw))
}

impl Serialize for EvType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_id(*self, serializer)
    }
}

impl<'de> Deserialize<'de> for EvType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_id(deserializer)
    }
}

impl ToSql for EvType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for EvType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        column_to_enum(value)
    }
}

impl Serialize for CafvType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_id(*self, serializer)
    }
}

impl<'de> Deserialize<'de> for CafvType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_id(deserializer)
    }
}

impl ToSql for CafvType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for CafvType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        column_to_enum(value)
    }
}
