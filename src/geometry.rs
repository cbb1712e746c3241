// Geometry - "POINT (x y)" text <-> GeoPoint
//
// The dataset (and the API) carry vehicle locations as WKT-style point text.
// Formatting uses five decimals, which is the precision of the source data.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const PREFIX: &str = "POINT (";
const SUFFIX: &str = ")";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointParseError {
    #[error("expected text of the form \"POINT (<x> <y>)\"")]
    MissingDelimiters,

    #[error("expected exactly two coordinates, found {0}")]
    WrongTokenCount(usize),

    #[error("coordinate {0:?} is not a number")]
    NotANumber(String),
}

impl GeoPoint {
    pub fn new(x: f64, y: f64) -> Self {
        GeoPoint { x, y }
    }
}

/// Parse `POINT (<x> <y>)`.
///
/// The literal prefix and suffix must be present; the inner text must split
/// on whitespace into exactly two floating point tokens.
pub fn parse_point(text: &str) -> Result<GeoPoint, PointParseError> {
    let inner = text
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or(PointParseError::MissingDelimiters)?;

    let tokens: Vec<&str> = inner.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(PointParseError::WrongTokenCount(tokens.len()));
    }

    let coordinate = |token: &str| {
        token
            .parse::<f64>()
            .map_err(|_| PointParseError::NotANumber(token.to_string()))
    };

    Ok(GeoPoint {
        x: coordinate(tokens[0])?,
        y: coordinate(tokens[1])?,
    })
}

impl FromStr for GeoPoint {
    type Err = PointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_point(s)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT ({:.5} {:.5})", self.x, self.y)
    }
}

impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_point(&text).map_err(serde::de::Error::custom)
    }
}

impl ToSql for GeoPoint {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for GeoPoint {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        parse_point(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
