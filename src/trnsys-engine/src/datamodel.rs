// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Proforma schema: the immutable description of a component type.
//!
//! Proformas are produced by an external loader (usually from the XML
//! files shipped with TRNSYS Studio).  The JSON form accepted by
//! [`Proforma::from_json`] uses the same field names as these structs:
//!
//! ```ignore
//! let proforma = Proforma::from_json(json_str)?;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::{Error, ErrorCode, ErrorKind, Result, TypeNumber, standardize_name};
use crate::cycle;
use crate::quantity::Bounds;
use crate::units::Dimension;

// Helper functions for serde skip_serializing_if

fn is_false(val: &bool) -> bool {
    !*val
}

fn is_empty_string(val: &str) -> bool {
    val.is_empty()
}

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

fn is_dimensionless(dim: &Dimension) -> bool {
    *dim == Dimension::Dimensionless
}

fn dimensionless() -> Dimension {
    Dimension::Dimensionless
}

fn neg_inf() -> f64 {
    f64::NEG_INFINITY
}

fn pos_inf() -> f64 {
    f64::INFINITY
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn parse_limit(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "+inf" | "inf" | "+infinity" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse().ok(),
    }
}

fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => parse_limit(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("bad bound '{s}'"))),
    }
}

fn serialize_limit<S>(val: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if *val == f64::INFINITY {
        serializer.serialize_str("+INF")
    } else if *val == f64::NEG_INFINITY {
        serializer.serialize_str("-INF")
    } else {
        serializer.serialize_f64(*val)
    }
}

/// Defaults may name a simulation setting instead of a number.
fn deserialize_default<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "STEP" | "START" => Ok(1.0),
            "STOP" => Ok(8760.0),
            other => other
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("bad default '{s}'"))),
        },
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parameter,
    Input,
    Output,
    Derivative,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Parameter, Role::Input, Role::Output, Role::Derivative];

    /// Section keyword used in a component block.
    pub fn keyword(self) -> &'static str {
        match self {
            Role::Parameter => "PARAMETERS",
            Role::Input => "INPUTS",
            Role::Output => "OUTPUTS",
            Role::Derivative => "DERIVATIVES",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Role::Parameter => "parameter",
            Role::Input => "input",
            Role::Output => "output",
            Role::Derivative => "derivative",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    #[default]
    Real,
    Integer,
}

/// Openness of a variable's `[min, max]` range, written the way
/// proformas do: `[;]`, `[;[`, `];]` or `];[`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Boundaries {
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl Default for Boundaries {
    fn default() -> Self {
        Boundaries {
            min_inclusive: true,
            max_inclusive: true,
        }
    }
}

impl FromStr for Boundaries {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let b = compact.as_bytes();
        if b.len() != 3 || b[1] != b';' || !matches!(b[0], b'[' | b']') || !matches!(b[2], b'[' | b']') {
            return Err(Error::new(
                ErrorKind::Schema,
                ErrorCode::SchemaDeserialization,
                Some(format!("bad boundaries '{s}'")),
            ));
        }
        Ok(Boundaries {
            min_inclusive: b[0] == b'[',
            max_inclusive: b[2] == b']',
        })
    }
}

impl TryFrom<String> for Boundaries {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Boundaries> for String {
    fn from(b: Boundaries) -> Self {
        b.to_string()
    }
}

impl fmt::Display for Boundaries {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let open = if self.min_inclusive { '[' } else { ']' };
        let close = if self.max_inclusive { ']' } else { '[' };
        write!(f, "{open};{close}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub order: u32,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "is_dimensionless", default = "dimensionless")]
    pub dimension: Dimension,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub unit: String,
    #[serde(rename = "type", default)]
    pub kind: ScalarKind,
    #[serde(
        default = "neg_inf",
        deserialize_with = "deserialize_limit",
        serialize_with = "serialize_limit"
    )]
    pub min: f64,
    #[serde(
        default = "pos_inf",
        deserialize_with = "deserialize_limit",
        serialize_with = "serialize_limit"
    )]
    pub max: f64,
    #[serde(default)]
    pub boundaries: Boundaries,
    #[serde(default, deserialize_with = "deserialize_default")]
    pub default: f64,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub definition: String,
}

impl VariableDef {
    /// Identifier used as the stable base name of every instance.
    pub fn base_name(&self) -> String {
        standardize_name(&self.name)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min: self.min,
            max: self.max,
            boundaries: self.boundaries,
        }
    }
}

/// A block of rows that repeats once per unit of a driving parameter's
/// value.  Rows are 1-based; a nested cycle's rows are relative to one
/// repetition of its parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDef {
    pub role: Role,
    pub first_row: usize,
    pub last_row: usize,
    #[serde(default)]
    pub min_size: usize,
    pub max_size: usize,
    pub param_name: String,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub cycles: Vec<CycleDef>,
}

impl CycleDef {
    pub fn row_count(&self) -> usize {
        self.last_row + 1 - self.first_row
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFileDecl {
    pub question: String,
    pub logical_unit: u32,
    /// The default answer: the path assigned unless overridden.
    #[serde(default)]
    pub answer: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub designate: bool,
}

/// Extra card printed verbatim after a component's initial input
/// values, e.g. `LABELS 3`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCard {
    pub name: String,
    #[serde(skip_serializing_if = "is_empty_string", default)]
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proforma {
    pub object: String,
    pub type_number: TypeNumber,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    pub variables: Vec<VariableDef>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub cycles: Vec<CycleDef>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub external_files: Vec<ExternalFileDecl>,
    #[serde(skip_serializing_if = "is_empty_vec", default)]
    pub special_cards: Vec<SpecialCard>,
}

impl Proforma {
    pub fn from_json(json: &str) -> Result<Proforma> {
        let proforma: Proforma = serde_json::from_str(json).map_err(|err| {
            Error::new(
                ErrorKind::Schema,
                ErrorCode::SchemaDeserialization,
                Some(err.to_string()),
            )
        })?;
        proforma.validate()?;
        Ok(proforma)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(
                ErrorKind::Schema,
                ErrorCode::SchemaDeserialization,
                Some(err.to_string()),
            )
        })
    }

    /// Definitions of `role` in schema order.
    pub fn definitions(&self, role: Role) -> Vec<&VariableDef> {
        let mut defs: Vec<&VariableDef> = self.variables.iter().filter(|v| v.role == role).collect();
        // stable, so ties keep declaration order
        defs.sort_by_key(|v| v.order);
        defs
    }

    /// Top-level cycles over `role`.
    pub fn cycles_for(&self, role: Role) -> Vec<&CycleDef> {
        self.cycles.iter().filter(|c| c.role == role).collect()
    }

    /// Standardized names of every parameter that drives a cycle.
    pub fn driving_parameters(&self) -> BTreeSet<String> {
        fn walk(cycles: &[CycleDef], out: &mut BTreeSet<String>) {
            for cycle in cycles {
                out.insert(standardize_name(&cycle.param_name));
                walk(&cycle.cycles, out);
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.cycles, &mut out);
        out
    }

    /// Roles containing a cycle driven (at any depth) by `param`.
    pub fn roles_driven_by(&self, param: &str) -> BTreeSet<Role> {
        fn drives(cycle: &CycleDef, param: &str) -> bool {
            standardize_name(&cycle.param_name) == param
                || cycle.cycles.iter().any(|c| drives(c, param))
        }
        let param = standardize_name(param);
        self.cycles
            .iter()
            .filter(|c| drives(c, &param))
            .map(|c| c.role)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        cycle::validate(self)
    }
}
