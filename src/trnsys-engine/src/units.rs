// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Dimension-tagged unit conversion.
//!
//! Every dimension has a base unit; each known unit converts to that
//! base with `base = value * scale + offset`.  Conversions only happen
//! between units of the same dimension, so `K` can mean an absolute
//! temperature or a temperature difference depending on the variable
//! it is assigned to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::var_err;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Dimension {
    Temperature,
    TempDifference,
    FlowRate,
    VolumetricFlowRate,
    Power,
    Energy,
    Pressure,
    Length,
    Density,
    ThermalConductivity,
    SpecificHeat,
    DynamicViscosity,
    Time,
    Dimensionless,
    /// Proforma `any`: accepts every unit without conversion.
    Any,
    /// A dimension this table knows nothing about; only the declared
    /// unit is accepted.
    Other(String),
}

const DIMENSION_NAMES: &[(Dimension, &str)] = &[
    (Dimension::Temperature, "Temperature"),
    (Dimension::TempDifference, "Temp. Difference"),
    (Dimension::FlowRate, "Flow Rate"),
    (Dimension::VolumetricFlowRate, "Volumetric Flow Rate"),
    (Dimension::Power, "Power"),
    (Dimension::Energy, "Energy"),
    (Dimension::Pressure, "Pressure"),
    (Dimension::Length, "Length"),
    (Dimension::Density, "Density"),
    (Dimension::ThermalConductivity, "Thermal Conductivity"),
    (Dimension::SpecificHeat, "Specific Heat"),
    (Dimension::DynamicViscosity, "Dynamic Viscosity"),
    (Dimension::Time, "Time"),
    (Dimension::Dimensionless, "Dimensionless"),
    (Dimension::Any, "any"),
];

impl From<String> for Dimension {
    fn from(name: String) -> Self {
        let trimmed = name.trim();
        for (dim, dim_name) in DIMENSION_NAMES {
            if dim_name.eq_ignore_ascii_case(trimmed) {
                return dim.clone();
            }
        }
        // common spellings found in older proformas
        match trimmed.to_ascii_lowercase().as_str() {
            "temperature difference" | "temp difference" => Dimension::TempDifference,
            "mass flow rate" => Dimension::FlowRate,
            "volume flow rate" => Dimension::VolumetricFlowRate,
            "" => Dimension::Dimensionless,
            _ => Dimension::Other(trimmed.to_owned()),
        }
    }
}

impl From<Dimension> for String {
    fn from(dim: Dimension) -> Self {
        dim.to_string()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Dimension::Other(name) = self {
            return write!(f, "{name}");
        }
        let name = DIMENSION_NAMES
            .iter()
            .find(|(dim, _)| dim == self)
            .map(|(_, name)| *name)
            .unwrap_or("");
        write!(f, "{name}")
    }
}

struct UnitDef {
    symbols: &'static [&'static str],
    scale: f64,
    offset: f64,
}

const fn unit(symbols: &'static [&'static str], scale: f64) -> UnitDef {
    UnitDef {
        symbols,
        scale,
        offset: 0.0,
    }
}

const RANKINE: f64 = 5.0 / 9.0;

const TEMPERATURE: &[UnitDef] = &[
    unit(&["K"], 1.0),
    UnitDef {
        symbols: &["C", "°C", "degC"],
        scale: 1.0,
        offset: 273.15,
    },
    UnitDef {
        symbols: &["F", "°F", "degF"],
        scale: RANKINE,
        offset: 459.67 * RANKINE,
    },
    unit(&["R", "°R"], RANKINE),
];

const TEMP_DIFFERENCE: &[UnitDef] = &[
    unit(&["deltaC", "delta C", "dC", "K", "C"], 1.0),
    unit(&["deltaF", "delta F", "dF", "F", "R"], RANKINE),
];

const FLOW_RATE: &[UnitDef] = &[
    unit(&["kg/s"], 1.0),
    unit(&["kg/hr", "kg/h"], 1.0 / 3600.0),
    unit(&["kg/min"], 1.0 / 60.0),
    unit(&["g/s"], 1e-3),
    unit(&["lb/hr", "lbm/hr", "lb/h"], 0.453_592_37 / 3600.0),
    unit(&["lb/s", "lbm/s"], 0.453_592_37),
];

const VOLUMETRIC_FLOW_RATE: &[UnitDef] = &[
    unit(&["m^3/s", "m3/s"], 1.0),
    unit(&["m^3/hr", "m3/hr", "m3/h"], 1.0 / 3600.0),
    unit(&["l/s"], 1e-3),
    unit(&["l/min"], 1e-3 / 60.0),
    unit(&["l/hr", "l/h"], 1e-3 / 3600.0),
    unit(&["cfm", "ft^3/min"], 0.028_316_846_592 / 60.0),
    unit(&["gpm"], 0.003_785_411_784 / 60.0),
];

const POWER: &[UnitDef] = &[
    unit(&["W"], 1.0),
    unit(&["kW"], 1e3),
    unit(&["MW"], 1e6),
    unit(&["kJ/hr", "kJ/h"], 1e3 / 3600.0),
    unit(&["Btu/hr", "Btu/h"], 0.293_071_07),
    unit(&["hp"], 745.699_872),
];

const ENERGY: &[UnitDef] = &[
    unit(&["J"], 1.0),
    unit(&["kJ"], 1e3),
    unit(&["MJ"], 1e6),
    unit(&["GJ"], 1e9),
    unit(&["Wh"], 3600.0),
    unit(&["kWh"], 3.6e6),
    unit(&["Btu"], 1_055.055_85),
];

const PRESSURE: &[UnitDef] = &[
    unit(&["Pa"], 1.0),
    unit(&["kPa"], 1e3),
    unit(&["MPa"], 1e6),
    unit(&["bar"], 1e5),
    unit(&["atm"], 101_325.0),
    unit(&["psi"], 6_894.757_293),
];

const LENGTH: &[UnitDef] = &[
    unit(&["m"], 1.0),
    unit(&["cm"], 1e-2),
    unit(&["mm"], 1e-3),
    unit(&["km"], 1e3),
    unit(&["in"], 0.0254),
    unit(&["ft"], 0.3048),
];

const DENSITY: &[UnitDef] = &[
    unit(&["kg/m^3", "kg/m3"], 1.0),
    unit(&["g/cm^3", "g/cm3"], 1e3),
    unit(&["lb/ft^3", "lbm/ft^3", "lb/ft3"], 16.018_463),
];

const THERMAL_CONDUCTIVITY: &[UnitDef] = &[
    unit(&["W/m.K", "W/m-K", "W/m/K"], 1.0),
    unit(&["kJ/hr.m.K", "kJ/hr-m-K", "kJ/h.m.K", "kJ/hr/m/K"], 1e3 / 3600.0),
    unit(&["Btu/hr.ft.F", "Btu/hr-ft-F"], 1.730_735),
];

const SPECIFIC_HEAT: &[UnitDef] = &[
    unit(&["J/kg.K", "J/kg-K", "J/kg/K"], 1.0),
    unit(&["kJ/kg.K", "kJ/kg-K", "kJ/kg/K"], 1e3),
    unit(&["Btu/lb.F", "Btu/lbm.F", "Btu/lb-F"], 4_186.8),
];

const DYNAMIC_VISCOSITY: &[UnitDef] = &[
    unit(&["Pa.s", "kg/m.s", "N.s/m^2"], 1.0),
    unit(&["kg/m.hr", "kg/m-hr", "kg/m.h"], 1.0 / 3600.0),
    unit(&["cP"], 1e-3),
    unit(&["P"], 0.1),
];

const TIME: &[UnitDef] = &[
    unit(&["s", "sec"], 1.0),
    unit(&["min"], 60.0),
    unit(&["hr", "h"], 3600.0),
    unit(&["day", "d"], 86_400.0),
];

const DIMENSIONLESS: &[UnitDef] = &[
    unit(&["-", "", "fraction"], 1.0),
    unit(&["%", "% (base 100)"], 1e-2),
];

fn table(dim: &Dimension) -> &'static [UnitDef] {
    match dim {
        Dimension::Temperature => TEMPERATURE,
        Dimension::TempDifference => TEMP_DIFFERENCE,
        Dimension::FlowRate => FLOW_RATE,
        Dimension::VolumetricFlowRate => VOLUMETRIC_FLOW_RATE,
        Dimension::Power => POWER,
        Dimension::Energy => ENERGY,
        Dimension::Pressure => PRESSURE,
        Dimension::Length => LENGTH,
        Dimension::Density => DENSITY,
        Dimension::ThermalConductivity => THERMAL_CONDUCTIVITY,
        Dimension::SpecificHeat => SPECIFIC_HEAT,
        Dimension::DynamicViscosity => DYNAMIC_VISCOSITY,
        Dimension::Time => TIME,
        Dimension::Dimensionless => DIMENSIONLESS,
        Dimension::Any | Dimension::Other(_) => &[],
    }
}

fn normalize(symbol: &str) -> String {
    symbol.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn same_symbol(a: &str, b: &str) -> bool {
    normalize(a).eq_ignore_ascii_case(&normalize(b))
}

fn lookup(dim: &Dimension, symbol: &str) -> Option<&'static UnitDef> {
    table(dim)
        .iter()
        .find(|def| def.symbols.iter().any(|s| same_symbol(s, symbol)))
}

/// The dimension a unit symbol belongs to, checked in table order.
pub fn dimension_of(symbol: &str) -> Option<Dimension> {
    DIMENSION_NAMES
        .iter()
        .map(|(dim, _)| dim)
        .find(|dim| lookup(dim, symbol).is_some())
        .cloned()
}

/// Whether `symbol` is a unit this table can convert within `dim`.
pub fn is_known(dim: &Dimension, symbol: &str) -> bool {
    lookup(dim, symbol).is_some()
}

/// Converts `value` from unit `from` to unit `to`, both of dimension `dim`.
pub fn convert(value: f64, dim: &Dimension, from: &str, to: &str) -> Result<f64> {
    if same_symbol(from, to) || *dim == Dimension::Any {
        return Ok(value);
    }

    let to_def = lookup(dim, to);
    let from_def = lookup(dim, from);
    match (from_def, to_def) {
        (Some(from_def), Some(to_def)) => {
            let base = value * from_def.scale + from_def.offset;
            Ok((base - to_def.offset) / to_def.scale)
        }
        (None, _) => {
            let details = match dimension_of(from) {
                Some(other) => format!("'{from}' is a {other} unit, expected {dim} ('{to}')"),
                None => format!("unknown unit '{from}', expected {dim} ('{to}')"),
            };
            var_err!(DimensionMismatch, details)
        }
        (Some(_), None) => var_err!(
            DimensionMismatch,
            format!("no conversion from '{from}' to declared unit '{to}' ({dim})")
        ),
    }
}
