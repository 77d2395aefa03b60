// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use float_cmp::approx_eq;

use crate::common::Result;
use crate::datamodel::{Boundaries, ScalarKind, VariableDef};
use crate::units::{self, Dimension};
use crate::var_err;
use crate::writer::format_number;

/// A `[min, max]` range with per-end openness.  Infinite ends are
/// always open.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub boundaries: Boundaries,
}

impl Bounds {
    pub fn unbounded() -> Self {
        Bounds {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            boundaries: Boundaries::default(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let above_min = if self.min == f64::NEG_INFINITY || !self.boundaries.min_inclusive {
            value > self.min
        } else {
            value >= self.min
        };
        let below_max = if self.max == f64::INFINITY || !self.boundaries.max_inclusive {
            value < self.max
        } else {
            value <= self.max
        };
        above_min && below_max
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn limit(v: f64) -> String {
            if v == f64::INFINITY {
                "+INF".to_owned()
            } else if v == f64::NEG_INFINITY {
                "-INF".to_owned()
            } else {
                format_number(v)
            }
        }
        let open = if self.boundaries.min_inclusive && self.min.is_finite() {
            '['
        } else {
            ']'
        };
        let close = if self.boundaries.max_inclusive && self.max.is_finite() {
            ']'
        } else {
            '['
        };
        write!(f, "{open}{}; {}{close}", limit(self.min), limit(self.max))
    }
}

/// A magnitude expressed in its variable's declared unit, already
/// checked against the declared type and bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantity {
    magnitude: f64,
    unit: String,
    dimension: Dimension,
    kind: ScalarKind,
    bounds: Bounds,
}

impl Quantity {
    /// Builds a quantity for `def`.  `unit` is the unit `magnitude` is
    /// expressed in; `None` means the declared unit.
    pub fn new(def: &VariableDef, magnitude: f64, unit: Option<&str>) -> Result<Quantity> {
        let converted = match unit {
            Some(unit) => units::convert(magnitude, &def.dimension, unit, &def.unit).map_err(
                |mut err| {
                    err.details = err.details.map(|d| format!("{}: {}", def.name, d));
                    err
                },
            )?,
            None => magnitude,
        };

        let converted = match def.kind {
            ScalarKind::Real => converted,
            ScalarKind::Integer => {
                let rounded = converted.round();
                if !converted.is_finite() || !approx_eq!(f64, converted, rounded, epsilon = 1e-9) {
                    return var_err!(
                        TypeMismatch,
                        format!("{} is an integer, got {}", def.name, converted)
                    );
                }
                rounded
            }
        };

        let bounds = def.bounds();
        if !bounds.contains(converted) {
            return var_err!(
                OutOfBounds,
                format!(
                    "{} = {} {} is outside {}",
                    def.name, converted, def.unit, bounds
                )
            );
        }

        Ok(Quantity {
            magnitude: converted,
            unit: def.unit.clone(),
            dimension: def.dimension.clone(),
            kind: def.kind,
            bounds,
        })
    }

    /// The schema default, taken as-is.
    pub fn default_for(def: &VariableDef) -> Quantity {
        Quantity {
            magnitude: def.default,
            unit: def.unit.clone(),
            dimension: def.dimension.clone(),
            kind: def.kind,
            bounds: def.bounds(),
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The magnitude expressed in another unit of the same dimension.
    pub fn to_unit(&self, unit: &str) -> Result<f64> {
        units::convert(self.magnitude, &self.dimension, &self.unit, unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.unit.is_empty() || self.unit == "-" {
            write!(f, "{}", format_number(self.magnitude))
        } else {
            write!(f, "{} {}", format_number(self.magnitude), self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::datamodel::Role;
    use crate::testutils::storage_tank;

    fn def(proforma: &crate::datamodel::Proforma, role: Role, name: &str) -> VariableDef {
        proforma
            .definitions(role)
            .into_iter()
            .find(|d| d.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_bounds_openness() {
        let closed = Bounds {
            min: 0.0,
            max: 1.0,
            boundaries: Boundaries::default(),
        };
        assert!(closed.contains(0.0));
        assert!(closed.contains(1.0));
        assert!(!closed.contains(1.0000001));

        let open = Bounds {
            min: 0.0,
            max: 1.0,
            boundaries: "];[".parse().unwrap(),
        };
        assert!(!open.contains(0.0));
        assert!(!open.contains(1.0));
        assert!(open.contains(0.5));

        let unbounded = Bounds::unbounded();
        assert!(unbounded.contains(-1e300));
        assert!(!unbounded.contains(f64::INFINITY));
        assert!(!unbounded.contains(f64::NAN));
    }

    #[test]
    fn test_bounds_display() {
        let b = Bounds {
            min: 0.0,
            max: f64::INFINITY,
            boundaries: Boundaries::default(),
        };
        assert_eq!("[0; +INF[", b.to_string());
        assert_eq!("]-INF; +INF[", Bounds::unbounded().to_string());
    }

    #[test]
    fn test_negative_diameter_rejected() {
        let proforma = storage_tank();
        let diameter = def(&proforma, Role::Parameter, "Diameter");
        let err = Quantity::new(&diameter, -5.0, None).unwrap_err();
        assert_eq!(ErrorCode::OutOfBounds, err.code);
        assert!(err.get_details().unwrap().contains("Diameter"));

        let q = Quantity::new(&diameter, 0.0, None).unwrap();
        assert_eq!(0.0, q.magnitude());
    }

    #[test]
    fn test_conversion_into_declared_unit() {
        let proforma = storage_tank();
        let diameter = def(&proforma, Role::Parameter, "Diameter");
        let q = Quantity::new(&diameter, 300.0, Some("mm")).unwrap();
        assert!(approx_eq!(f64, 0.3, q.magnitude(), epsilon = 1e-12));
        assert_eq!("m", q.unit());
        assert!(approx_eq!(f64, 30.0, q.to_unit("cm").unwrap(), epsilon = 1e-9));

        let err = Quantity::new(&diameter, 1.0, Some("kg/hr")).unwrap_err();
        assert_eq!(ErrorCode::DimensionMismatch, err.code);
    }

    #[test]
    fn test_integer_coercion() {
        let proforma = storage_tank();
        let count = def(&proforma, Role::Parameter, "Count");
        let q = Quantity::new(&count, 8.0, None).unwrap();
        assert_eq!(ScalarKind::Integer, q.kind());
        assert_eq!("8", q.to_string());

        let err = Quantity::new(&count, 3.5, None).unwrap_err();
        assert_eq!(ErrorCode::TypeMismatch, err.code);

        let err = Quantity::new(&count, 21.0, None).unwrap_err();
        assert_eq!(ErrorCode::OutOfBounds, err.code);
    }

    #[test]
    fn test_temperature_input_in_fahrenheit() {
        let proforma = storage_tank();
        let inlet = def(&proforma, Role::Input, "Inlet temperature");
        let q = Quantity::new(&inlet, 212.0, Some("F")).unwrap();
        assert!(approx_eq!(f64, 100.0, q.magnitude(), epsilon = 1e-9));
        assert_eq!("C", q.unit());

        let q = Quantity::new(&inlet, 55.5, None).unwrap();
        assert_eq!("55.5 C", q.to_string());
    }
}
