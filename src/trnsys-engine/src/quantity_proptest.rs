// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for quantities and unit conversion.

use float_cmp::approx_eq;
use proptest::prelude::*;

use crate::common::ErrorCode;
use crate::datamodel::{Role, VariableDef};
use crate::quantity::Quantity;
use crate::testutils::storage_tank;

fn def(role: Role, name: &str) -> VariableDef {
    storage_tank()
        .definitions(role)
        .into_iter()
        .find(|d| d.name == name)
        .unwrap()
        .clone()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn in_bounds_lengths_convert_back(metres in 0.0f64..1000.0) {
        let diameter = def(Role::Parameter, "Diameter");
        let q = Quantity::new(&diameter, metres * 1000.0, Some("mm")).unwrap();
        prop_assert_eq!("m", q.unit());
        prop_assert!(approx_eq!(f64, metres, q.magnitude(), epsilon = 1e-9));
        let mm = q.to_unit("mm").unwrap();
        prop_assert!(approx_eq!(f64, metres * 1000.0, mm, epsilon = 1e-6));
    }

    #[test]
    fn temperatures_convert_back(fahrenheit in -400.0f64..2000.0) {
        let inlet = def(Role::Input, "Inlet temperature");
        let q = Quantity::new(&inlet, fahrenheit, Some("F")).unwrap();
        prop_assert_eq!("C", q.unit());
        let back = q.to_unit("F").unwrap();
        prop_assert!(approx_eq!(f64, fahrenheit, back, epsilon = 1e-9));
    }

    #[test]
    fn negative_lengths_rejected(metres in -1000.0f64..-1e-6) {
        let diameter = def(Role::Parameter, "Diameter");
        let err = Quantity::new(&diameter, metres, None).unwrap_err();
        prop_assert_eq!(ErrorCode::OutOfBounds, err.code);
    }

    #[test]
    fn integers_must_be_whole(n in 2i32..20, frac in 0.01f64..0.99) {
        let count = def(Role::Parameter, "Count");
        let q = Quantity::new(&count, n as f64, None).unwrap();
        prop_assert_eq!(n as f64, q.magnitude());
        let err = Quantity::new(&count, n as f64 + frac, None).unwrap_err();
        prop_assert_eq!(ErrorCode::TypeMismatch, err.code);
    }

    #[test]
    fn bounds_agree_with_construction(value in -50.0f64..50.0) {
        let count = def(Role::Parameter, "Count");
        let bounds = count.bounds();
        let whole = value.round();
        prop_assert_eq!(bounds.contains(whole), Quantity::new(&count, whole, None).is_ok());
    }
}
