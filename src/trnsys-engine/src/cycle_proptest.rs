// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for cycle re-expansion.
//!
//! These tests verify that:
//! 1. Resizing a cycle keeps the values of instances that survive
//! 2. New instances start from their schema default
//! 3. Nested cycles produce one instance per combination of indices
//! 4. Rejected counts leave the component untouched

use std::rc::Rc;

use proptest::prelude::*;

use crate::common::ErrorCode;
use crate::component::Component;
use crate::datamodel::Role;
use crate::testutils::{pipe_network, tank};
use crate::variable::instance_name;

fn level(i: usize) -> String {
    instance_name("Level", &[i])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn resizing_keeps_surviving_instances(
        n1 in 2usize..=20,
        n2 in 2usize..=20,
        base in -100.0f64..100.0,
    ) {
        let mut component = tank(1);
        component.set_parameter("Count", n1 as f64, None).unwrap();
        for i in 1..=n1 {
            component
                .set_value(Role::Output, level(i), base + i as f64, None)
                .unwrap();
        }

        component.set_parameter("Count", n2 as f64, None).unwrap();

        prop_assert_eq!(n2 + 2, component.outputs().len());
        for i in 1..=n2 {
            let var = component.variable(Role::Output, level(i)).unwrap();
            if i <= n1 {
                prop_assert!(var.is_set());
                prop_assert_eq!(base + i as f64, var.value());
            } else {
                prop_assert!(!var.is_set());
                prop_assert_eq!(0.0, var.value());
            }
        }
        prop_assert_eq!("Heat_loss", component.outputs().get(n2 + 1).unwrap().name());
    }

    #[test]
    fn same_count_is_idempotent(n in 2usize..=20) {
        let mut component = tank(1);
        component.set_parameter("Count", n as f64, None).unwrap();
        let before = component.outputs().clone();
        component.set_parameter("Count", n as f64, None).unwrap();
        prop_assert_eq!(&before, component.outputs());
    }

    #[test]
    fn nested_cycles_cover_every_index_pair(pipes in 1usize..=10, nodes in 0usize..=5) {
        let component = Component::with_parameters(
            1,
            "Network",
            Rc::new(pipe_network()),
            &[("Number of pipes", pipes as f64), ("Nodes per pipe", nodes as f64)],
        )
        .unwrap();

        prop_assert_eq!(2 + pipes, component.parameters().len());
        prop_assert_eq!(2 + pipes * (1 + nodes), component.outputs().len());
        for p in 1..=pipes {
            let flow = instance_name("Pipe_flow", &[p]);
            prop_assert!(component.outputs().get_by_name(&flow).is_some());
            for n in 1..=nodes {
                let node = instance_name("Node_temperature", &[p, n]);
                prop_assert!(component.outputs().get_by_name(&node).is_some());
            }
        }
    }

    #[test]
    fn rejected_count_leaves_component_unchanged(n in 21u32..1000) {
        let mut component = tank(1);
        let before = component.outputs().clone();
        let err = component.set_parameter("Count", n as f64, None).unwrap_err();
        prop_assert_eq!(ErrorCode::OutOfBounds, err.code);
        prop_assert_eq!(5.0, component.parameters().get_by_name("Count").unwrap().value());
        prop_assert_eq!(&before, component.outputs());
    }
}
