// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Output-to-input wiring between components.
//!
//! Connections store 0-based positions plus the names found at those
//! positions when the connection was made.  Later cycle re-expansions
//! never rewrite them; instead [`Connection::validate`] reports any
//! endpoint that disappeared or now holds a different variable.

use std::fmt;

use crate::common::{Result, UnitNumber};
use crate::component::Component;
use crate::conn_err;
use crate::variable::{VarRef, VariableCollection};

/// A directed edge from one output of `source_unit` to one input of
/// `target_unit`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source_unit: UnitNumber,
    pub source_output: usize,
    pub source_name: String,
    pub target_unit: UnitNumber,
    pub target_input: usize,
    pub target_name: String,
}

impl Connection {
    /// Checks that both endpoints still exist and still hold the
    /// variables they held when connected.
    pub fn validate(&self, source: &Component, target: &Component) -> Result<()> {
        check_endpoint(
            self,
            source,
            "output",
            source.outputs(),
            self.source_output,
            &self.source_name,
        )?;
        check_endpoint(
            self,
            target,
            "input",
            target.inputs(),
            self.target_input,
            &self.target_name,
        )
    }
}

fn check_endpoint(
    conn: &Connection,
    component: &Component,
    what: &str,
    coll: &VariableCollection,
    idx: usize,
    expected: &str,
) -> Result<()> {
    match coll.get(idx) {
        Some(var) if var.name() == expected => Ok(()),
        Some(var) => conn_err!(
            DanglingConnection,
            format!(
                "{conn}: {} {what} #{idx} is now '{}', expected '{expected}'",
                component.name(),
                var.name()
            )
        ),
        None => conn_err!(
            DanglingConnection,
            format!(
                "{conn}: {} {what} '{expected}' (#{idx}) no longer exists",
                component.name()
            )
        ),
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}]{} -> [{}]{}",
            self.source_unit, self.source_name, self.target_unit, self.target_name
        )
    }
}

/// Resolves `mapping` (output endpoint, input endpoint) against the
/// current collections of `source` and `target`.  Either every pair
/// resolves or nothing is returned.
pub fn resolve(
    source: &Component,
    target: &Component,
    mapping: &[(VarRef, VarRef)],
) -> Result<Vec<Connection>> {
    mapping
        .iter()
        .map(|(output, input)| {
            let source_output = source.outputs().resolve(output).map_err(|mut err| {
                err.details = err.details.map(|d| format!("{}: {d}", source.name()));
                err
            })?;
            let target_input = target.inputs().resolve(input).map_err(|mut err| {
                err.details = err.details.map(|d| format!("{}: {d}", target.name()));
                err
            })?;
            Ok(Connection {
                source_unit: source.unit_number(),
                source_output,
                source_name: source.outputs().names()[source_output].to_owned(),
                target_unit: target.unit_number(),
                target_input,
                target_name: target.inputs().names()[target_input].to_owned(),
            })
        })
        .collect()
}

/// Builds a mapping from (output, input) pairs of anything that
/// converts into an endpoint, e.g. `mapping([(0, "Inlet temperature")])`.
pub fn mapping<O, I, M>(pairs: M) -> Vec<(VarRef, VarRef)>
where
    O: Into<VarRef>,
    I: Into<VarRef>,
    M: IntoIterator<Item = (O, I)>,
{
    pairs
        .into_iter()
        .map(|(o, i)| (o.into(), i.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::testutils::tank;

    #[test]
    fn test_name_and_index_mappings_agree() {
        let a = tank(1);
        let b = tank(2);
        let by_index = resolve(&a, &b, &mapping([(0usize, 1usize)])).unwrap();
        let by_name = resolve(&a, &b, &mapping([("Outlet temperature", "Inlet_flowrate")])).unwrap();
        assert_eq!(by_index, by_name);
        assert_eq!(1, by_index[0].source_unit);
        assert_eq!(2, by_index[0].target_unit);
        assert_eq!("Inlet_flowrate", by_index[0].target_name);
    }

    #[test]
    fn test_resolve_is_all_or_nothing() {
        let a = tank(1);
        let b = tank(2);
        let pairs = vec![
            (VarRef::Index(0), VarRef::Index(0)),
            (VarRef::Name("Bogus".to_owned()), VarRef::Index(1)),
        ];
        let err = resolve(&a, &b, &pairs).unwrap_err();
        assert_eq!(ErrorCode::UnknownVariable, err.code);
        assert!(err.get_details().unwrap().starts_with("Tank:"));

        let err = resolve(&a, &b, &mapping([(0usize, 7usize)])).unwrap_err();
        assert_eq!(ErrorCode::UnknownVariable, err.code);
    }

    #[test]
    fn test_validate_detects_shrunk_cycle() {
        let mut a = tank(1);
        let b = tank(2);
        a.set_parameter("Count", 8.0, None).unwrap();
        let conns = resolve(&a, &b, &mapping([("Level_8", "Inlet temperature")])).unwrap();
        conns[0].validate(&a, &b).unwrap();

        a.set_parameter("Count", 3.0, None).unwrap();
        let err = conns[0].validate(&a, &b).unwrap_err();
        assert_eq!(ErrorCode::DanglingConnection, err.code);
        assert!(err.get_details().unwrap().contains("Level_8"));
    }

    #[test]
    fn test_validate_detects_moved_variable() {
        let mut a = tank(1);
        let b = tank(2);
        // Heat_loss sits right after the Level block
        let conns = resolve(&a, &b, &mapping([("Heat loss", 0usize)])).unwrap();
        assert_eq!(6, conns[0].source_output);

        a.set_parameter("Count", 6.0, None).unwrap();
        let err = conns[0].validate(&a, &b).unwrap_err();
        assert_eq!(ErrorCode::DanglingConnection, err.code);
        assert!(err.get_details().unwrap().contains("Level_6"));
    }
}
