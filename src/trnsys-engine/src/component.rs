// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::common::{Error, ErrorCode, ErrorKind, Result, TypeNumber, UnitNumber, standardize_name};
use crate::connection::Connection;
use crate::cycle;
use crate::datamodel::{ExternalFileDecl, Proforma, Role, VariableDef};
use crate::variable::{VarRef, Variable, VariableCollection};
use crate::var_err;

/// An external file declared by the proforma and the path currently
/// bound to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalFile {
    decl: ExternalFileDecl,
    path: String,
}

impl ExternalFile {
    fn new(decl: ExternalFileDecl) -> Self {
        let path = decl.answer.clone();
        ExternalFile { decl, path }
    }

    pub fn question(&self) -> &str {
        &self.decl.question
    }

    pub fn logical_unit(&self) -> u32 {
        self.decl.logical_unit
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn designate(&self) -> bool {
        self.decl.designate
    }
}

/// One placement of a proforma in a deck.
#[derive(Clone, Debug)]
pub struct Component {
    unit: UnitNumber,
    name: String,
    proforma: Rc<Proforma>,
    rows: BTreeMap<Role, Vec<Rc<VariableDef>>>,
    parameters: VariableCollection,
    inputs: VariableCollection,
    outputs: VariableCollection,
    derivatives: VariableCollection,
    external_files: Vec<ExternalFile>,
    connections: Vec<Connection>,
}

impl Component {
    pub fn new(unit: UnitNumber, name: &str, proforma: Rc<Proforma>) -> Result<Component> {
        proforma.validate()?;

        let rows: BTreeMap<Role, Vec<Rc<VariableDef>>> = Role::ALL
            .iter()
            .map(|&role| {
                let defs = proforma
                    .definitions(role)
                    .into_iter()
                    .map(|d| Rc::new(d.clone()))
                    .collect();
                (role, defs)
            })
            .collect();

        // driving parameters are never cycled, so their defaults are
        // available before the parameter collection exists
        let parameters = cycle::expand(&proforma, Role::Parameter, &rows[&Role::Parameter], |n| {
            rows[&Role::Parameter]
                .iter()
                .find(|d| d.base_name() == n)
                .map(|d| d.default)
        })?;
        let count = |n: &str| parameters.get_by_name(n).map(|v| v.value());
        let inputs = cycle::expand(&proforma, Role::Input, &rows[&Role::Input], count)?;
        let outputs = cycle::expand(&proforma, Role::Output, &rows[&Role::Output], count)?;
        let derivatives =
            cycle::expand(&proforma, Role::Derivative, &rows[&Role::Derivative], count)?;

        let external_files = proforma
            .external_files
            .iter()
            .cloned()
            .map(ExternalFile::new)
            .collect();

        Ok(Component {
            unit,
            name: name.to_owned(),
            proforma,
            rows,
            parameters,
            inputs,
            outputs,
            derivatives,
            external_files,
            connections: vec![],
        })
    }

    /// Creates a component and applies `overrides` to its parameters in
    /// order, re-expanding cycles as driving parameters change.
    pub fn with_parameters(
        unit: UnitNumber,
        name: &str,
        proforma: Rc<Proforma>,
        overrides: &[(&str, f64)],
    ) -> Result<Component> {
        let mut component = Component::new(unit, name, proforma)?;
        for &(param, value) in overrides {
            component.set_parameter(param, value, None)?;
        }
        Ok(component)
    }

    pub fn unit_number(&self) -> UnitNumber {
        self.unit
    }

    pub(crate) fn set_unit_number(&mut self, unit: UnitNumber) {
        self.unit = unit;
        for conn in self.connections.iter_mut() {
            conn.source_unit = unit;
        }
    }

    pub fn type_number(&self) -> TypeNumber {
        self.proforma.type_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn proforma(&self) -> &Proforma {
        &self.proforma
    }

    pub fn collection(&self, role: Role) -> &VariableCollection {
        match role {
            Role::Parameter => &self.parameters,
            Role::Input => &self.inputs,
            Role::Output => &self.outputs,
            Role::Derivative => &self.derivatives,
        }
    }

    fn collection_mut(&mut self, role: Role) -> &mut VariableCollection {
        match role {
            Role::Parameter => &mut self.parameters,
            Role::Input => &mut self.inputs,
            Role::Output => &mut self.outputs,
            Role::Derivative => &mut self.derivatives,
        }
    }

    pub fn parameters(&self) -> &VariableCollection {
        &self.parameters
    }

    pub fn inputs(&self) -> &VariableCollection {
        &self.inputs
    }

    pub fn outputs(&self) -> &VariableCollection {
        &self.outputs
    }

    pub fn derivatives(&self) -> &VariableCollection {
        &self.derivatives
    }

    pub fn variable(&self, role: Role, var: impl Into<VarRef>) -> Result<&Variable> {
        self.collection(role).lookup(&var.into())
    }

    /// Assigns a value to any variable.  Parameter assignments go
    /// through [`Component::set_parameter`] so dependent cycles follow.
    pub fn set_value(
        &mut self,
        role: Role,
        var: impl Into<VarRef>,
        magnitude: f64,
        unit: Option<&str>,
    ) -> Result<()> {
        if role == Role::Parameter {
            return self.set_parameter(var, magnitude, unit);
        }
        self.collection_mut(role)
            .lookup_mut(&var.into())?
            .set(magnitude, unit)
    }

    /// Assigns a parameter, dropping any equation it was bound to.  When
    /// the parameter drives cycles, every dependent collection is
    /// re-expanded; if any expansion fails the component is left exactly
    /// as it was.
    pub fn set_parameter(
        &mut self,
        var: impl Into<VarRef>,
        magnitude: f64,
        unit: Option<&str>,
    ) -> Result<()> {
        let idx = self.parameters.resolve(&var.into())?;
        let mut candidate = self.parameters.lookup(&VarRef::Index(idx))?.clone();
        candidate.set(magnitude, unit)?;
        candidate.set_equation(None);

        let name = candidate.name().to_owned();
        let value = candidate.value();
        let count = |n: &str| {
            if n == name {
                Some(value)
            } else {
                self.parameters.get_by_name(n).map(|v| v.value())
            }
        };

        let mut fresh = BTreeMap::new();
        for role in self.proforma.roles_driven_by(&name) {
            let coll = cycle::expand(&self.proforma, role, &self.rows[&role], count)
                .map_err(|mut err| {
                    err.details = err.details.map(|d| format!("{}: {d}", self.name));
                    err
                })?;
            fresh.insert(role, coll);
        }

        *self.parameters.lookup_mut(&VarRef::Index(idx))? = candidate;
        for (role, coll) in fresh {
            self.collection_mut(role).reconcile(coll);
        }

        Ok(())
    }

    /// Binds an input or a parameter to a deck equation, or clears the
    /// binding with `None`.  Returns the variable's position.  A parameter
    /// that drives a cycle needs a literal count and cannot be bound.
    pub(crate) fn bind_equation(
        &mut self,
        role: Role,
        var: impl Into<VarRef>,
        equation: Option<&str>,
    ) -> Result<usize> {
        let idx = self.collection(role).resolve(&var.into())?;
        let name = self.collection(role).lookup(&VarRef::Index(idx))?.name().to_owned();
        match role {
            Role::Input => {}
            Role::Parameter if !self.proforma.driving_parameters().contains(&name) => {}
            Role::Parameter => {
                return var_err!(
                    TypeMismatch,
                    format!("{}: {name} drives a cycle and needs a number", self.name)
                );
            }
            _ => {
                return var_err!(
                    TypeMismatch,
                    format!("{}: only inputs and parameters take equations, not {role} {name}", self.name)
                );
            }
        }
        self.collection_mut(role)
            .lookup_mut(&VarRef::Index(idx))?
            .set_equation(equation.map(|e| e.to_owned()));
        Ok(idx)
    }

    /// Recomputes every collection from the current parameter values.
    pub fn reexpand(&mut self) -> Result<()> {
        let mut fresh = BTreeMap::new();
        for role in Role::ALL {
            let count = |n: &str| self.parameters.get_by_name(n).map(|v| v.value());
            let coll = cycle::expand(&self.proforma, role, &self.rows[&role], count)?;
            fresh.insert(role, coll);
        }
        for (role, coll) in fresh {
            self.collection_mut(role).reconcile(coll);
        }
        Ok(())
    }

    pub fn external_files(&self) -> &[ExternalFile] {
        &self.external_files
    }

    fn external_file_position(&self, key: &VarRef) -> Result<usize> {
        let found = match key {
            VarRef::Index(idx) => (*idx < self.external_files.len()).then_some(*idx),
            VarRef::Name(question) => {
                let question = standardize_name(question);
                self.external_files
                    .iter()
                    .position(|f| standardize_name(f.question()) == question)
            }
        };
        found.ok_or_else(|| {
            Error::new(
                ErrorKind::Variable,
                ErrorCode::UnknownExternalFile,
                Some(format!("{}: no external file {key}", self.name)),
            )
        })
    }

    /// Looks up an external file by position or by its question.
    pub fn external_file(&self, key: impl Into<VarRef>) -> Result<&ExternalFile> {
        let idx = self.external_file_position(&key.into())?;
        Ok(&self.external_files[idx])
    }

    pub fn set_external_file_path(&mut self, key: impl Into<VarRef>, path: &str) -> Result<()> {
        let idx = self.external_file_position(&key.into())?;
        self.external_files[idx].path = path.to_owned();
        Ok(())
    }

    /// Connections leaving this component.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub(crate) fn connections_mut(&mut self) -> &mut Vec<Connection> {
        &mut self.connections
    }
}
