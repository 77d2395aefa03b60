// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::common::{Result, standardize_name};
use crate::datamodel::{Role, VariableDef};
use crate::quantity::Quantity;
use crate::{schema_err, var_err};

/// Addresses a variable inside one collection, either by 0-based
/// position or by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarRef {
    Index(usize),
    Name(String),
}

impl From<usize> for VarRef {
    fn from(idx: usize) -> Self {
        VarRef::Index(idx)
    }
}

impl From<&str> for VarRef {
    fn from(name: &str) -> Self {
        VarRef::Name(name.to_owned())
    }
}

impl From<String> for VarRef {
    fn from(name: String) -> Self {
        VarRef::Name(name)
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VarRef::Index(idx) => write!(f, "#{idx}"),
            VarRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// `base` followed by one `_<i>` per enclosing cycle, outer first.
pub fn instance_name(base: &str, indices: &[usize]) -> String {
    let mut name = base.to_owned();
    for idx in indices {
        name.push('_');
        name.push_str(&idx.to_string());
    }
    name
}

/// One live occurrence of a variable definition inside a component.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    def: Rc<VariableDef>,
    name: String,
    indices: Vec<usize>,
    quantity: Option<Quantity>,
    /// Deck equation supplying this variable instead of a literal.
    equation: Option<String>,
}

impl Variable {
    pub(crate) fn new(def: Rc<VariableDef>, indices: Vec<usize>) -> Self {
        let name = instance_name(&def.base_name(), &indices);
        Variable {
            def,
            name,
            indices,
            quantity: None,
            equation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> String {
        self.def.base_name()
    }

    /// 1-based repetition indices, outer cycle first; empty outside
    /// any cycle.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn def(&self) -> &VariableDef {
        &self.def
    }

    pub fn role(&self) -> Role {
        self.def.role
    }

    pub fn unit(&self) -> &str {
        &self.def.unit
    }

    pub fn quantity(&self) -> Option<&Quantity> {
        self.quantity.as_ref()
    }

    /// Current magnitude in the declared unit; the schema default when
    /// nothing has been assigned.
    pub fn value(&self) -> f64 {
        match self.quantity {
            Some(ref q) => q.magnitude(),
            None => self.def.default,
        }
    }

    pub fn is_set(&self) -> bool {
        self.quantity.is_some()
    }

    /// Name of the deck equation bound to this variable, if any.
    pub fn equation(&self) -> Option<&str> {
        self.equation.as_deref()
    }

    /// Validates and stores a new value.  On error the previous value is
    /// kept.
    pub(crate) fn set(&mut self, magnitude: f64, unit: Option<&str>) -> Result<()> {
        let quantity = Quantity::new(&self.def, magnitude, unit).map_err(|mut err| {
            if self.name != self.def.base_name() {
                err.details = err.details.map(|d| format!("{} ({d})", self.name));
            }
            err
        })?;
        self.quantity = Some(quantity);
        Ok(())
    }

    pub(crate) fn set_quantity(&mut self, quantity: Option<Quantity>) {
        self.quantity = quantity;
    }

    pub(crate) fn set_equation(&mut self, equation: Option<String>) {
        self.equation = equation;
    }
}

/// Ordered variables of a single role, addressable by position and by
/// name.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableCollection {
    role: Role,
    vars: Vec<Variable>,
    by_name: HashMap<String, usize>,
}

impl VariableCollection {
    pub(crate) fn new(role: Role) -> Self {
        VariableCollection {
            role,
            vars: vec![],
            by_name: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, var: Variable) -> Result<()> {
        if var.role() != self.role {
            return schema_err!(
                BadCycleDefinition,
                format!("{} is a {}, not a {}", var.name, var.role(), self.role)
            );
        }
        if self.by_name.contains_key(&var.name) {
            return schema_err!(
                DuplicateVariable,
                format!("more than one {} named {}", self.role, var.name)
            );
        }
        self.by_name.insert(var.name.clone(), self.vars.len());
        self.vars.push(var);
        Ok(())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.vars.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Variable> {
        self.vars.get(idx)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Variable> {
        self.position(name).map(|idx| &self.vars[idx])
    }

    /// Position of `name`; the query is standardized first, so display
    /// labels and identifiers both resolve.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(&standardize_name(name)))
            .copied()
    }

    pub fn names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name()).collect()
    }

    /// The 0-based position `var` refers to right now.
    pub fn resolve(&self, var: &VarRef) -> Result<usize> {
        match var {
            VarRef::Index(idx) if *idx < self.vars.len() => Ok(*idx),
            VarRef::Index(idx) => var_err!(
                UnknownVariable,
                format!("{} #{idx} out of range ({} defined)", self.role, self.vars.len())
            ),
            VarRef::Name(name) => match self.position(name) {
                Some(idx) => Ok(idx),
                None => var_err!(UnknownVariable, format!("no {} named '{name}'", self.role)),
            },
        }
    }

    pub fn lookup(&self, var: &VarRef) -> Result<&Variable> {
        let idx = self.resolve(var)?;
        Ok(&self.vars[idx])
    }

    pub(crate) fn lookup_mut(&mut self, var: &VarRef) -> Result<&mut Variable> {
        let idx = self.resolve(var)?;
        Ok(&mut self.vars[idx])
    }

    /// Replaces this collection with `fresh`, carrying each surviving
    /// variable's value forward by name.
    pub(crate) fn reconcile(&mut self, mut fresh: VariableCollection) {
        for var in fresh.vars.iter_mut() {
            if let Some(&idx) = self.by_name.get(&var.name) {
                var.set_quantity(self.vars[idx].quantity.clone());
                var.set_equation(self.vars[idx].equation.clone());
            }
        }
        *self = fresh;
    }
}

impl<'a> IntoIterator for &'a VariableCollection {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}
