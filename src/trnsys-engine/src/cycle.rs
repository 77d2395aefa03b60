// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Cycle expansion: turns a role's schema rows plus the current values
//! of the driving parameters into the ordered list of live variables.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use crate::common::{Result, standardize_name};
use crate::datamodel::{CycleDef, Proforma, Role, VariableDef};
use crate::variable::{Variable, VariableCollection};
use crate::{schema_err, var_err};

/// Builds a fresh collection for `role`.  `rows` are the role's
/// definitions in schema order and `count` reports the current value of
/// a (standardized) parameter name.
pub(crate) fn expand<F>(
    proforma: &Proforma,
    role: Role,
    rows: &[Rc<VariableDef>],
    count: F,
) -> Result<VariableCollection>
where
    F: Fn(&str) -> Option<f64>,
{
    let mut out = VariableCollection::new(role);
    let cycles = proforma.cycles_for(role);
    expand_rows(rows, &cycles, &[], &count, &mut out)?;
    if !cycles.is_empty() {
        debug!(object = %proforma.object, %role, len = out.len(), "expanded cycles");
    }
    Ok(out)
}

fn expand_rows<F>(
    rows: &[Rc<VariableDef>],
    cycles: &[&CycleDef],
    prefix: &[usize],
    count: &F,
    out: &mut VariableCollection,
) -> Result<()>
where
    F: Fn(&str) -> Option<f64>,
{
    let mut cycles = cycles.to_vec();
    cycles.sort_by_key(|c| c.first_row);

    let mut pos = 0;
    for cycle in cycles {
        for def in &rows[pos..cycle.first_row - 1] {
            out.push(Variable::new(def.clone(), prefix.to_vec()))?;
        }

        let block = &rows[cycle.first_row - 1..cycle.last_row];
        let children: Vec<&CycleDef> = cycle.cycles.iter().collect();
        for rep in 1..=repetitions(cycle, count)? {
            let mut indices = prefix.to_vec();
            indices.push(rep);
            expand_rows(block, &children, &indices, count, out)?;
        }

        pos = cycle.last_row;
    }
    for def in &rows[pos..] {
        out.push(Variable::new(def.clone(), prefix.to_vec()))?;
    }

    Ok(())
}

fn repetitions<F>(cycle: &CycleDef, count: &F) -> Result<usize>
where
    F: Fn(&str) -> Option<f64>,
{
    let param = standardize_name(&cycle.param_name);
    let Some(value) = count(&param) else {
        return schema_err!(
            BadCycleDefinition,
            format!("cycle driven by unknown parameter '{}'", cycle.param_name)
        );
    };

    if !value.is_finite() || value.fract() != 0.0 {
        return var_err!(
            TypeMismatch,
            format!("{param} = {value} cannot be used as a repetition count")
        );
    }
    if value < cycle.min_size as f64 || value > cycle.max_size as f64 {
        return var_err!(
            CycleBoundsExceeded,
            format!(
                "{param} = {value} outside [{}, {}] for {} rows {}..{}",
                cycle.min_size, cycle.max_size, cycle.role, cycle.first_row, cycle.last_row
            )
        );
    }

    Ok(value as usize)
}

/// Checks row ranges and driving parameters of every cycle in `proforma`.
pub(crate) fn validate(proforma: &Proforma) -> Result<()> {
    for role in Role::ALL {
        let rows = proforma.definitions(role).len();
        validate_level(&proforma.cycles_for(role), role, rows)?;
    }

    let parameters: HashSet<String> = proforma
        .definitions(Role::Parameter)
        .iter()
        .map(|d| d.base_name())
        .collect();
    let cycled = cycled_parameters(proforma);

    for param in proforma.driving_parameters() {
        if !parameters.contains(&param) {
            return schema_err!(
                BadCycleDefinition,
                format!("{}: cycle driven by missing parameter '{param}'", proforma.object)
            );
        }
        if cycled.contains(&param) {
            return schema_err!(
                BadCycleDefinition,
                format!("{}: driving parameter '{param}' is itself cycled", proforma.object)
            );
        }
    }

    Ok(())
}

fn validate_level(cycles: &[&CycleDef], role: Role, scope: usize) -> Result<()> {
    let mut cycles = cycles.to_vec();
    cycles.sort_by_key(|c| c.first_row);

    let mut prev_last = 0;
    for cycle in cycles {
        let range = format!("{} rows {}..{}", role, cycle.first_row, cycle.last_row);
        if cycle.role != role {
            return schema_err!(
                BadCycleDefinition,
                format!("{range}: nested cycle over {}", cycle.role)
            );
        }
        if cycle.first_row == 0 || cycle.last_row < cycle.first_row || cycle.last_row > scope {
            return schema_err!(
                BadCycleDefinition,
                format!("{range}: outside the {scope} enclosing rows")
            );
        }
        if cycle.first_row <= prev_last {
            return schema_err!(BadCycleDefinition, format!("{range}: overlaps a sibling"));
        }
        if cycle.min_size > cycle.max_size {
            return schema_err!(
                BadCycleDefinition,
                format!("{range}: min size {} > max size {}", cycle.min_size, cycle.max_size)
            );
        }
        let children: Vec<&CycleDef> = cycle.cycles.iter().collect();
        validate_level(&children, role, cycle.row_count())?;
        prev_last = cycle.last_row;
    }

    Ok(())
}

/// Base names of parameters that sit inside a parameter cycle.
fn cycled_parameters(proforma: &Proforma) -> HashSet<String> {
    let defs = proforma.definitions(Role::Parameter);
    proforma
        .cycles_for(Role::Parameter)
        .iter()
        .flat_map(|c| defs[c.first_row - 1..c.last_row].iter().map(|d| d.base_name()))
        .collect()
}
