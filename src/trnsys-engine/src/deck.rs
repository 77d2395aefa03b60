// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::common::{Result, UnitNumber};
use crate::component::Component;
use crate::config::WriterConfig;
use crate::connection::{self, Connection};
use crate::datamodel::{Proforma, Role};
use crate::equation::{Equation, EquationBlock};
use crate::parser;
use crate::statement::{self, Statement, StatementKind};
use crate::variable::VarRef;
use crate::{conn_err, deck_err, schema_err, var_err, writer};

/// An assembled TRNSYS input file: control cards, equation blocks and
/// components, written in that order.
#[derive(Clone, Debug)]
pub struct Deck {
    pub name: String,
    pub author: Option<String>,
    pub config: WriterConfig,
    statements: Vec<Statement>,
    equation_blocks: Vec<EquationBlock>,
    components: Vec<Component>,
}

impl Deck {
    /// A deck holding VERSION and SIMULATION defaults.
    pub fn new(name: &str) -> Deck {
        Deck {
            name: name.to_owned(),
            author: None,
            config: WriterConfig::default(),
            statements: statement::basic_template(),
            equation_blocks: vec![],
            components: vec![],
        }
    }

    pub fn with_config(mut self, config: WriterConfig) -> Deck {
        self.config = config;
        self
    }

    /// Statements in canonical order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statement(&self, kind: StatementKind) -> Option<&Statement> {
        self.statements.iter().find(|s| s.kind() == kind)
    }

    /// Adds `statement`, replacing any statement of the same kind.  END
    /// is always written last by the writer and is not stored.
    pub fn set_statement(&mut self, statement: Statement) -> Result<()> {
        statement.validate()?;
        let kind = statement.kind();
        if kind == StatementKind::End {
            return Ok(());
        }
        match self.statements.binary_search_by_key(&kind, |s| s.kind()) {
            Ok(pos) => self.statements[pos] = statement,
            Err(pos) => self.statements.insert(pos, statement),
        }
        Ok(())
    }

    pub fn remove_statement(&mut self, kind: StatementKind) -> Option<Statement> {
        let pos = self.statements.iter().position(|s| s.kind() == kind)?;
        Some(self.statements.remove(pos))
    }

    pub fn equation_blocks(&self) -> &[EquationBlock] {
        &self.equation_blocks
    }

    /// Finds an equation or constant by (case-insensitive) name.
    pub fn equation(&self, name: &str) -> Option<&Equation> {
        self.equation_blocks.iter().find_map(|b| b.get(name))
    }

    pub fn add_equation_block(&mut self, block: EquationBlock) -> Result<()> {
        self.check_new_blocks(std::slice::from_ref(&block))?;
        self.equation_blocks.push(block);
        Ok(())
    }

    /// Checks that no equation in `blocks` is already defined in the deck
    /// or earlier in `blocks`.
    fn check_new_blocks(&self, blocks: &[EquationBlock]) -> Result<()> {
        let mut seen: Vec<&str> = vec![];
        for block in blocks {
            for eqn in block.equations() {
                let taken = self.equation(&eqn.name).is_some()
                    || seen.iter().any(|n| n.eq_ignore_ascii_case(&eqn.name));
                if taken {
                    return schema_err!(
                        DuplicateVariable,
                        format!("{}: '{}' is already defined in this deck", block.name, eqn.name)
                    );
                }
                seen.push(&eqn.name);
            }
        }
        Ok(())
    }

    pub fn remove_equation_block(&mut self, name: &str) -> Option<EquationBlock> {
        let pos = self.equation_blocks.iter().position(|b| b.name == name)?;
        Some(self.equation_blocks.remove(pos))
    }

    /// Components in output order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    fn position(&self, unit: UnitNumber) -> Option<usize> {
        self.components.iter().position(|c| c.unit_number() == unit)
    }

    pub fn component(&self, unit: UnitNumber) -> Option<&Component> {
        self.components.iter().find(|c| c.unit_number() == unit)
    }

    pub fn component_mut(&mut self, unit: UnitNumber) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.unit_number() == unit)
    }

    fn existing(&self, unit: UnitNumber) -> Result<&Component> {
        match self.component(unit) {
            Some(component) => Ok(component),
            None => conn_err!(UnknownUnit, format!("no unit {unit} in deck '{}'", self.name)),
        }
    }

    /// Smallest unit number above every unit in the deck.
    pub fn next_unit_number(&self) -> UnitNumber {
        self.components
            .iter()
            .map(|c| c.unit_number())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Appends `component`.  Unit numbers must be positive and unique,
    /// and the component must not carry connections made in another
    /// deck.
    pub fn insert(&mut self, component: Component) -> Result<UnitNumber> {
        let unit = component.unit_number();
        if let Some(conn) = component.connections().first() {
            return deck_err!(
                DanglingConnection,
                format!(
                    "{}: carries {} connection(s) from elsewhere, starting with {conn}",
                    component.name(),
                    component.connections().len()
                )
            );
        }
        if unit == 0 {
            return deck_err!(
                DuplicateUnitNumber,
                format!("{}: unit number 0 is reserved", component.name())
            );
        }
        if let Some(existing) = self.component(unit) {
            return deck_err!(
                DuplicateUnitNumber,
                format!(
                    "unit {unit} is already used by '{}', cannot add '{}'",
                    existing.name(),
                    component.name()
                )
            );
        }
        self.components.push(component);
        Ok(unit)
    }

    /// Instantiates `proforma` under the next free unit number.
    pub fn add(&mut self, name: &str, proforma: Rc<Proforma>) -> Result<UnitNumber> {
        let component = Component::new(self.next_unit_number(), name, proforma)?;
        self.insert(component)
    }

    /// Removes a component along with every connection into or out of
    /// it.
    pub fn remove(&mut self, unit: UnitNumber) -> Option<Component> {
        let pos = self.position(unit)?;
        let mut removed = self.components.remove(pos);
        removed.connections_mut().clear();
        for component in self.components.iter_mut() {
            let before = component.connections().len();
            component
                .connections_mut()
                .retain(|c| c.target_unit != unit);
            let dropped = before - component.connections().len();
            if dropped > 0 {
                debug!(
                    source = component.unit_number(),
                    target = unit,
                    dropped,
                    "dropped connections into removed unit"
                );
            }
        }
        Some(removed)
    }

    /// Moves a component to `index` in output order.
    pub fn move_component(&mut self, unit: UnitNumber, index: usize) -> Result<()> {
        let Some(pos) = self.position(unit) else {
            return deck_err!(UnknownUnit, format!("no unit {unit} in deck '{}'", self.name));
        };
        let component = self.components.remove(pos);
        let index = index.min(self.components.len());
        self.components.insert(index, component);
        Ok(())
    }

    /// Gives a component a new unit number, updating connections into
    /// it.
    pub fn renumber(&mut self, unit: UnitNumber, new_unit: UnitNumber) -> Result<()> {
        if unit == new_unit {
            return Ok(());
        }
        if new_unit == 0 || self.component(new_unit).is_some() {
            return deck_err!(
                DuplicateUnitNumber,
                format!("cannot renumber unit {unit}: {new_unit} is unavailable")
            );
        }
        let Some(pos) = self.position(unit) else {
            return deck_err!(UnknownUnit, format!("no unit {unit} in deck '{}'", self.name));
        };
        self.components[pos].set_unit_number(new_unit);
        for component in self.components.iter_mut() {
            for conn in component.connections_mut().iter_mut() {
                if conn.target_unit == unit {
                    conn.target_unit = new_unit;
                }
            }
        }
        Ok(())
    }

    /// Connects outputs of `source` to inputs of `target`.  An input that
    /// is already connected is re-pointed at the new output with a
    /// warning.
    pub fn connect(
        &mut self,
        source: UnitNumber,
        target: UnitNumber,
        mapping: &[(VarRef, VarRef)],
    ) -> Result<Vec<Connection>> {
        let resolved = connection::resolve(self.existing(source)?, self.existing(target)?, mapping)?;

        for conn in &resolved {
            for component in self.components.iter_mut() {
                component.connections_mut().retain(|old| {
                    let replaced =
                        old.target_unit == conn.target_unit && old.target_input == conn.target_input;
                    if replaced {
                        warn!(
                            target_unit = conn.target_unit,
                            input = %conn.target_name,
                            previous = %old,
                            new = %conn,
                            "replacing existing connection"
                        );
                    }
                    !replaced
                });
            }
            if let Some(target) = self.component_mut(conn.target_unit) {
                let bound = target
                    .inputs()
                    .get(conn.target_input)
                    .and_then(|v| v.equation())
                    .map(|e| e.to_owned());
                if let Some(equation) = bound {
                    warn!(
                        target_unit = conn.target_unit,
                        input = %conn.target_name,
                        %equation,
                        new = %conn,
                        "replacing equation input"
                    );
                    target.bind_equation(Role::Input, conn.target_input, None)?;
                }
            }
            if let Some(component) = self.component_mut(source) {
                component.connections_mut().push(conn.clone());
            }
        }

        Ok(resolved)
    }

    /// Feeds `input` of `target` from the deck equation or constant
    /// named `equation`.  Any connection into that input is removed.
    pub fn connect_equation(
        &mut self,
        target: UnitNumber,
        input: impl Into<VarRef>,
        equation: &str,
    ) -> Result<()> {
        let equation = self.existing_equation(equation)?;
        let input = self.existing(target)?.inputs().resolve(&input.into())?;
        if let Some(old) = self.disconnect(target, input)? {
            warn!(target_unit = target, previous = %old, %equation, "replacing connection with equation");
        }
        if let Some(component) = self.component_mut(target) {
            component.bind_equation(Role::Input, input, Some(&equation))?;
        }
        Ok(())
    }

    /// Makes a parameter of `unit` take its value from the deck equation
    /// or constant named `equation`.  Assigning a number with
    /// [`Component::set_parameter`] removes the binding again.
    pub fn set_parameter_equation(
        &mut self,
        unit: UnitNumber,
        param: impl Into<VarRef>,
        equation: &str,
    ) -> Result<()> {
        let equation = self.existing_equation(equation)?;
        self.existing(unit)?;
        if let Some(component) = self.component_mut(unit) {
            component.bind_equation(Role::Parameter, param, Some(&equation))?;
        }
        Ok(())
    }

    /// The deck's spelling of an equation name.
    fn existing_equation(&self, name: &str) -> Result<String> {
        match self.equation(name) {
            Some(eqn) => Ok(eqn.name.clone()),
            None => var_err!(
                UnknownVariable,
                format!("no equation or constant '{name}' in deck '{}'", self.name)
            ),
        }
    }

    /// Removes the connection or equation feeding `input` of `target`.
    /// Returns the removed connection, if there was one.
    pub fn disconnect(
        &mut self,
        target: UnitNumber,
        input: impl Into<VarRef>,
    ) -> Result<Option<Connection>> {
        let input = self.existing(target)?.inputs().resolve(&input.into())?;
        if let Some(component) = self.component_mut(target) {
            component.bind_equation(Role::Input, input, None)?;
        }
        for component in self.components.iter_mut() {
            let conns = component.connections_mut();
            if let Some(pos) = conns
                .iter()
                .position(|c| c.target_unit == target && c.target_input == input)
            {
                return Ok(Some(conns.remove(pos)));
            }
        }
        Ok(None)
    }

    /// Every connection in the deck, grouped by source component.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.components.iter().flat_map(|c| c.connections().iter())
    }

    /// Connections into `target`, keyed by 0-based input.
    pub fn inbound(&self, target: UnitNumber) -> BTreeMap<usize, &Connection> {
        self.connections()
            .filter(|c| c.target_unit == target)
            .map(|c| (c.target_input, c))
            .collect()
    }

    /// Logs external file paths assigned more than once and returns
    /// them.
    pub fn check_integrity(&self) -> Vec<String> {
        let mut seen: HashMap<&str, Vec<UnitNumber>> = HashMap::new();
        for component in &self.components {
            for file in component.external_files() {
                seen.entry(file.path())
                    .or_default()
                    .push(component.unit_number());
            }
        }
        let mut duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, units)| units.len() > 1)
            .map(|(path, units)| {
                warn!(path, ?units, "external file assigned more than once");
                path.to_owned()
            })
            .collect();
        duplicates.sort();
        duplicates
    }

    /// Renders the whole deck.  Nothing is produced if any connection or
    /// reference no longer matches the component it points at.
    pub fn render(&self) -> Result<String> {
        self.check_integrity();
        writer::render(self)
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        let text = self.render()?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = self.render()?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Reads control cards and equation blocks from deck text, replacing
    /// statements of the same kind and appending the equation blocks.
    /// Component blocks in `text` are ignored.  The deck is unchanged
    /// if anything in `text` is rejected.
    pub fn load_fragments(&mut self, text: &str) -> Result<()> {
        let fragments = parser::read_fragments(text)?;
        for statement in &fragments.statements {
            statement.validate()?;
        }
        self.check_new_blocks(&fragments.equation_blocks)?;

        for statement in fragments.statements {
            self.set_statement(statement)?;
        }
        for block in fragments.equation_blocks {
            self.add_equation_block(block)?;
        }
        Ok(())
    }
}
