// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Deck text generation.  Every 0-based position becomes 1-based here
//! and nowhere else.

use crate::common::Result;
use crate::component::Component;
use crate::config::WriterConfig;
use crate::datamodel::Role;
use crate::deck::Deck;
use crate::equation::EquationBlock;
use crate::statement::{Statement, StatementKind};
use crate::variable::Variable;
use crate::{conn_err, deck_err};

/// Formats a number the way decks expect: shortest round-trip decimal,
/// never exponent notation, no trailing `.0` on integers, and no
/// negative zero.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    // Rust's Display gives shortest round-trip decimal representation
    format!("{value}")
}

/// Accumulates `value ! annotation` rows so annotations line up.
struct Table<'a> {
    config: &'a WriterConfig,
    rows: Vec<(String, String)>,
}

impl<'a> Table<'a> {
    fn new(config: &'a WriterConfig) -> Self {
        Table {
            config,
            rows: vec![],
        }
    }

    fn row(&mut self, value: impl Into<String>, annotation: impl Into<String>) {
        self.rows.push((value.into(), annotation.into()));
    }

    fn write_to(self, out: &mut String) {
        let widest = self.rows.iter().map(|(v, _)| v.len()).max().unwrap_or(0);
        let column = (widest + self.config.annotation_padding).max(self.config.annotation_column);
        for (value, annotation) in self.rows {
            if annotation.is_empty() {
                out.push_str(&value);
            } else {
                out.push_str(&format!("{value:<column$}! {annotation}"));
            }
            out.push('\n');
        }
    }
}

pub(crate) fn render(deck: &Deck) -> Result<String> {
    let mut out = String::new();
    let config = &deck.config;

    if config.header {
        write_header(deck, &mut out);
    }

    out.push_str("*** Control Cards\n");
    write_statements(deck, &mut out)?;

    for block in deck.equation_blocks() {
        write_equation_block(deck, block, &mut out)?;
    }

    for component in deck.components() {
        validate_outbound(deck, component)?;
        write_component(deck, component, &mut out)?;
    }

    out.push_str("END\n");
    Ok(out)
}

fn write_header(deck: &Deck, out: &mut String) {
    let config = &deck.config;
    out.push_str(&format!(
        "* TRNSYS input file (deck) generated by {}\n",
        config.generator
    ));
    out.push_str(&format!("* Deck: {}\n", deck.name));
    if let Some(ref author) = deck.author {
        out.push_str(&format!("* Author: {author}\n"));
    }
    if let Some(ref description) = config.description {
        for line in description.lines() {
            out.push_str(&format!("* {line}\n"));
        }
    }
    out.push_str("*\n");
}

fn write_statements(deck: &Deck, out: &mut String) -> Result<()> {
    let mut table = Table::new(&deck.config);
    for statement in deck.statements() {
        if let Statement::NoCheck(pairs) = statement {
            for &(unit, input) in pairs {
                check_input_exists(deck, unit, input)?;
            }
        }
        let text = statement.to_string();
        let mut lines = text.lines();
        if let Some(first) = lines.next() {
            table.row(first, statement.doc());
        }
        for line in lines {
            table.row(line, "");
        }
    }
    table.write_to(out);
    Ok(())
}

fn check_input_exists(deck: &Deck, unit: u32, input: usize) -> Result<()> {
    let Some(component) = deck.component(unit) else {
        return deck_err!(
            DanglingConnection,
            format!("{}: unit {unit} is not in the deck", StatementKind::NoCheck.keyword())
        );
    };
    if input >= component.inputs().len() {
        return deck_err!(
            DanglingConnection,
            format!(
                "{}: {} has no input {}",
                StatementKind::NoCheck.keyword(),
                component.name(),
                input + 1
            )
        );
    }
    Ok(())
}

fn write_equation_block(deck: &Deck, block: &EquationBlock, out: &mut String) -> Result<()> {
    let keyword = block.kind.keyword();
    out.push_str(&format!("* {keyword} \"{}\"\n", block.name));
    out.push_str("*\n");
    out.push_str(&format!("{keyword} {}\n", block.len()));

    let mut table = Table::new(&deck.config);
    for eqn in block.equations() {
        for (unit, output) in eqn.expression.output_refs() {
            let Some(component) = deck.component(unit) else {
                return deck_err!(
                    DanglingConnection,
                    format!("{}: '{}' reads unit {unit}, which is not in the deck", block.name, eqn.name)
                );
            };
            if output == 0 || output > component.outputs().len() {
                return deck_err!(
                    DanglingConnection,
                    format!(
                        "{}: '{}' reads output {output} of {}, which has {}",
                        block.name,
                        eqn.name,
                        component.name(),
                        component.outputs().len()
                    )
                );
            }
        }
        table.row(eqn.to_string(), eqn.doc.clone().unwrap_or_default());
    }
    table.write_to(out);
    out.push_str("*\n");
    Ok(())
}

fn validate_outbound(deck: &Deck, component: &Component) -> Result<()> {
    for conn in component.connections() {
        let Some(target) = deck.component(conn.target_unit) else {
            return conn_err!(
                DanglingConnection,
                format!("{conn}: unit {} is not in the deck", conn.target_unit)
            );
        };
        conn.validate(component, target)?;
    }
    Ok(())
}

/// The deck's spelling of the equation bound to `var`, if any.
fn bound_equation<'a>(
    deck: &'a Deck,
    component: &Component,
    var: &Variable,
) -> Result<Option<&'a str>> {
    let Some(name) = var.equation() else {
        return Ok(None);
    };
    match deck.equation(name) {
        Some(eqn) => Ok(Some(eqn.name.as_str())),
        None => deck_err!(
            DanglingConnection,
            format!(
                "{}: {} is bound to '{name}', which is not defined in the deck",
                component.name(),
                var.name()
            )
        ),
    }
}

fn write_component(deck: &Deck, component: &Component, out: &mut String) -> Result<()> {
    let config = &deck.config;
    let name = component.name();

    if config.studio_markup {
        out.push_str(&format!(
            "* Model \"{name}\" (Type {})\n",
            component.type_number()
        ));
        out.push_str("*\n");
    }
    out.push_str(&format!(
        "UNIT {} TYPE {} {name}\n",
        component.unit_number(),
        component.type_number()
    ));
    if config.studio_markup {
        out.push_str(&format!("*$UNIT_NAME {name}\n"));
        if let Some(ref model) = component.proforma().model {
            out.push_str(&format!("*$MODEL {model}\n"));
        }
    }

    let params = component.parameters();
    out.push_str(&format!("{} {}\n", Role::Parameter.keyword(), params.len()));
    let mut table = Table::new(config);
    for (i, var) in params.iter().enumerate() {
        let value = match bound_equation(deck, component, var)? {
            Some(equation) => equation.to_owned(),
            None => format_number(var.value()),
        };
        table.row(value, format!("{} {}", i + 1, var.name()));
    }
    table.write_to(out);

    let inputs = component.inputs();
    out.push_str(&format!("{} {}\n", Role::Input.keyword(), inputs.len()));
    if !inputs.is_empty() {
        let inbound = deck.inbound(component.unit_number());
        let mut table = Table::new(config);
        for (i, var) in inputs.iter().enumerate() {
            match inbound.get(&i) {
                Some(conn) => {
                    let source = deck
                        .component(conn.source_unit)
                        .map(|c| c.name())
                        .unwrap_or("?");
                    table.row(
                        format!("{},{}", conn.source_unit, conn.source_output + 1),
                        format!("{source}:{} -> {name}:{}", conn.source_name, var.name()),
                    );
                }
                None => match bound_equation(deck, component, var)? {
                    Some(equation) => {
                        table.row(equation, format!("{equation} -> {name}:{}", var.name()))
                    }
                    None => table.row("0,0", format!("[unconnected] {name}:{}", var.name())),
                },
            }
        }
        table.write_to(out);

        out.push_str("*** INITIAL INPUT VALUES\n");
        let mut table = Table::new(config);
        for var in inputs {
            table.row(format_number(var.value()), var.name());
        }
        table.write_to(out);
    }

    for card in &component.proforma().special_cards {
        if card.answer.is_empty() {
            out.push_str(&format!("{}\n", card.name));
        } else {
            out.push_str(&format!("{} {}\n", card.name, card.answer));
        }
    }

    let derivatives = component.derivatives();
    if !derivatives.is_empty() {
        out.push_str(&format!("{} {}\n", Role::Derivative.keyword(), derivatives.len()));
        let mut table = Table::new(config);
        for (i, var) in derivatives.iter().enumerate() {
            table.row(format_number(var.value()), format!("{} {}", i + 1, var.name()));
        }
        table.write_to(out);
    }

    if !component.external_files().is_empty() {
        out.push_str("*** External files\n");
        for file in component.external_files() {
            let keyword = if file.designate() { "DESIGNATE" } else { "ASSIGN" };
            out.push_str(&format!("{keyword} \"{}\" {}\n", file.path(), file.logical_unit()));
        }
    }
    out.push_str("*------------------------------------------------------------------------------\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::connection::mapping;
    use crate::equation::{BlockKind, Equation};
    use crate::testutils::{tank, weather};
    use std::rc::Rc;

    #[test]
    fn test_format_number() {
        assert_eq!("0", format_number(0.0));
        assert_eq!("0", format_number(-0.0));
        assert_eq!("8760", format_number(8760.0));
        assert_eq!("0.3", format_number(0.3));
        assert_eq!("-2.5", format_number(-2.5));
        assert_eq!("0.0000001", format_number(1e-7));
        assert_eq!("100000000000000000000", format_number(1e20));
    }

    fn minimal_deck() -> Deck {
        Deck::new("test").with_config(WriterConfig::minimal())
    }

    #[test]
    fn test_empty_deck() {
        let text = minimal_deck().render().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!("*** Control Cards", lines[0]);
        assert_eq!("VERSION 18.0", lines[1]);
        assert!(lines[2].starts_with("SIMULATION 0 8760 1"));
        assert!(lines[2].ends_with("! Start time  End time  Time step"));
        assert_eq!(Some(&"END"), lines.last());
    }

    #[test]
    fn test_header() {
        let mut deck = Deck::new("My house");
        deck.author = Some("Jane".to_owned());
        let text = deck.render().unwrap();
        assert!(text.starts_with("* TRNSYS input file (deck) generated by trnsys-engine"));
        assert!(text.contains("* Deck: My house\n"));
        assert!(text.contains("* Author: Jane\n"));
    }

    #[test]
    fn test_component_block() {
        let mut deck = minimal_deck();
        deck.insert(tank(1)).unwrap();
        deck.insert(tank(2)).unwrap();
        deck.connect(1, 2, &mapping([(0usize, 1usize)])).unwrap();
        let text = deck.render().unwrap();

        assert!(text.contains("UNIT 2 TYPE 4 Tank\nPARAMETERS 2\n"));
        assert!(text.contains("5           ! 1 Count\n"), "{text}");
        assert!(text.contains("0.3         ! 2 Diameter\n"));
        assert!(text.contains("INPUTS 2\n0,0         ! [unconnected] Tank:Inlet_temperature\n"));
        assert!(text.contains("1,1         ! Tank:Outlet_temperature -> Tank:Inlet_flowrate\n"));
        assert!(text.contains("*** INITIAL INPUT VALUES\n20          ! Inlet_temperature\n"));
        assert!(text.contains("DERIVATIVES 1\n45          ! 1 Initial_tank_temperature\n"));
    }

    #[test]
    fn test_studio_markup_and_external_files() {
        let mut deck = Deck::new("test");
        deck.add("Weather", Rc::new(weather())).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("* Model \"Weather\" (Type 15)\n*\nUNIT 1 TYPE 15 Weather\n"));
        assert!(text.contains("*$UNIT_NAME Weather\n"));
        assert!(text.contains("*$MODEL .\\Weather Data Reading and Processing\\Type15-2.tmf\n"));
        assert!(text.contains("INPUTS 0\n"));
        assert!(!text.contains("INITIAL INPUT VALUES"));
        assert!(text.contains(
            "*** External files\nASSIGN \".\\Weather\\US-CA-Sacramento.epw\" 30\n"
        ));
    }

    #[test]
    fn test_equation_blocks() {
        let mut deck = minimal_deck();
        deck.add("Weather", Rc::new(weather())).unwrap();
        let block = EquationBlock::new("Ambient", BlockKind::Equations)
            .with(Equation::output("Tamb", 1, 0).unwrap().with_doc("dry bulb"))
            .unwrap()
            .with(Equation::new("TambK", "Tamb + 273.15").unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("* EQUATIONS \"Ambient\"\n*\nEQUATIONS 2\n"));
        assert!(text.contains("Tamb = [1,1]           ! dry bulb\n"), "{text}");
        assert!(text.contains("TambK = Tamb + 273.15\n"));
    }

    #[test]
    fn test_dangling_equation_reference() {
        let mut deck = minimal_deck();
        deck.add("Weather", Rc::new(weather())).unwrap();
        let block = EquationBlock::new("Ambient", BlockKind::Equations)
            .with(Equation::output("Wind", 1, 3).unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        let err = deck.render().unwrap_err();
        assert_eq!(ErrorCode::DanglingConnection, err.code);
    }

    #[test]
    fn test_references_inside_expressions_checked() {
        let mut deck = minimal_deck();
        deck.insert(tank(1)).unwrap();
        let block = EquationBlock::new("Loads", BlockKind::Equations)
            .with(Equation::new("q", "2*[9,40]").unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        let err = deck.render().unwrap_err();
        assert_eq!(ErrorCode::DanglingConnection, err.code);

        deck.remove_equation_block("Loads").unwrap();
        let block = EquationBlock::new("Loads", BlockKind::Equations)
            .with(Equation::new("q", "2*[1,1] + [1,8]").unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        assert_eq!(ErrorCode::DanglingConnection, deck.render().unwrap_err().code);

        deck.remove_equation_block("Loads").unwrap();
        let block = EquationBlock::new("Loads", BlockKind::Equations)
            .with(Equation::new("q", "2*[1,1] + [1,2]").unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        assert!(deck.render().unwrap().contains("q = 2*[1,1] + [1,2]\n"));
    }

    #[test]
    fn test_equation_bindings_written_by_name() {
        let mut deck = minimal_deck();
        deck.insert(tank(1)).unwrap();
        let block = EquationBlock::new("Sizing", BlockKind::Constants)
            .with(Equation::new("Dtank", "0.45").unwrap())
            .unwrap()
            .with(Equation::new("Tsupply", "12").unwrap())
            .unwrap();
        deck.add_equation_block(block).unwrap();
        deck.set_parameter_equation(1, "Diameter", "dtank").unwrap();
        deck.connect_equation(1, "Inlet temperature", "TSUPPLY").unwrap();

        let text = deck.render().unwrap();
        assert!(text.contains("Dtank       ! 2 Diameter\n"), "{text}");
        assert!(text.contains("INPUTS 2\nTsupply     ! Tsupply -> Tank:Inlet_temperature\n"));

        deck.remove_equation_block("Sizing").unwrap();
        let err = deck.render().unwrap_err();
        assert_eq!(ErrorCode::DanglingConnection, err.code);
    }

    #[test]
    fn test_nocheck_validated() {
        let mut deck = minimal_deck();
        deck.insert(tank(1)).unwrap();
        deck.set_statement(Statement::NoCheck(vec![(1, 1)])).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("NOCHECK 1"));
        assert!(text.contains("\n1, 2\n"));

        deck.set_statement(Statement::NoCheck(vec![(1, 2)])).unwrap();
        assert_eq!(ErrorCode::DanglingConnection, deck.render().unwrap_err().code);
    }
}
