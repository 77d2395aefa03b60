// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;
use std::rc::Rc;

use trnsys_engine::connection::mapping;
use trnsys_engine::datamodel::Role;
use trnsys_engine::{Component, Deck, ErrorCode, Proforma, WriterConfig};

fn storage_tank() -> Rc<Proforma> {
    Rc::new(Proforma::from_json(include_str!("proformas/storage_tank.json")).unwrap())
}

fn output_names(component: &Component) -> Vec<String> {
    component
        .outputs()
        .iter()
        .map(|v| v.name().to_owned())
        .collect()
}

fn inputs_section(text: &str, unit_line: &str) -> Vec<String> {
    text.lines()
        .skip_while(|l| *l != unit_line)
        .skip_while(|l| !l.starts_with("INPUTS"))
        .skip(1)
        .take_while(|l| !l.starts_with("***"))
        .map(|l| l.to_owned())
        .collect()
}

#[test]
fn shrinking_a_cycle() {
    let mut tank = Component::with_parameters(1, "Tank", storage_tank(), &[("Count", 8.0)]).unwrap();
    assert_eq!(10, tank.outputs().len());
    tank.set_value(Role::Output, "Level_2", 61.5, None).unwrap();
    tank.set_value(Role::Output, "Level_7", 40.0, None).unwrap();

    tank.set_parameter("Count", 3.0, None).unwrap();

    assert_eq!(
        vec!["Outlet_temperature", "Level_1", "Level_2", "Level_3", "Heat_loss"],
        output_names(&tank)
    );
    assert_eq!(61.5, tank.variable(Role::Output, "Level_2").unwrap().value());
    let err = tank.variable(Role::Output, "Level_7").unwrap_err();
    assert_eq!(ErrorCode::UnknownVariable, err.code);

    // growing again brings Level_7 back at its default
    tank.set_parameter("Count", 8.0, None).unwrap();
    assert_eq!(0.0, tank.variable(Role::Output, "Level_7").unwrap().value());
}

#[test]
fn connected_input_names_source_output() {
    let mut deck = Deck::new("two tanks").with_config(WriterConfig::minimal());
    let a = deck.add("A", storage_tank()).unwrap();
    let b = deck.add("B", storage_tank()).unwrap();
    deck.connect(a, b, &mapping([(0usize, 1usize)])).unwrap();

    let text = deck.render().unwrap();
    let inputs = inputs_section(&text, &format!("UNIT {b} TYPE 4 B"));
    assert_eq!(2, inputs.len());
    assert!(inputs[0].starts_with("0,0 "), "{}", inputs[0]);
    assert!(inputs[1].starts_with(&format!("{a},1 ")), "{}", inputs[1]);
    assert!(inputs[1].ends_with("A:Outlet_temperature -> B:Inlet_flowrate"));
}

#[test]
fn out_of_bounds_values_rejected() {
    let mut tank = Component::new(1, "Tank", storage_tank()).unwrap();
    let err = tank.set_parameter("Diameter", -5.0, None).unwrap_err();
    assert_eq!(ErrorCode::OutOfBounds, err.code);
    assert_eq!(0.3, tank.parameters().get_by_name("Diameter").unwrap().value());

    let err = tank
        .set_value(Role::Input, "Inlet flowrate", -1.0, Some("kg/s"))
        .unwrap_err();
    assert_eq!(ErrorCode::OutOfBounds, err.code);

    tank.set_value(Role::Input, "Inlet flowrate", 1.0, Some("kg/s")).unwrap();
    let flow = tank.variable(Role::Input, 1usize).unwrap().value();
    assert!((flow - 3600.0).abs() < 1e-9, "{flow}");
}

#[test]
fn stale_connections_fail_rendering() {
    let mut deck = Deck::new("stale");
    deck.add("A", storage_tank()).unwrap();
    deck.add("B", storage_tank()).unwrap();
    deck.connect(1, 2, &mapping([("Level_5", "Inlet temperature")])).unwrap();
    assert!(deck.render().is_ok());

    // Level_5 no longer exists once A has only two nodes
    deck.component_mut(1)
        .unwrap()
        .set_parameter("Count", 2.0, None)
        .unwrap();
    let err = deck.render().unwrap_err();
    assert_eq!(ErrorCode::DanglingConnection, err.code);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.dck");
    assert!(deck.save(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn renamed_output_detected() {
    let mut deck = Deck::new("renamed");
    deck.add("A", storage_tank()).unwrap();
    deck.add("B", storage_tank()).unwrap();
    deck.connect(1, 2, &mapping([("Level_3", "Inlet temperature")])).unwrap();

    // index 3 now holds Heat_loss
    deck.component_mut(1)
        .unwrap()
        .set_parameter("Count", 2.0, None)
        .unwrap();
    let err = deck.render().unwrap_err();
    assert_eq!(ErrorCode::DanglingConnection, err.code);
}

#[test]
fn save_writes_rendered_text() {
    let mut deck = Deck::new("saved");
    deck.author = Some("Test".to_owned());
    deck.add("Tank", storage_tank()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.dck");
    deck.save(&path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(deck.render().unwrap(), written);
    assert!(written.ends_with("END\n"));

    let mut buf: Vec<u8> = vec![];
    deck.write_to(&mut buf).unwrap();
    assert_eq!(written.as_bytes(), buf.as_slice());
}
