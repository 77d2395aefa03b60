// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::common::UnitNumber;
use crate::component::Component;
use crate::datamodel::Proforma;

pub(crate) fn storage_tank() -> Proforma {
    Proforma::from_json(include_str!("../tests/proformas/storage_tank.json")).unwrap()
}

pub(crate) fn weather() -> Proforma {
    Proforma::from_json(include_str!("../tests/proformas/weather.json")).unwrap()
}

pub(crate) fn pipe_network() -> Proforma {
    Proforma::from_json(include_str!("../tests/proformas/pipe_network.json")).unwrap()
}

pub(crate) fn tank(unit: UnitNumber) -> Component {
    Component::new(unit, "Tank", storage_tank().into()).unwrap()
}

pub(crate) fn names(component: &Component, role: crate::datamodel::Role) -> Vec<String> {
    component
        .collection(role)
        .iter()
        .map(|v| v.name().to_owned())
        .collect()
}
