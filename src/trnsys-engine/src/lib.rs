// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod component;
pub mod config;
pub mod connection;
mod cycle;
pub mod datamodel;
pub mod deck;
pub mod equation;
pub mod parser;
pub mod quantity;
pub mod statement;
pub mod units;
pub mod variable;
mod writer;

#[cfg(test)]
mod cycle_proptest;
#[cfg(test)]
mod quantity_proptest;
#[cfg(test)]
mod testutils;

pub use self::common::{Error, ErrorCode, ErrorKind, Result, TypeNumber, UnitNumber};
pub use self::component::Component;
pub use self::config::WriterConfig;
pub use self::connection::Connection;
pub use self::datamodel::Proforma;
pub use self::deck::Deck;
pub use self::equation::{Equation, EquationBlock};
pub use self::quantity::Quantity;
pub use self::statement::Statement;
pub use self::variable::{VarRef, Variable, VariableCollection};
pub use self::writer::format_number;
