// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::{error, fmt, io, result};

use lazy_static::lazy_static;
use regex::Regex;

/// Identifies a component within a deck.
pub type UnitNumber = u32;

/// TRNSYS type number of a proforma (e.g. 951 for a pipe).
pub type TypeNumber = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    DimensionMismatch,
    TypeMismatch,
    OutOfBounds,
    CycleBoundsExceeded,
    BadCycleDefinition,
    UnknownVariable,
    DuplicateVariable,
    DanglingConnection,
    DuplicateUnitNumber,
    UnknownUnit,
    UnknownExternalFile,
    SchemaDeserialization,
    BadStatement,
    BadEquation,
    ExpectedNumber,
    UnexpectedEof,
    Io,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DimensionMismatch => "dimension_mismatch",
            TypeMismatch => "type_mismatch",
            OutOfBounds => "out_of_bounds",
            CycleBoundsExceeded => "cycle_bounds_exceeded",
            BadCycleDefinition => "bad_cycle_definition",
            UnknownVariable => "unknown_variable",
            DuplicateVariable => "duplicate_variable",
            DanglingConnection => "dangling_connection",
            DuplicateUnitNumber => "duplicate_unit_number",
            UnknownUnit => "unknown_unit",
            UnknownExternalFile => "unknown_external_file",
            SchemaDeserialization => "schema_deserialization",
            BadStatement => "bad_statement",
            BadEquation => "bad_equation",
            ExpectedNumber => "expected_number",
            UnexpectedEof => "unexpected_eof",
            Io => "io",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Variable,
    Connection,
    Deck,
    Parse,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            code: ErrorCode::Io,
            details: Some(err.to_string()),
        }
    }
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Variable => "VariableError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Deck => "DeckError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Io => "IoError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Turns a proforma label into an identifier: every run of characters
/// outside `[0-9a-zA-Z]` becomes a single underscore.
pub fn standardize_name(name: &str) -> String {
    lazy_static! {
        static ref NON_IDENT_RE: Regex = Regex::new(r"[^0-9a-zA-Z]+").unwrap();
    }

    NON_IDENT_RE.replace_all(name.trim(), "_").into_owned()
}

#[test]
fn test_standardize_name() {
    assert_eq!("Inlet_temperature", standardize_name("Inlet temperature"));
    assert_eq!("Inlet_temperature", standardize_name("  Inlet temperature "));
    assert_eq!("Flow_rate_kg_hr_", standardize_name("Flow rate (kg/hr)"));
    assert_eq!("Level_1", standardize_name("Level-1"));
    assert_eq!("a_b", standardize_name("a \n\t b"));
    assert_eq!("already_fine", standardize_name("already_fine"));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Variable,
        ErrorCode::OutOfBounds,
        Some("Diameter = -5".to_owned()),
    );
    assert_eq!("VariableError{out_of_bounds: Diameter = -5}", err.to_string());

    let err = Error::new(ErrorKind::Deck, ErrorCode::DuplicateUnitNumber, None);
    assert_eq!("DeckError{duplicate_unit_number}", err.to_string());
}

#[test]
fn test_io_error_conversion() {
    let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
    assert_eq!(ErrorKind::Io, err.kind);
    assert_eq!(ErrorCode::Io, err.code);
    assert_eq!(Some("missing".to_owned()), err.get_details());
}
