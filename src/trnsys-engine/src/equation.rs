// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::common::{Error, ErrorCode, ErrorKind, Result, UnitNumber};
use crate::schema_err;

lazy_static! {
    static ref OUTPUT_REF_RE: Regex = Regex::new(r"^\[\s*(\d+)\s*,\s*(\d+)\s*\]$").unwrap();
    static ref OUTPUT_REF_SCAN_RE: Regex = Regex::new(r"\[\s*(\d+)\s*,\s*(\d+)\s*\]").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

fn bad_equation(details: String) -> Error {
    Error::new(ErrorKind::Parse, ErrorCode::BadEquation, Some(details))
}

/// Right-hand side of an equation.  A bare `[unit,output]` reference is
/// kept structured so its target can be checked before writing.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Text(String),
    /// 0-based output of a component.
    Output { unit: UnitNumber, output: usize },
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Expression> {
        let s = s.trim();
        if s.is_empty() {
            return Err(bad_equation("empty expression".to_owned()));
        }
        if let Some(caps) = OUTPUT_REF_RE.captures(s) {
            let unit = caps[1].parse().ok();
            let output = caps[2].parse::<usize>().ok().filter(|o| *o > 0);
            return match (unit, output) {
                (Some(unit), Some(output)) => Ok(Expression::Output {
                    unit,
                    output: output - 1,
                }),
                _ => Err(bad_equation(format!("bad output reference '{s}'"))),
            };
        }
        for caps in OUTPUT_REF_SCAN_RE.captures_iter(s) {
            let unit = caps[1].parse::<UnitNumber>().ok();
            let output = caps[2].parse::<usize>().ok().filter(|o| *o > 0);
            if unit.is_none() || output.is_none() {
                return Err(bad_equation(format!("bad output reference '{}' in '{s}'", &caps[0])));
            }
        }
        Ok(Expression::Text(s.to_owned()))
    }
}

impl Expression {
    /// Every `[unit,output]` reference, with `output` 1-based as written.
    pub fn output_refs(&self) -> Vec<(UnitNumber, usize)> {
        match self {
            Expression::Output { unit, output } => vec![(*unit, output + 1)],
            Expression::Text(text) => OUTPUT_REF_SCAN_RE
                .captures_iter(text)
                .filter_map(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?)))
                .collect(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Text(text) => write!(f, "{text}"),
            Expression::Output { unit, output } => write!(f, "[{unit},{}]", output + 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    pub name: String,
    pub expression: Expression,
    pub doc: Option<String>,
}

impl Equation {
    pub fn new(name: &str, expression: &str) -> Result<Equation> {
        if !IDENT_RE.is_match(name) {
            return Err(bad_equation(format!("'{name}' is not a valid variable name")));
        }
        Ok(Equation {
            name: name.to_owned(),
            expression: expression.parse()?,
            doc: None,
        })
    }

    /// `name = [unit,output]`, with `output` 0-based.
    pub fn output(name: &str, unit: UnitNumber, output: usize) -> Result<Equation> {
        let mut eqn = Equation::new(name, "0")?;
        eqn.expression = Expression::Output { unit, output };
        Ok(eqn)
    }

    pub fn with_doc(mut self, doc: &str) -> Equation {
        self.doc = Some(doc.to_owned());
        self
    }
}

/// Parses `name = expression ! doc`.
impl FromStr for Equation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Equation> {
        let (code, doc) = match s.split_once('!') {
            Some((code, doc)) => (code, Some(doc.trim()).filter(|d| !d.is_empty())),
            None => (s, None),
        };
        let Some((name, expression)) = code.split_once('=') else {
            return Err(bad_equation(format!("expected 'name = expression', got '{}'", s.trim())));
        };
        let mut eqn = Equation::new(name.trim(), expression)?;
        eqn.doc = doc.map(|d| d.to_owned());
        Ok(eqn)
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.expression)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Equations,
    Constants,
}

impl BlockKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::Equations => "EQUATIONS",
            BlockKind::Constants => "CONSTANTS",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<BlockKind> {
        if keyword.eq_ignore_ascii_case("EQUATIONS") {
            Some(BlockKind::Equations)
        } else if keyword.eq_ignore_ascii_case("CONSTANTS") {
            Some(BlockKind::Constants)
        } else {
            None
        }
    }
}

/// A named group of equations written as one `EQUATIONS n` (or
/// `CONSTANTS n`) block.
#[derive(Clone, Debug, PartialEq)]
pub struct EquationBlock {
    pub name: String,
    pub kind: BlockKind,
    equations: Vec<Equation>,
}

impl EquationBlock {
    pub fn new(name: &str, kind: BlockKind) -> EquationBlock {
        EquationBlock {
            name: name.to_owned(),
            kind,
            equations: vec![],
        }
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Equation> {
        self.equations
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Appends `eqn`; TRNSYS variable names are case-insensitive.
    pub fn push(&mut self, eqn: Equation) -> Result<()> {
        if self.get(&eqn.name).is_some() {
            return schema_err!(
                DuplicateVariable,
                format!("{}: '{}' defined twice", self.name, eqn.name)
            );
        }
        self.equations.push(eqn);
        Ok(())
    }

    /// Returns a copy with `eqn` appended.
    pub fn with(mut self, eqn: Equation) -> Result<EquationBlock> {
        self.push(eqn)?;
        Ok(self)
    }
}
