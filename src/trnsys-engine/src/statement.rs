// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Control-card statements written at the top of a deck.

use std::fmt;
use std::str::FromStr;

use crate::common::{Error, ErrorCode, ErrorKind, Result, UnitNumber};
use crate::writer::format_number;

const MAX_NOCHECK: usize = 20;

fn bad_statement(details: String) -> Error {
    Error::new(ErrorKind::Parse, ErrorCode::BadStatement, Some(details))
}

/// Canonical position of each statement in a deck.  `End` is only ever
/// written as the very last line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    Version,
    Simulation,
    Tolerances,
    Limits,
    Dfq,
    NanCheck,
    OverwriteCheck,
    TimeReport,
    Width,
    NoCheck,
    NoList,
    List,
    Map,
    Solver,
    EqSolver,
    End,
}

const KEYWORDS: &[(StatementKind, &str)] = &[
    (StatementKind::Version, "VERSION"),
    (StatementKind::Simulation, "SIMULATION"),
    (StatementKind::Tolerances, "TOLERANCES"),
    (StatementKind::Limits, "LIMITS"),
    (StatementKind::Dfq, "DFQ"),
    (StatementKind::NanCheck, "NAN_CHECK"),
    (StatementKind::OverwriteCheck, "OVERWRITE_CHECK"),
    (StatementKind::TimeReport, "TIME_REPORT"),
    (StatementKind::Width, "WIDTH"),
    (StatementKind::NoCheck, "NOCHECK"),
    (StatementKind::NoList, "NOLIST"),
    (StatementKind::List, "LIST"),
    (StatementKind::Map, "MAP"),
    (StatementKind::Solver, "SOLVER"),
    (StatementKind::EqSolver, "EQSOLVER"),
    (StatementKind::End, "END"),
];

impl StatementKind {
    pub fn keyword(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, kw)| *kw)
            .unwrap_or("")
    }

    pub fn from_keyword(keyword: &str) -> Option<StatementKind> {
        KEYWORDS
            .iter()
            .find(|(_, kw)| kw.eq_ignore_ascii_case(keyword))
            .map(|(kind, _)| *kind)
    }
}

/// A SIMULATION argument: a literal or the name of a constant.
#[derive(Clone, Debug, PartialEq)]
pub enum SimValue {
    Number(f64),
    Constant(String),
}

impl From<f64> for SimValue {
    fn from(n: f64) -> Self {
        SimValue::Number(n)
    }
}

impl From<&str> for SimValue {
    fn from(name: &str) -> Self {
        SimValue::Constant(name.to_owned())
    }
}

impl fmt::Display for SimValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimValue::Number(n) => write!(f, "{}", format_number(*n)),
            SimValue::Constant(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolverMethod {
    SuccessiveSubstitution { rf_min: f64, rf_max: f64 },
    Powell,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Version { major: u32, minor: u32 },
    Simulation { start: SimValue, stop: SimValue, step: SimValue },
    Tolerances { integration: f64, convergence: f64 },
    Limits { max_iterations: u32, max_warnings: u32, trace_limit: u32 },
    Dfq(u8),
    NanCheck(bool),
    OverwriteCheck(bool),
    TimeReport(bool),
    Width(u32),
    /// (unit, 0-based input) pairs exempt from convergence checks.
    NoCheck(Vec<(UnitNumber, usize)>),
    NoList,
    List,
    Map,
    Solver(SolverMethod),
    EqSolver(u8),
    End,
}

impl Statement {
    pub fn version(major: u32, minor: u32) -> Statement {
        Statement::Version { major, minor }
    }

    pub fn simulation(start: impl Into<SimValue>, stop: impl Into<SimValue>, step: impl Into<SimValue>) -> Statement {
        Statement::Simulation {
            start: start.into(),
            stop: stop.into(),
            step: step.into(),
        }
    }

    pub fn tolerances(integration: f64, convergence: f64) -> Statement {
        Statement::Tolerances {
            integration,
            convergence,
        }
    }

    /// `trace_limit` defaults to `max_iterations`.
    pub fn limits(max_iterations: u32, max_warnings: u32, trace_limit: Option<u32>) -> Statement {
        Statement::Limits {
            max_iterations,
            max_warnings,
            trace_limit: trace_limit.unwrap_or(max_iterations),
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Version { .. } => StatementKind::Version,
            Statement::Simulation { .. } => StatementKind::Simulation,
            Statement::Tolerances { .. } => StatementKind::Tolerances,
            Statement::Limits { .. } => StatementKind::Limits,
            Statement::Dfq(_) => StatementKind::Dfq,
            Statement::NanCheck(_) => StatementKind::NanCheck,
            Statement::OverwriteCheck(_) => StatementKind::OverwriteCheck,
            Statement::TimeReport(_) => StatementKind::TimeReport,
            Statement::Width(_) => StatementKind::Width,
            Statement::NoCheck(_) => StatementKind::NoCheck,
            Statement::NoList => StatementKind::NoList,
            Statement::List => StatementKind::List,
            Statement::Map => StatementKind::Map,
            Statement::Solver(_) => StatementKind::Solver,
            Statement::EqSolver(_) => StatementKind::EqSolver,
            Statement::End => StatementKind::End,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Statement::Dfq(k) if !(1..=3).contains(k) => {
                Err(bad_statement(format!("DFQ {k}: method must be 1, 2 or 3")))
            }
            Statement::Width(n) if !(72..=132).contains(n) => {
                Err(bad_statement(format!("WIDTH {n}: must be within 72..=132")))
            }
            Statement::NoCheck(pairs) if pairs.len() > MAX_NOCHECK => Err(bad_statement(format!(
                "NOCHECK {}: at most {MAX_NOCHECK} inputs",
                pairs.len()
            ))),
            Statement::EqSolver(n) if *n > 2 => {
                Err(bad_statement(format!("EQSOLVER {n}: must be 0, 1 or 2")))
            }
            Statement::Solver(SolverMethod::SuccessiveSubstitution { rf_min, rf_max })
                if rf_min > rf_max =>
            {
                Err(bad_statement(format!(
                    "SOLVER 0: minimum relaxation {rf_min} above maximum {rf_max}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Annotation written after the statement.
    pub fn doc(&self) -> &'static str {
        match self {
            Statement::Version { .. } | Statement::End => "",
            Statement::Simulation { .. } => "Start time  End time  Time step",
            Statement::Tolerances { .. } => "Integration  Convergence",
            Statement::Limits { .. } => "Max iterations  Max warnings  Trace limit",
            Statement::Dfq(_) => "Numerical integration method",
            Statement::NanCheck(_) => "NaN check",
            Statement::OverwriteCheck(_) => "Overwrite check",
            Statement::TimeReport(_) => "Time report",
            Statement::Width(_) => "Output line width",
            Statement::NoCheck(_) => "Inputs exempt from convergence checks",
            Statement::NoList => "Suppress input file listing",
            Statement::List => "Resume input file listing",
            Statement::Map => "Print component map",
            Statement::Solver(_) => "Solver  Min relaxation  Max relaxation",
            Statement::EqSolver(_) => "Equation solving method",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kw = self.kind().keyword();
        match self {
            Statement::Version { major, minor } => write!(f, "{kw} {major}.{minor}"),
            Statement::Simulation { start, stop, step } => {
                write!(f, "{kw} {start} {stop} {step}")
            }
            Statement::Tolerances {
                integration,
                convergence,
            } => write!(
                f,
                "{kw} {} {}",
                format_number(*integration),
                format_number(*convergence)
            ),
            Statement::Limits {
                max_iterations,
                max_warnings,
                trace_limit,
            } => write!(f, "{kw} {max_iterations} {max_warnings} {trace_limit}"),
            Statement::Dfq(k) => write!(f, "{kw} {k}"),
            Statement::NanCheck(on) | Statement::OverwriteCheck(on) | Statement::TimeReport(on) => {
                write!(f, "{kw} {}", u8::from(*on))
            }
            Statement::Width(n) => write!(f, "{kw} {n}"),
            Statement::NoCheck(pairs) => {
                write!(f, "{kw} {}", pairs.len())?;
                if !pairs.is_empty() {
                    let pairs: Vec<String> = pairs
                        .iter()
                        .map(|(unit, input)| format!("{unit}, {}", input + 1))
                        .collect();
                    write!(f, "\n{}", pairs.join("\t"))?;
                }
                Ok(())
            }
            Statement::NoList | Statement::List | Statement::Map | Statement::End => {
                write!(f, "{kw}")
            }
            Statement::Solver(SolverMethod::SuccessiveSubstitution { rf_min, rf_max }) => write!(
                f,
                "{kw} 0 {} {}",
                format_number(*rf_min),
                format_number(*rf_max)
            ),
            Statement::Solver(SolverMethod::Powell) => write!(f, "{kw} 1"),
            Statement::EqSolver(n) => write!(f, "{kw} {n}"),
        }
    }
}

struct Args<'a> {
    keyword: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Args<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += 1;
        tok
    }

    fn number<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let keyword = self.keyword;
        match self.next() {
            Some(tok) => tok.parse().map_err(|_| {
                Error::new(
                    ErrorKind::Parse,
                    ErrorCode::ExpectedNumber,
                    Some(format!("{keyword}: {what} '{tok}' is not a number")),
                )
            }),
            None => Err(Error::new(
                ErrorKind::Parse,
                ErrorCode::ExpectedNumber,
                Some(format!("{keyword}: missing {what}")),
            )),
        }
    }

    fn optional_number<T: FromStr>(&mut self, what: &str) -> Result<Option<T>> {
        if self.pos < self.tokens.len() {
            self.number(what).map(Some)
        } else {
            Ok(None)
        }
    }

    fn sim_value(&mut self, what: &str) -> Result<SimValue> {
        let keyword = self.keyword;
        match self.next() {
            Some(tok) => Ok(match tok.parse::<f64>() {
                Ok(n) => SimValue::Number(n),
                Err(_) => SimValue::Constant(tok.to_owned()),
            }),
            None => Err(bad_statement(format!("{keyword}: missing {what}"))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.pos < self.tokens.len() {
            return Err(bad_statement(format!(
                "{}: unexpected '{}'",
                self.keyword, self.tokens[self.pos]
            )));
        }
        Ok(())
    }
}

/// Parses one statement.  Anything after `!` is ignored, commas count as
/// whitespace, and NOCHECK pairs may follow on the same line.
impl FromStr for Statement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Statement> {
        let code = match s.find('!') {
            Some(pos) => &s[..pos],
            None => s,
        };
        let mut tokens = code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());
        let Some(keyword) = tokens.next() else {
            return Err(bad_statement("empty statement".to_owned()));
        };
        let Some(kind) = StatementKind::from_keyword(keyword) else {
            return Err(bad_statement(format!("unknown statement '{keyword}'")));
        };
        let mut args = Args {
            keyword: kind.keyword(),
            tokens: tokens.collect(),
            pos: 0,
        };

        let statement = match kind {
            StatementKind::Version => {
                let version = args.next().unwrap_or("");
                let (major, minor) = version.split_once('.').unwrap_or((version, "0"));
                if minor.len() > 1 && minor.starts_with('0') {
                    return Err(Error::new(
                        ErrorKind::Parse,
                        ErrorCode::BadStatement,
                        Some(format!("VERSION: '{version}' would not read back the same")),
                    ));
                }
                match (major.parse(), minor.parse()) {
                    (Ok(major), Ok(minor)) => Statement::Version { major, minor },
                    _ => {
                        return Err(Error::new(
                            ErrorKind::Parse,
                            ErrorCode::ExpectedNumber,
                            Some(format!("VERSION: bad version '{version}'")),
                        ));
                    }
                }
            }
            StatementKind::Simulation => Statement::Simulation {
                start: args.sim_value("start time")?,
                stop: args.sim_value("stop time")?,
                step: args.sim_value("time step")?,
            },
            StatementKind::Tolerances => Statement::Tolerances {
                integration: args.number("integration tolerance")?,
                convergence: args.number("convergence tolerance")?,
            },
            StatementKind::Limits => {
                let max_iterations = args.number("max iterations")?;
                let max_warnings = args.number("max warnings")?;
                let trace_limit = args.optional_number("trace limit")?;
                Statement::limits(max_iterations, max_warnings, trace_limit)
            }
            StatementKind::Dfq => Statement::Dfq(args.number("method")?),
            StatementKind::NanCheck => Statement::NanCheck(args.number::<i32>("flag")? != 0),
            StatementKind::OverwriteCheck => {
                Statement::OverwriteCheck(args.number::<i32>("flag")? != 0)
            }
            StatementKind::TimeReport => Statement::TimeReport(args.number::<i32>("flag")? != 0),
            StatementKind::Width => Statement::Width(args.number("width")?),
            StatementKind::NoCheck => {
                let n: usize = args.number("count")?;
                let mut pairs = Vec::with_capacity(n);
                for _ in 0..n {
                    let unit = args.number("unit")?;
                    let input: usize = args.number("input")?;
                    if input == 0 {
                        return Err(bad_statement("NOCHECK: inputs are numbered from 1".to_owned()));
                    }
                    pairs.push((unit, input - 1));
                }
                Statement::NoCheck(pairs)
            }
            StatementKind::NoList => Statement::NoList,
            StatementKind::List => Statement::List,
            StatementKind::Map => Statement::Map,
            StatementKind::Solver => match args.number::<u8>("method")? {
                0 => Statement::Solver(SolverMethod::SuccessiveSubstitution {
                    rf_min: args.optional_number("min relaxation")?.unwrap_or(1.0),
                    rf_max: args.optional_number("max relaxation")?.unwrap_or(1.0),
                }),
                1 => Statement::Solver(SolverMethod::Powell),
                k => return Err(bad_statement(format!("SOLVER {k}: must be 0 or 1"))),
            },
            StatementKind::EqSolver => Statement::EqSolver(args.number("method")?),
            StatementKind::End => Statement::End,
        };
        args.finish()?;
        statement.validate()?;

        Ok(statement)
    }
}

/// VERSION and SIMULATION with TRNSYS defaults.
pub fn basic_template() -> Vec<Statement> {
    vec![
        Statement::version(18, 0),
        Statement::simulation(0.0, 8760.0, 1.0),
    ]
}

/// [`basic_template`] plus the statements useful while debugging a deck.
pub fn debug_template() -> Vec<Statement> {
    let mut statements = basic_template();
    statements.push(Statement::Map);
    statements.push(Statement::NanCheck(true));
    statements.push(Statement::OverwriteCheck(true));
    statements
}
