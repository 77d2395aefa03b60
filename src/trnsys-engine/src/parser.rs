// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Reads the parts of a deck that are not tied to a proforma: control
//! cards and equation blocks.  Component blocks are skipped, since their
//! layout can only be interpreted with the matching proforma at hand.

use std::iter::Enumerate;
use std::str::Lines;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::common::{Error, ErrorKind, Result};
use crate::equation::{BlockKind, Equation, EquationBlock};
use crate::parse_err;
use crate::statement::{Statement, StatementKind};

lazy_static! {
    static ref BLOCK_NAME_RE: Regex =
        Regex::new(r#"^\*\s*(?i:EQUATIONS|CONSTANTS)\s+"([^"]*)""#).unwrap();
}

/// Statements and equation blocks found in deck text, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragments {
    pub statements: Vec<Statement>,
    pub equation_blocks: Vec<EquationBlock>,
}

struct Cursor<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor {
            lines: text.lines().enumerate(),
        }
    }

    /// Next line with its 1-based line number, trimmed.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        self.lines.next().map(|(i, line)| (i + 1, line.trim()))
    }

    /// Next line that is neither blank nor a comment.
    fn next_code(&mut self) -> Option<(usize, &'a str)> {
        while let Some((line_no, line)) = self.next_line() {
            if !line.is_empty() && !line.starts_with('*') {
                return Some((line_no, line));
            }
        }
        None
    }
}

fn at_line(line_no: usize, err: Error) -> Error {
    let details = err.get_details().unwrap_or_default();
    Error::new(
        ErrorKind::Parse,
        err.code,
        Some(format!("line {line_no}: {details}")),
    )
}

fn strip_annotation(line: &str) -> &str {
    match line.find('!') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    strip_annotation(line)
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

pub fn read_fragments(text: &str) -> Result<Fragments> {
    let mut fragments = Fragments::default();
    let mut cursor = Cursor::new(text);
    let mut block_name: Option<String> = None;
    let mut in_unit = false;

    while let Some((line_no, line)) = cursor.next_line() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with('*') {
            if let Some(caps) = BLOCK_NAME_RE.captures(line) {
                block_name = Some(caps[1].to_owned());
            }
            continue;
        }

        let Some(keyword) = tokens(line).next() else {
            continue;
        };

        if keyword.eq_ignore_ascii_case("UNIT") {
            in_unit = true;
            continue;
        }

        if let Some(kind) = BlockKind::from_keyword(keyword) {
            in_unit = false;
            let name = block_name
                .take()
                .unwrap_or_else(|| format!("Block {}", fragments.equation_blocks.len() + 1));
            let block = read_block(&mut cursor, line_no, line, &name, kind)?;
            fragments.equation_blocks.push(block);
            continue;
        }

        if let Some(kind) = StatementKind::from_keyword(keyword) {
            if kind == StatementKind::End {
                break;
            }
            in_unit = false;
            block_name = None;
            let statement = if kind == StatementKind::NoCheck {
                read_nocheck(&mut cursor, line_no, line)?
            } else {
                line.parse().map_err(|err| at_line(line_no, err))?
            };
            fragments.statements.push(statement);
            continue;
        }

        if !in_unit {
            debug!(line = line_no, text = line, "skipping unrecognised line");
        }
    }

    Ok(fragments)
}

fn read_block(
    cursor: &mut Cursor,
    line_no: usize,
    line: &str,
    name: &str,
    kind: BlockKind,
) -> Result<EquationBlock> {
    let count = tokens(line).nth(1).unwrap_or("");
    let Ok(count) = count.parse::<usize>() else {
        return parse_err!(
            ExpectedNumber,
            line_no,
            format!("{}: expected a count, got '{count}'", kind.keyword())
        );
    };

    let mut block = EquationBlock::new(name, kind);
    for _ in 0..count {
        let Some((eqn_line, text)) = cursor.next_code() else {
            return parse_err!(
                UnexpectedEof,
                line_no,
                format!(
                    "{} {count}: input ended after {} equations",
                    kind.keyword(),
                    block.len()
                )
            );
        };
        let eqn: Equation = text.parse().map_err(|err| at_line(eqn_line, err))?;
        block.push(eqn).map_err(|err| at_line(eqn_line, err))?;
    }
    Ok(block)
}

/// NOCHECK pairs may continue on the lines after the count.
fn read_nocheck(cursor: &mut Cursor, line_no: usize, line: &str) -> Result<Statement> {
    let first: Vec<&str> = tokens(line).collect();
    let wanted = match first.get(1).and_then(|n| n.parse::<usize>().ok()) {
        Some(n) => 2 * n,
        None => return line.parse().map_err(|err| at_line(line_no, err)),
    };

    let mut text = first.join(" ");
    let mut have = first.len() - 2;
    while have < wanted {
        let Some((_, more)) = cursor.next_code() else {
            return parse_err!(
                UnexpectedEof,
                line_no,
                format!("NOCHECK: expected {wanted} numbers, found {have}")
            );
        };
        for tok in tokens(more) {
            text.push(' ');
            text.push_str(tok);
            have += 1;
        }
    }

    text.parse().map_err(|err| at_line(line_no, err))
}
