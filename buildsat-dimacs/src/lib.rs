//! DIMACS CNF parser and writer for the buildsat SAT solver.
//!
//! Besides plain DIMACS CNF this parser understands the two comment directives used by the
//! build-selection workflow: `c d <k>` followed by `k` signed integers names the dead variable
//! set, `c v <k>` followed by `k` signed literals names the user supplied assignment. Directive
//! values may continue across following comment lines.

use std::{
    borrow::Borrow,
    io,
    mem::{replace, take},
};

use buildsat_formula::{CnfFormula, Lit, Var};

use anyhow::Error;
use thiserror::Error;

/// Possible errors while parsing a DIMACS CNF formula.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(
        "line {}: Unexpected character in DIMACS CNF input: '{}'",
        line,
        unexpected
    )]
    UnexpectedInput { line: usize, unexpected: char },
    #[error(
        "line {}: Literal index is too large: {}{}...",
        line,
        index,
        final_digit
    )]
    LiteralTooLarge {
        line: usize,
        index: usize,
        final_digit: usize,
    },
    #[error("line {}: Invalid header syntax: {}", line, header)]
    InvalidHeader { line: usize, header: String },
    #[error("line {}: Unterminated clause", line)]
    UnterminatedClause { line: usize },
    #[error("line {}: Invalid value in '{}' directive: {}", line, directive, value)]
    InvalidDirective {
        line: usize,
        directive: char,
        value: String,
    },
    #[error("line {}: Repeated '{}' directive", line, directive)]
    RepeatedDirective { line: usize, directive: char },
    #[error("'{}' directive is missing {} of its values", directive, missing)]
    UnterminatedDirective { directive: char, missing: usize },
    #[error(
        "Formula has {} variables while the header specifies {} variables",
        var_count,
        header_var_count
    )]
    VarCount {
        var_count: usize,
        header_var_count: usize,
    },
    #[error(
        "Formula has {} clauses while the header specifies {} clauses",
        clause_count,
        header_clause_count
    )]
    ClauseCount {
        clause_count: usize,
        header_clause_count: usize,
    },
    #[error("Parser invoked after a previous error")]
    PreviousError,
}

/// Variable and clause count present in a DIMACS CNF header.
#[derive(Copy, Clone, Debug)]
pub struct DimacsHeader {
    pub var_count: usize,
    pub clause_count: usize,
}

/// Evaluation directives embedded in DIMACS comments.
///
/// The literals are stored exactly as written; interpreting the dead variables as forced-false is
/// left to the solver.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct EvalDirectives {
    /// Values of the `c d` directive.
    pub dead_vars: Vec<Lit>,
    /// Values of the `c v` directive.
    pub assignment: Vec<Lit>,
}

/// A directive whose value list is still incomplete.
#[derive(Copy, Clone)]
struct PendingDirective {
    directive: char,
    missing: usize,
}

/// Parser for DIMACS CNF files.
///
/// This parser can consume the input in chunks while also producing the parsed result in chunks.
#[derive(Default)]
pub struct DimacsParser {
    formula: CnfFormula,
    partial_clause: Vec<Lit>,
    header: Option<DimacsHeader>,
    directives: EvalDirectives,
    pending_directive: Option<PendingDirective>,
    dead_seen: bool,
    assignment_seen: bool,

    line_number: usize,
    clause_count: usize,
    partial_lit: usize,
    negate_next_lit: bool,

    in_lit: bool,
    in_comment: bool,
    in_header: bool,
    start_of_line: bool,
    error: bool,

    header_line: Vec<u8>,
    comment_line: Vec<u8>,
}

impl DimacsParser {
    /// Create a new DIMACS CNF parser.
    pub fn new() -> DimacsParser {
        DimacsParser {
            line_number: 1,
            start_of_line: true,
            ..DimacsParser::default()
        }
    }

    /// Parse the given input and check the header if present.
    ///
    /// This parses the whole input into a single [`CnfFormula`]. Incremental parsing is possible
    /// using [`parse_incremental`](DimacsParser::parse_incremental) or the
    /// [`parse_chunk`](DimacsParser::parse_chunk) method.
    pub fn parse(input: impl io::Read) -> Result<CnfFormula, Error> {
        Ok(Self::parse_incremental(input, |_| Ok(()))?.take_formula())
    }

    /// Parse the given input incrementally and check the header if present.
    ///
    /// The callback is invoked after each consumed chunk with a reference to the parser, so the
    /// formula can be processed incrementally via
    /// [`take_formula`](DimacsParser::take_formula).
    pub fn parse_incremental(
        input: impl io::Read,
        mut callback: impl FnMut(&mut DimacsParser) -> Result<(), Error>,
    ) -> Result<DimacsParser, Error> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = Self::new();

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            callback(&mut parser)?;
        }
        parser.eof()?;
        callback(&mut parser)?;
        parser.check_header()?;

        Ok(parser)
    }

    /// Parse a chunk of input.
    ///
    /// After parsing the last chunk call the [`eof`](DimacsParser::eof) method.
    ///
    /// If this method returns an error, the parser is in an invalid state and cannot parse
    /// further chunks.
    pub fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), ParserError> {
        if self.error {
            return Err(ParserError::PreviousError);
        }
        for &byte in chunk.iter() {
            match byte {
                b'\n' | b'\r' if self.in_comment || self.in_header => {
                    if self.in_header {
                        self.in_header = false;
                        self.parse_header_line()?;
                    } else {
                        self.in_comment = false;
                        self.parse_comment_line()?;
                    }
                    self.start_of_line = true
                }
                _ if self.in_comment => self.comment_line.push(byte),
                _ if self.in_header => self.header_line.push(byte),
                b'0'..=b'9' => {
                    self.in_lit = true;
                    let digit = (byte - b'0') as usize;

                    const CAN_OVERFLOW: usize = Var::max_count() / 10;
                    const OVERFLOW_DIGIT: usize = Var::max_count() % 10;

                    // Overflow check that is fast but still works if LitIdx has the same size as
                    // usize
                    if CAN_OVERFLOW <= self.partial_lit {
                        let carry = (digit <= OVERFLOW_DIGIT) as usize;

                        if CAN_OVERFLOW + carry <= self.partial_lit {
                            self.error = true;
                            return Err(ParserError::LiteralTooLarge {
                                line: self.line_number,
                                index: self.partial_lit,
                                final_digit: digit,
                            });
                        }
                    }

                    self.partial_lit = self.partial_lit * 10 + digit;

                    self.start_of_line = false
                }
                b'-' if !self.negate_next_lit && !self.in_lit => {
                    self.negate_next_lit = true;
                    self.start_of_line = false
                }
                b' ' | b'\n' | b'\r' if !self.negate_next_lit || self.in_lit => {
                    self.finish_literal();
                    self.negate_next_lit = false;
                    self.in_lit = false;
                    self.partial_lit = 0;
                    self.start_of_line = byte != b' ';
                }
                b'c' if self.start_of_line => {
                    self.in_comment = true;
                    self.comment_line.clear();
                }
                b'p' if self.start_of_line && self.header.is_none() => {
                    self.in_header = true;
                    self.header_line.push(b'p');
                }
                _ => {
                    self.error = true;
                    return Err(ParserError::UnexpectedInput {
                        line: self.line_number,
                        unexpected: byte as char,
                    });
                }
            }
            if byte == b'\n' {
                self.line_number += 1;
            }
        }

        Ok(())
    }

    /// Finish parsing the input.
    ///
    /// This does not check whether the header information was correct, call
    /// [`check_header`](DimacsParser::check_header) for this.
    pub fn eof(&mut self) -> Result<(), ParserError> {
        if self.in_header {
            self.in_header = false;
            self.parse_header_line()?;
        }
        if self.in_comment {
            self.in_comment = false;
            self.parse_comment_line()?;
        }

        if let Some(pending) = self.pending_directive {
            self.error = true;
            return Err(ParserError::UnterminatedDirective {
                directive: pending.directive,
                missing: pending.missing,
            });
        }

        self.finish_literal();

        if !self.partial_clause.is_empty() {
            return Err(ParserError::UnterminatedClause {
                line: self.line_number,
            });
        }

        Ok(())
    }

    /// Verifies the header information when present.
    ///
    /// Does nothing when the input doesn't contain a header.
    pub fn check_header(&self) -> Result<(), ParserError> {
        if let Some(header) = self.header {
            let var_count = self.formula.var_count();
            if var_count != header.var_count {
                return Err(ParserError::VarCount {
                    var_count,
                    header_var_count: header.var_count,
                });
            }

            if self.clause_count != header.clause_count {
                return Err(ParserError::ClauseCount {
                    clause_count: self.clause_count,
                    header_clause_count: header.clause_count,
                });
            }
        }

        Ok(())
    }

    /// Returns the subformula of everything parsed since the last call to this method.
    ///
    /// The variable count of the returned formula is the maximum of the variable count so far and
    /// the header variable count if a header is present.
    pub fn take_formula(&mut self) -> CnfFormula {
        let mut new_formula = CnfFormula::new();
        new_formula.set_var_count(self.formula.var_count());
        replace(&mut self.formula, new_formula)
    }

    /// Returns the evaluation directives parsed so far, leaving empty directives behind.
    pub fn take_directives(&mut self) -> EvalDirectives {
        take(&mut self.directives)
    }

    /// The evaluation directives parsed so far.
    pub fn directives(&self) -> &EvalDirectives {
        &self.directives
    }

    /// Return the DIMACS CNF header data if present.
    pub fn header(&self) -> Option<DimacsHeader> {
        self.header
    }

    /// Number of clauses parsed.
    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    /// Number of variables in the parsed formula.
    pub fn var_count(&self) -> usize {
        self.formula.var_count()
    }

    fn finish_literal(&mut self) {
        if self.in_lit {
            if self.partial_lit == 0 {
                self.formula.add_clause(&self.partial_clause);
                self.partial_clause.clear();
                self.clause_count += 1;
            } else {
                self.partial_clause
                    .push(Var::from_dimacs(self.partial_lit as isize).lit(!self.negate_next_lit));
            }
        }
    }

    fn parse_header_line(&mut self) -> Result<(), ParserError> {
        let header_line = String::from_utf8_lossy(&self.header_line).into_owned();

        if !header_line.starts_with("p ") {
            return self.invalid_header(header_line);
        }

        let mut header_values = header_line[2..].split_whitespace();

        if header_values.next() != Some("cnf") {
            return self.invalid_header(header_line);
        }

        let var_count: usize = match header_values.next().and_then(|value| str::parse(value).ok())
        {
            None => return self.invalid_header(header_line),
            Some(value) => value,
        };

        if var_count > Var::max_count() {
            self.error = true;
            return Err(ParserError::LiteralTooLarge {
                line: self.line_number,
                index: var_count / 10,
                final_digit: var_count % 10,
            });
        }

        let clause_count: usize = match header_values.next().and_then(|value| str::parse(value).ok())
        {
            None => return self.invalid_header(header_line),
            Some(value) => value,
        };

        if header_values.next().is_some() {
            return self.invalid_header(header_line);
        }

        self.header = Some(DimacsHeader {
            var_count,
            clause_count,
        });

        self.formula.set_var_count(var_count);

        Ok(())
    }

    fn invalid_header(&mut self, header_line: String) -> Result<(), ParserError> {
        self.error = true;
        Err(ParserError::InvalidHeader {
            line: self.line_number,
            header: header_line,
        })
    }

    fn parse_comment_line(&mut self) -> Result<(), ParserError> {
        let comment_line = String::from_utf8_lossy(&self.comment_line).into_owned();
        self.comment_line.clear();

        let mut tokens = comment_line.split_whitespace();

        if self.pending_directive.is_none() {
            let directive = match tokens.next() {
                Some("d") => 'd',
                Some("v") => 'v',
                _ => return Ok(()),
            };

            let seen = match directive {
                'd' => &mut self.dead_seen,
                _ => &mut self.assignment_seen,
            };
            if replace(seen, true) {
                self.error = true;
                return Err(ParserError::RepeatedDirective {
                    line: self.line_number,
                    directive,
                });
            }

            let missing = match tokens.next().and_then(|value| str::parse(value).ok()) {
                Some(count) => count,
                None => return self.invalid_directive(directive, &comment_line),
            };

            self.pending_directive = Some(PendingDirective { directive, missing });
        }

        while let Some(pending) = &mut self.pending_directive {
            if pending.missing == 0 {
                self.pending_directive = None;
                break;
            }
            let token = match tokens.next() {
                // The remaining values continue on a following comment line.
                None => break,
                Some(token) => token,
            };
            let value: isize = match str::parse(token) {
                Ok(value) => value,
                Err(_) => {
                    let directive = pending.directive;
                    return self.invalid_directive(directive, token);
                }
            };
            if value == 0 || value.unsigned_abs() > Var::max_count() {
                let directive = pending.directive;
                return self.invalid_directive(directive, token);
            }
            let target = match pending.directive {
                'd' => &mut self.directives.dead_vars,
                _ => &mut self.directives.assignment,
            };
            target.push(Lit::from_dimacs(value));
            pending.missing -= 1;
        }

        Ok(())
    }

    fn invalid_directive(&mut self, directive: char, value: &str) -> Result<(), ParserError> {
        self.error = true;
        Err(ParserError::InvalidDirective {
            line: self.line_number,
            directive,
            value: value.to_owned(),
        })
    }
}

/// Write a DIMACS CNF header.
///
/// Can be used with [`write_dimacs_clauses`] to implement incremental writing.
pub fn write_dimacs_header(target: &mut impl io::Write, header: DimacsHeader) -> io::Result<()> {
    writeln!(
        target,
        "p cnf {var_count} {clause_count}",
        var_count = header.var_count,
        clause_count = header.clause_count
    )
}

/// Write an iterator of clauses as headerless DIMACS CNF.
///
/// Can be used with [`write_dimacs_header`] to implement incremental writing.
pub fn write_dimacs_clauses(
    target: &mut impl io::Write,
    clauses: impl IntoIterator<Item = impl IntoIterator<Item = impl Borrow<Lit>>>,
) -> io::Result<()> {
    for clause in clauses.into_iter() {
        for lit in clause.into_iter() {
            itoa::write(&mut *target, lit.borrow().to_dimacs())?;
            target.write_all(b" ")?;
        }
        target.write_all(b"0\n")?;
    }
    Ok(())
}

/// Write a formula as DIMACS CNF.
///
/// Use [`write_dimacs_header`] and [`write_dimacs_clauses`] to implement incremental writing.
pub fn write_dimacs(target: &mut impl io::Write, formula: &CnfFormula) -> io::Result<()> {
    write_dimacs_header(
        &mut *target,
        DimacsHeader {
            var_count: formula.var_count(),
            clause_count: formula.len(),
        },
    )?;
    write_dimacs_clauses(&mut *target, formula.iter())
}
