//! Session driver: source text in, side effects and diagnostics out.
//!
//! One [`Lox`] owns one [`Interpreter`], so globals survive between calls to
//! [`Lox::run`]; the REPL relies on this.

use std::io::{BufRead, Write};

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Exit status for command-line usage errors.
pub const EXIT_USAGE: i32 = 64;
/// Exit status for static (lex/parse/resolve) errors.
pub const EXIT_STATIC_ERROR: i32 = 65;
/// Exit status for runtime errors.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

pub struct Lox {
    interpreter: Interpreter,
    had_error: bool,
    had_runtime_error: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Lox {
            interpreter,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Process exit status matching the flags raised so far.
    pub fn exit_code(&self) -> i32 {
        if self.had_error {
            EXIT_STATIC_ERROR
        } else if self.had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }

    /// Scan, parse, resolve and interpret `source`.
    ///
    /// Static errors from every phase that ran are returned together and
    /// nothing is executed; otherwise a runtime error (if any) is returned
    /// alone. The matching flag is raised either way.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        info!("Running {} bytes of source", source.len());

        let (tokens, mut errors) = Scanner::new(source).scan_all();

        let statements = match Parser::new(tokens).parse() {
            Ok(statements) => statements,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(self.static_failure(errors));
            }
        };

        if !errors.is_empty() {
            return Err(self.static_failure(errors));
        }

        let (locals, resolve_errors) = Resolver::new().resolve(&statements);

        if !resolve_errors.is_empty() {
            return Err(self.static_failure(resolve_errors));
        }

        self.interpreter.interpret(&statements, locals).map_err(|e| {
            debug!("Runtime failure: {}", e);
            self.had_runtime_error = true;
            vec![e]
        })
    }

    /// Script mode: run `source` once, report any diagnostics to stderr and
    /// return the process exit status.
    pub fn run_file(&mut self, source: &str) -> i32 {
        if let Err(errors) = self.run(source) {
            report(&errors);
        }

        self.exit_code()
    }

    /// Interactive loop: one line at a time until `input` is exhausted.
    /// Errors go to stderr; a bad line does not end the session.
    pub fn run_prompt<R: BufRead, W: Write>(&mut self, input: R, mut prompt: W) -> std::io::Result<()> {
        info!("Starting REPL");

        write!(prompt, "> ")?;
        prompt.flush()?;

        for line in input.lines() {
            let line = line?;

            if let Err(errors) = self.run(&line) {
                report(&errors);
            }

            self.had_error = false;
            self.had_runtime_error = false;

            write!(prompt, "> ")?;
            prompt.flush()?;
        }

        writeln!(prompt)?;

        Ok(())
    }

    fn static_failure(&mut self, errors: Vec<LoxError>) -> Vec<LoxError> {
        debug!("{} static error(s); not executing", errors.len());
        self.had_error = true;
        errors
    }
}

/// Print every diagnostic to stderr.
pub fn report(errors: &[LoxError]) {
    for error in errors {
        eprintln!("{}", error);
    }
}
