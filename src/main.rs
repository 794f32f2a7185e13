use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rlox::ast::Stmt;
use rlox::ast_printer::AstPrinter;
use rlox::lox::{self, Lox, EXIT_STATIC_ERROR, EXIT_USAGE};
use rlox::parser::Parser;
use rlox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses a program and prints the AST of every expression statement
    Parse {
        filename: PathBuf,

        /// Print the whole statement list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Runs a Lox script, or starts a REPL when no file is given
    Run { filename: Option<PathBuf> },
}

/// Maps a script into memory and checks that it is UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    // SAFETY: the mapping is read-only and dropped before this function returns;
    // the script is not expected to be modified while we copy it out.
    let mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&mmap)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),

            Ok(token) => println!("{}", token),

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        std::process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source = read_source(filename)?;
    let (tokens, scan_errors) = Scanner::new(&source).scan_all();

    if !scan_errors.is_empty() {
        lox::report(&scan_errors);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            lox::report(&errors);
            std::process::exit(EXIT_STATIC_ERROR);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
        return Ok(());
    }

    let printer = AstPrinter;
    for stmt in &statements {
        if let Stmt::Expression(expr) | Stmt::Print(expr) = stmt {
            println!("{}", printer.print(expr));
        }
    }

    Ok(())
}

fn run(filename: Option<PathBuf>) -> Result<()> {
    let mut session = Lox::new();

    let Some(filename) = filename else {
        info!("No script given; starting REPL");
        session
            .run_prompt(io::stdin().lock(), io::stdout())
            .context("REPL I/O failed")?;
        return Ok(());
    };

    let source = read_source(&filename)?;

    let code = session.run_file(&source);
    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    info!("Program executed successfully");

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            e.print()?;
            std::process::exit(EXIT_USAGE);
        }
        // --help / --version
        Err(e) => e.exit(),
    };

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),
        Commands::Parse { filename, json } => parse(&filename, json),
        Commands::Run { filename } => run(filename),
    }
}
