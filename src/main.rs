use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;

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
        filename: Option<PathBuf>,

        /// Print the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a program and prints each statement's AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session; state persists between lines
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with statement number and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print every error and return the exit code of the first one.
fn report(errors: &[LoxError]) -> i32 {
    for e in errors {
        debug!("Reporting: {}", e);
        eprintln!("{}", e);
    }

    errors.first().map_or(0, LoxError::exit_code)
}

fn no_input(subcommand: &str) -> ! {
    info!("No filepath provided for {}", subcommand);
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        debug!("REPL input: {}", line);

        // Errors end the line, not the session.
        if let Err(errors) = rox::run_source(&line, &mut interpreter) {
            report(&errors);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input("Tokenize");
            };

            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            let (tokens, errors) = rox::scan(&source);

            for e in &errors {
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }

            if json {
                let rendered =
                    serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
                println!("{}", rendered);
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input("Parse");
            };

            info!("Running Parse subcommand");
            let source = read_file(filename)?;
            let (tokens, mut errors) = rox::scan(&source);

            match Parser::new(&tokens).parse() {
                Ok(statements) if errors.is_empty() => {
                    for stmt in &statements {
                        let ast_str = AstPrinter::print_stmt(stmt);
                        debug!("AST: {}", ast_str);
                        println!("{}", ast_str);
                    }
                }
                Ok(_) => std::process::exit(report(&errors)),
                Err(parse_errors) => {
                    errors.extend(parse_errors);
                    std::process::exit(report(&errors));
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input("Evaluate");
            };

            info!("Running Evaluate subcommand");
            let source = read_file(filename)?;
            let (tokens, errors) = rox::scan(&source);

            if !errors.is_empty() {
                std::process::exit(report(&errors));
            }

            let expr = match Parser::new(&tokens).parse_expression() {
                Ok(expr) => expr,
                Err(e) => std::process::exit(report(&[e])),
            };

            info!("Expression parsed successfully");

            let locals = match Resolver::new().resolve_expression(&expr) {
                Ok(locals) => locals,
                Err(errors) => std::process::exit(report(&errors)),
            };

            let mut interpreter = Interpreter::new();
            interpreter.resolve(locals);

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }
                Err(e) => std::process::exit(report(&[LoxError::Runtime(e)])),
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input("Run");
            };

            info!("Running Run subcommand");
            let source = read_file(filename)?;
            info!("Provided input:\n {}", source);

            let mut interpreter = Interpreter::new();

            match rox::run_source(&source, &mut interpreter) {
                Ok(()) => info!("Program executed successfully"),
                Err(errors) => std::process::exit(report(&errors)),
            }
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}
