//! adlc - CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use adlc::frontend::core::lexer::render_tokens;
use adlc::frontend::Compiler;
use adlc::middle::render_listing;
use adlc::util::config::{load_config, DEFAULT_CONFIG_FILE};
use adlc::util::logger;
use adlc::{NAME, VERSION};

/// Front-end compiler for the analysis description language
#[derive(Parser, Debug)]
#[command(name = "adlc")]
#[command(author = "ADL Compiler Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the token stream of a file
    Lex {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Check that a file parses
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the syntax tree in Graphviz dot format
        #[arg(long)]
        dot: bool,
    },

    /// Lower a file and print the instruction stream
    Ir {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Listing)]
        format: Format,
    },

    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Listing,
    Json,
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read file: {}", file.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    if args.verbose {
        logger::init_debug();
        eprintln!("adlc version: {}", VERSION);
    } else {
        logger::init_with_level(config.log_level);
    }
    let compiler = Compiler::with_config(&config);

    match args.command {
        Commands::Lex { file } => {
            let source = read_source(&file)?;
            let tokens = compiler
                .tokenize(&source)
                .with_context(|| format!("Failed to lex: {}", file.display()))?;
            print!("{}", render_tokens(&tokens));
        }
        Commands::Parse { file, dot } => {
            let source = read_source(&file)?;
            let ast = compiler
                .parse(&source)
                .with_context(|| format!("Failed to parse: {}", file.display()))?;
            if dot {
                print!("{}", ast.to_dot());
            } else {
                eprintln!("Parsed {} blocks", ast.children(ast.root()).len());
            }
        }
        Commands::Ir { file, format } => {
            let source = read_source(&file)?;
            let stream = compiler
                .compile(&source)
                .with_context(|| format!("Failed to compile: {}", file.display()))?;
            match format {
                Format::Listing => print!("{}", render_listing(&stream)),
                Format::Json => println!("{}", stream.to_json()?),
            }
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
