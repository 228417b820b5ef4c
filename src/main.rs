use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use qheal::lexer::Capture;
use qheal::output;
use qheal::query::{QueryLanguage, Sanitizer, build_query, parse_strict};
use qheal::utils::progress::batch_bar;
use qheal::utils::{SanitizerConfig, get_config_path};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Queries sanitized between progress updates in batch mode
const BATCH_CHUNK: usize = 256;

#[derive(Parser)]
#[command(name = "qheal")]
#[command(about = "Self-healing sanitizer for boolean search queries")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Query to sanitize (when no subcommand is given)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,

    /// Config file (default: $QHEAL_CONFIG, then config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the maximum number of lexer captures
    #[arg(long, global = true)]
    max_captures: Option<usize>,

    /// Override the maximum number of sanitize iterations
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a query and show the rewrite
    Sanitize {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,

        /// Also validate the result against the strict grammar
        #[arg(long)]
        check: bool,
    },
    /// List the lexer captures for a query
    Tokens {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,

        /// Include ignored input
        #[arg(short, long)]
        all: bool,

        /// Print captures as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the final token tree of a sanitized query
    Tree {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Validate a query against the strict grammar without repairing it
    Check {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Build an index query in one of the query languages
    Build {
        /// flex, full or simple
        #[arg(short, long, default_value = "flex")]
        language: QueryLanguage,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Sanitize one query per line of a file
    Batch {
        /// Input file
        file: PathBuf,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = resolve_config_path(cli.config.clone())?;
    let mut config = SanitizerConfig::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(max) = cli.max_captures {
        config.max_captures = max;
    }
    if let Some(max) = cli.max_iterations {
        config.max_iterations = max;
    }

    let color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Some(Commands::Config { init }) => show_config(&config, &config_path, init),
        command => {
            let sanitizer = Sanitizer::new(config).context("Invalid sanitizer configuration")?;
            run(&sanitizer, command, cli.query, color)
        }
    }
}

fn run(sanitizer: &Sanitizer, command: Option<Commands>, words: Vec<String>, color: bool) -> Result<()> {
    match command {
        Some(Commands::Sanitize { query, check }) => {
            let query = query.join(" ");
            let sanitized = sanitizer.sanitize(&query)?;
            let mut out = output::stdout(color);
            output::print_rewrite(&mut out, &query, &sanitized)?;
            if check {
                output::print_check(&mut out, &sanitized, &parse_strict(&sanitized))?;
            }
        }
        Some(Commands::Tokens { query, all, json }) => {
            let query = query.join(" ");
            let cursor = sanitizer.lex(&query)?;
            if json {
                let captures: Vec<&Capture> = cursor
                    .captures()
                    .iter()
                    .filter(|c| all || c.is_vital())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&captures)?);
            } else {
                output::print_captures(&mut output::stdout(color), cursor.captures(), all)?;
            }
        }
        Some(Commands::Tree { query }) => {
            let (_, root) = sanitizer.sanitize_tree(&query.join(" "))?;
            output::print_tree(&mut output::stdout(color), &root)?;
        }
        Some(Commands::Check { query }) => {
            let query = query.join(" ");
            let result = parse_strict(&query);
            output::print_check(&mut output::stdout(color), &query, &result)?;
            if result.is_err() {
                bail!("query does not match the strict grammar");
            }
        }
        Some(Commands::Build { language, query }) => {
            println!("{}", build_query(language, &query.join(" "), sanitizer)?);
        }
        Some(Commands::Batch { file, json, quiet }) => {
            run_batch(sanitizer, &file, json, quiet)?;
        }
        Some(Commands::Config { .. }) => bail!("config is handled without a sanitizer"),
        None => {
            if words.is_empty() {
                bail!("no query given (see --help)");
            }
            println!("{}", sanitizer.sanitize(&words.join(" "))?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("QHEAL_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    get_config_path().context("Could not determine config path")
}

fn show_config(config: &SanitizerConfig, path: &Path, init: bool) -> Result<()> {
    if init {
        config
            .save_to(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn run_batch(sanitizer: &Sanitizer, file: &Path, json: bool, quiet: bool) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let queries: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let bar = batch_bar(queries.len() as u64, quiet);
    let mut results = Vec::with_capacity(queries.len());
    for chunk in queries.chunks(BATCH_CHUNK) {
        results.extend(sanitizer.sanitize_batch(chunk));
        bar.inc(chunk.len() as u64);
    }
    bar.finish_and_clear();

    let mut failed = 0usize;
    for (query, result) in queries.iter().zip(results) {
        match (result, json) {
            (Ok(sanitized), true) => {
                println!("{}", serde_json::json!({ "query": query, "sanitized": sanitized }));
            }
            (Ok(sanitized), false) => println!("{sanitized}"),
            (Err(e), true) => {
                failed += 1;
                println!("{}", serde_json::json!({ "query": query, "error": e.to_string() }));
            }
            (Err(e), false) => {
                failed += 1;
                eprintln!("error: {query:?}: {e}");
            }
        }
    }

    if !quiet {
        eprintln!("Sanitized {} queries ({} failed)", queries.len(), failed);
    }
    Ok(())
}
