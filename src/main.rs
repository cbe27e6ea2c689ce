//! Runs a Scheme program and prints the value of each top-level expression.

use anyhow::{bail, Context, Result};
use clap::Parser;
use schemer::{eval, Env, Reader, Value};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};
use tracing::{debug, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "schemer", version, about = "Evaluate a Scheme program")]
struct Args {
    /// Program to run; standard input when omitted
    file: Option<PathBuf>,

    /// Evaluate SOURCE instead of a file
    #[arg(short, long, value_name = "SOURCE", conflicts_with = "file")]
    expr: Option<String>,

    /// Do not print results
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter(
            &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ))
        .init();

    let args = Args::parse();
    let source = load(&args)?;

    run(&source, args.quiet)
}

/// `directives` in `RUST_LOG` syntax; `warn` when there are none.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

fn load(args: &Args) -> Result<String> {
    if let Some(expr) = &args.expr {
        return Ok(expr.clone());
    }

    match &args.file {
        Some(path) => {
            debug!("Loading program: {}", path.display());
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read program: {}", path.display()))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read program from stdin")?;
            Ok(source)
        }
    }
}

fn run(source: &str, quiet: bool) -> Result<()> {
    let env = Env::new().make();
    let mut reader = Reader::new(source);
    let mut count = 0;

    loop {
        let form = reader.read();
        if form.is_eof() {
            info!("Evaluated {} expressions", count);
            return Ok(());
        }
        count += 1;

        match eval(form, &env) {
            Value::Error(err) => bail!("{}", err),
            Value::Unspecified => (),
            value => {
                if !quiet {
                    println!("{}", value);
                }
            }
        }
    }
}
