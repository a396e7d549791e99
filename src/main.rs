extern crate yaml_rust;
extern crate clap;
#[macro_use]
extern crate error_chain;
extern crate diffy;
extern crate regex;
extern crate serde;

mod canonical;
mod configdiff;
mod differ;
mod error;
mod filter;
mod keypath;
mod lint;
mod loader;
mod value;

use clap::Parser;
use std::process::exit;
use tracing_subscriber::EnvFilter;
use configdiff::{ComparisonResult,Opts,report_error,run_comparison};
use lint::ExternalLinter;

const NO_DIFFERENCES: &str = "No differences found between the configurations.";

/** Log to stderr; `-v` flags win over RUST_LOG, which wins over `info` */
fn init_logging(verbose: u64) -> std::result::Result<(),Box<dyn std::error::Error + Send + Sync>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

fn main() {
    let opts: Opts = Opts::parse();
    if let Err(e) = init_logging(opts.verbose) {
        eprintln!("configdiff: could not set up logging: {}",e);
        exit(1)
    }
    let request = match opts.request() {
        Ok(request) => request,
        Err(e) => {
            report_error(&e);
            exit(1)
        }
    };
    let validator = ExternalLinter::new(request.options().lint_timeout);
    match run_comparison(&request,&validator) {
        Some(ComparisonResult::Diff(text)) => print!("{}",text),
        Some(ComparisonResult::Json(text)) => println!("{}",text),
        Some(ComparisonResult::NoDifferences) => println!("{}",NO_DIFFERENCES),
        None => exit(1)
    }
}
