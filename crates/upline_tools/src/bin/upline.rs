#![forbid(unsafe_code)]

use std::env;

use tracing_subscriber::EnvFilter;
use upline_tools::ledger_cli::{execute_ledger_command, USAGE};

fn main() {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let subcommand = args.first().ok_or_else(|| USAGE.to_string())?.as_str();
    let mut json = false;
    for flag in &args[1..] {
        match flag.as_str() {
            "--json" => json = true,
            other => return Err(format!("unknown flag: {other}. {USAGE}")),
        }
    }
    let output = execute_ledger_command(subcommand, json)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
