//! Replay scenario runner CLI
//!
//! Usage:
//!   cargo run --bin replay-tests                      # Run all scenarios
//!   cargo run --bin replay-tests -- blocks/           # Run a category
//!   cargo run --bin replay-tests -- movement/example  # Run matching scenarios
//!   cargo run --bin replay-tests -- --headed          # Headed backend
//!   cargo run --bin replay-tests -- --parallel        # One harness per scenario, concurrently
//!   cargo run --bin replay-tests -- --settings FILE   # Harness settings JSON
//!   cargo run --bin replay-tests -- --verbose         # Full failure details
//!
//! Logging follows RUST_LOG (default: warn).

use rayon::prelude::*;
use std::env;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use blockreplay::harness::HarnessConfig;
use blockreplay::recording::DirectoryLibrary;
use blockreplay::scenarios::{self, ScenarioContext, ScenarioDef, ScenarioResult};
use blockreplay::simulation::ReplayHostBuilder;

struct Args {
    filter: Option<String>,
    headed: bool,
    verbose: bool,
    parallel: bool,
    settings: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Args {
            filter: None,
            headed: false,
            verbose: false,
            parallel: false,
            settings: None,
        };

        let mut iter = env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--headed" => args.headed = true,
                "--verbose" | "-v" => args.verbose = true,
                "--parallel" => args.parallel = true,
                "--settings" => match iter.next() {
                    Some(path) => args.settings = Some(path),
                    None => {
                        eprintln!("--settings needs a file path");
                        process::exit(2);
                    }
                },
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    process::exit(2);
                }
                other => args.filter = Some(other.to_string()),
            }
        }
        args
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.settings {
        Some(path) => match HarnessConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(2);
            }
        },
        None => HarnessConfig::from_config_files(),
    }
    .with_headed_flag(args.headed);

    println!("Replay Tests");
    println!("============\n");

    if !config.recordings_dir.is_dir() {
        println!(
            "No recordings directory found at {}",
            config.recordings_dir.display()
        );
        process::exit(1);
    }

    let scenarios = scenarios::matching(args.filter.as_deref());
    if scenarios.is_empty() {
        println!("No scenarios matched.");
        if let Some(f) = &args.filter {
            println!("Filter: {}", f);
        }
        process::exit(1);
    }

    let mut builder = ReplayHostBuilder::new();
    if args.parallel {
        builder = builder.with_minimal_threads();
    }
    let library = Arc::new(DirectoryLibrary::new(config.recordings_dir.clone()));
    let ctx = ScenarioContext::new(library, config).with_builder(builder);

    let started = Instant::now();
    let results: Vec<(ScenarioDef, ScenarioResult)> = if args.parallel {
        scenarios
            .par_iter()
            .map(|def| (*def, scenarios::run_scenario(def, &ctx)))
            .collect()
    } else {
        scenarios
            .iter()
            .map(|def| (*def, scenarios::run_scenario(def, &ctx)))
            .collect()
    };

    let mut passed = 0;
    let mut failed = 0;
    let mut errors = 0;
    let mut current_category = "";

    for (def, result) in &results {
        let category = def.category();
        if category != current_category {
            if !current_category.is_empty() {
                println!();
            }
            println!("{}/", category);
            current_category = category;
        }

        match result {
            ScenarioResult::Pass { .. } => passed += 1,
            ScenarioResult::Fail { .. } => failed += 1,
            ScenarioResult::Error { .. } => errors += 1,
        }
        print_result(def.name(), result, args.verbose);
    }

    println!("\n============");
    println!(
        "Results: {} passed, {} failed, {} errors ({:.1}s)",
        passed,
        failed,
        errors,
        started.elapsed().as_secs_f32()
    );

    if failed > 0 || errors > 0 {
        process::exit(1);
    }
}

fn print_result(name: &str, result: &ScenarioResult, verbose: bool) {
    let dots = ".".repeat(40 - name.len().min(39));

    match result {
        ScenarioResult::Pass { report } => {
            println!("  {} {} PASS ({} ticks)", name, dots, report.ticks);
            if verbose {
                println!("    {}", report);
            }
        }
        ScenarioResult::Fail { error } => {
            println!("  {} {} FAIL", name, dots);
            if verbose {
                println!("    {:?}", error);
            } else {
                println!("    {}", error);
            }
        }
        ScenarioResult::Error { error } => {
            println!("  {} {} ERROR", name, dots);
            println!("    {}", error);
        }
    }
}
