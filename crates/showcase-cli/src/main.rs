// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::{Config, QuotaSource};
use runtime::StoreRuntime;
use showcase_app::{AppMode, AppState, StorageEstimator};
use showcase_db::{DiskEstimator, Store, StoreQuotaEstimator};
use showcase_tui::SessionOptions;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `showcase --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_file = config.log_file()?;
    let _log_guard = logging::init(config.log_level(), &log_file)
        .with_context(|| format!("start logging to {}", log_file.display()))?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or SHOWCASE_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }

    if let Some(target) = &options.export_json {
        let count = export_products(&store, target)?;
        println!("exported {count} products to {}", target.display());
        return Ok(());
    }

    let downloads_dir = config.downloads_dir()?;
    let estimator = build_estimator(
        config.quota_source(),
        config.quota_budget_bytes(),
        store.path(),
        &downloads_dir,
    );
    if options.check_only {
        return Ok(());
    }

    let read_only = options.read_only;
    let mut state = AppState {
        mode: if config.editable() && !read_only {
            AppMode::Edit
        } else {
            AppMode::Nav
        },
        read_only,
        ..AppState::default()
    };
    info!(
        db = %db_path.display(),
        read_only,
        quota = ?config.quota_source(),
        "starting session"
    );

    let mut runtime = StoreRuntime::new(&store, read_only);
    showcase_tui::run_app(
        &mut state,
        &mut runtime,
        SessionOptions {
            downloads_dir,
            estimator,
        },
    )
}

/// Picks the capacity source. An in-memory store has no file to measure, so the
/// store source is unavailable there.
fn build_estimator(
    source: QuotaSource,
    budget_bytes: u64,
    db_path: Option<&Path>,
    downloads_dir: &Path,
) -> Option<Box<dyn StorageEstimator>> {
    match source {
        QuotaSource::Off => None,
        QuotaSource::Store => db_path.map(|path| {
            Box::new(StoreQuotaEstimator::new(path, budget_bytes)) as Box<dyn StorageEstimator>
        }),
        QuotaSource::Disk => {
            let target = db_path.unwrap_or(downloads_dir);
            Some(Box::new(DiskEstimator::new(target)))
        }
    }
}

fn export_products(store: &Store, target: &Path) -> Result<usize> {
    let products = store.list_products()?;
    let json = serde_json::to_string_pretty(&products).context("serialize products")?;
    fs::write(target, json).with_context(|| format!("write {}", target.display()))?;
    Ok(products.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    export_json: Option<PathBuf>,
    read_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        export_json: None,
        read_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--export-json" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--export-json requires an output path"))?;
                options.export_json = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--read-only" => {
                options.read_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("showcase");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo products (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --export-json <path>     Write live products as JSON and exit");
    println!("  --read-only              Browse without edit mode");
    println!("  --help                   Show this help");
}
