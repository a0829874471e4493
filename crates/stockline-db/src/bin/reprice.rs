//! # Batch Re-pricing Tool
//!
//! Recomputes every product's sale price from its unit cost with a fixed
//! markup, or reports what that would change.
//!
//! ## Usage
//! ```bash
//! # Apply a 50% markup to every product (default)
//! cargo run -p stockline-db --bin reprice
//!
//! # Preview without writing
//! cargo run -p stockline-db --bin reprice -- --analyze --markup 40
//!
//! # List products whose markup is off by 0.1 points or more
//! cargo run -p stockline-db --bin reprice -- --verify --db ./data/stockline.db
//!
//! # Export every product to JSON and CSV in ./backups
//! cargo run -p stockline-db --bin reprice -- --backup ./backups
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use stockline_core::pricing::{MarkupCheck, RepriceAnalysis};
use stockline_core::DEFAULT_REPRICE_MARKUP_PCT;
use stockline_db::{Database, DbConfig, InventoryLedger, ProductBackup};
use tracing_subscriber::EnvFilter;

/// Markup deviation, in percentage points, still reported as correct.
const VERIFY_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Apply,
    Analyze,
    Verify,
    /// Target directory for the backup files.
    Backup(PathBuf),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut markup = DEFAULT_REPRICE_MARKUP_PCT;
    let mut db_path = String::from("./stockline.db");
    let mut mode = Mode::Apply;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--markup" | "-m" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--markup needs a percentage");
                };
                markup = value
                    .parse()
                    .with_context(|| format!("invalid markup '{value}'"))?;
                i += 1;
            }
            "--db" | "-d" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--db needs a path");
                };
                db_path = value.clone();
                i += 1;
            }
            "--analyze" | "-a" => mode = Mode::Analyze,
            "--verify" | "-v" => mode = Mode::Verify,
            "--backup" | "-b" => match args.get(i + 1).filter(|v| !v.starts_with('-')) {
                Some(dir) => {
                    mode = Mode::Backup(PathBuf::from(dir));
                    i += 1;
                }
                None => mode = Mode::Backup(PathBuf::from(".")),
            },
            "--help" | "-h" => {
                println!("Stockline batch re-pricing");
                println!();
                println!("Usage: reprice [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./stockline.db)");
                println!("  -m, --markup <PCT>   Markup over unit cost (default: {DEFAULT_REPRICE_MARKUP_PCT})");
                println!("  -a, --analyze        Show current vs new prices without writing");
                println!("  -v, --verify         Report products whose markup is off");
                println!("  -b, --backup [DIR]   Export all products to JSON and CSV (default: .)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
        i += 1;
    }

    println!("Database: {db_path}");
    println!("Markup:   {markup}%");
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    let ledger = InventoryLedger::new(db.clone());

    match mode {
        Mode::Analyze => {
            let analyses = ledger.preview_repricing(markup).await?;
            print_analysis(&analyses);
        }
        Mode::Verify => {
            let checks = ledger.verify_markups(markup, VERIFY_TOLERANCE).await?;
            print_verification(&checks, markup);
        }
        Mode::Backup(dir) => {
            let backup = ProductBackup::take(&db).await?;
            let files = backup
                .write_to(&dir)
                .with_context(|| format!("writing backup to {}", dir.display()))?;
            println!("Products backed up: {}", backup.total_products);
            println!("JSON: {}", files.json.display());
            println!("CSV:  {}", files.csv.display());
        }
        Mode::Apply => {
            let changed = ledger.reprice_all(markup).await?;
            print_analysis(&changed);
            println!();
            println!("Updated {} products", changed.len());
        }
    }

    db.close().await;
    Ok(())
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        let head: String = name.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

fn format_margin(margin: Option<f64>) -> String {
    margin
        .map(|m| format!("{m:.1}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_analysis(analyses: &[RepriceAnalysis]) {
    println!("{}", "=".repeat(100));
    println!(
        "{:<25}| {:>8} | {:>8} | {:>8} | {:>10} | {:>12} | {:>12}",
        "PRODUCT", "COST", "CURRENT", "NEW", "DIFF", "MARGIN NOW", "MARGIN NEW"
    );
    println!("{}", "=".repeat(100));

    for a in analyses {
        println!(
            "{:<25}| {:>8.0} | {:>8.2} | {:>8.2} | {:>+10.2} | {:>12} | {:>12}",
            truncate(&a.name, 24),
            a.unit_cost,
            a.current_sale_price,
            a.new_sale_price,
            a.difference,
            format_margin(a.current_real_margin),
            format_margin(a.new_real_margin),
        );
    }

    let current: f64 = analyses.iter().map(|a| a.current_sale_price).sum();
    let new: f64 = analyses.iter().map(|a| a.new_sale_price).sum();
    let raised = analyses.iter().filter(|a| a.difference > 0.0).count();
    let lowered = analyses.iter().filter(|a| a.difference < 0.0).count();

    println!("{}", "=".repeat(100));
    println!("Products:        {}", analyses.len());
    println!("Raised:          {raised}");
    println!("Lowered:         {lowered}");
    println!("Σ current price: {current:.2}");
    println!("Σ new price:     {new:.2}");
}

fn print_verification(checks: &[MarkupCheck], expected: f64) {
    let issues: Vec<&MarkupCheck> = checks.iter().filter(|c| !c.ok).collect();

    println!("Checked:   {}", checks.len());
    println!("Correct:   {}", checks.len() - issues.len());
    println!("Incorrect: {}", issues.len());

    if issues.is_empty() {
        println!();
        println!("✓ Every product has a {expected}% markup");
        return;
    }

    println!();
    println!(
        "{:<25}| {:<15} | {:>8} | {:>8} | {:>10}",
        "PRODUCT", "SKU", "COST", "PRICE", "MARKUP"
    );
    for c in issues {
        println!(
            "{:<25}| {:<15} | {:>8.2} | {:>8.2} | {:>10}",
            truncate(&c.name, 24),
            truncate(&c.sku, 15),
            c.unit_cost,
            c.sale_price,
            format_margin(c.actual_markup),
        );
    }
}
