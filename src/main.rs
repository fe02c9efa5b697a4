mod catalog;
mod cli;
mod config;
mod matcher;
mod model;
mod normalizer;
mod parser;
mod reconcile;
mod scraper;
mod storage;
mod utils;

use crate::scraper::{fetch_pages, ScraperImpl};
use catalog::{build_catalog, ScrapedCatalog};
use clap::Parser;
use cli::{Cli, Commands};
use config::{is_valid_price, load_config, AppConfig};
use normalizer::{KeyNormalizer, UrlResolver};
use reconcile::{Reconciler, RunMode};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storage::{open_store, ProductStore};
use tracing::{error, info, warn, Level};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report lines.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Fetch => run_fetch(&config).await,
        Commands::Extract { output } => run_extract(&config, &output),
        Commands::Match { catalog } => {
            run_reconcile(&config, catalog.as_deref(), RunMode::Debug, None).await
        }
        Commands::Apply { catalog, price } => {
            run_reconcile(&config, catalog.as_deref(), RunMode::Apply, price).await
        }
        Commands::Reprice { price } => run_reprice(&config, price).await,
        Commands::AddFormat { name } => run_add_format(&config, &name).await,
    }
}

async fn run_fetch(config: &AppConfig) -> ExitCode {
    let scraper = match ScraperImpl::new() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let saved = fetch_pages(&scraper, &config.pages, config.fetch_delay_ms).await;
    info!("Saved {} page(s).", saved);
    ExitCode::SUCCESS
}

/// Builds the catalog from the configured page files.
fn extract_catalog(config: &AppConfig) -> Option<ScrapedCatalog> {
    let extractor = match parser::build_extractor(&config.site) {
        Ok(extractor) => extractor,
        Err(e) => {
            error!("Extractor setup failed: {}", e);
            return None;
        }
    };
    let normalizer = KeyNormalizer::new(config.site.link_prefix.clone());
    let resolver = UrlResolver::new(config.site.site_root.clone(), &config.site.locale);
    let pages: Vec<PathBuf> = config.pages.iter().map(|p| p.path.clone()).collect();

    Some(build_catalog(&pages, extractor.as_ref(), &normalizer, &resolver))
}

fn run_extract(config: &AppConfig, output: &Path) -> ExitCode {
    let Some(catalog) = extract_catalog(config) else {
        return ExitCode::FAILURE;
    };
    match catalog.save(output) {
        Ok(()) => {
            info!("Saved {} entries to {}", catalog.len(), output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to save {}: {}", output.display(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run_reconcile(
    config: &AppConfig,
    catalog_path: Option<&Path>,
    mode: RunMode,
    price: Option<f64>,
) -> ExitCode {
    let catalog = match catalog_path {
        Some(path) => match ScrapedCatalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => match extract_catalog(config) {
            Some(catalog) => catalog,
            None => return ExitCode::FAILURE,
        },
    };
    if catalog.is_empty() {
        warn!("Scraped catalog is empty; every product will be reported as unmatched");
    }
    info!("Catalog has {} entries, {} product(s) to match", catalog.len(), config.products.len());

    let mut reconciler = Reconciler::new(&catalog, io::stdout());
    let report = match mode {
        RunMode::Debug => reconciler.debug(&config.products),
        RunMode::Apply => {
            let Some(store) = open_configured_store(config) else {
                return ExitCode::FAILURE;
            };
            let price = price.unwrap_or(config.default_price);
            if !is_valid_price(price) {
                error!("Invalid price: {}", price);
                return ExitCode::FAILURE;
            }
            match reconciler.apply(&config.products, store.as_ref(), price).await {
                Ok(report) => report,
                Err(e) => {
                    error!("CRITICAL ERROR: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    info!(
        "Done: {} matched, {} unmatched, {} created, {} updated, {} images linked, {} failures",
        report.matched,
        report.unmatched,
        report.created,
        report.updated,
        report.images_linked,
        report.failures
    );
    ExitCode::SUCCESS
}

fn open_configured_store(config: &AppConfig) -> Option<Box<dyn ProductStore>> {
    match open_store(&config.store) {
        Ok(store) => Some(store),
        Err(e) => {
            error!("Failed to open product store: {}", e);
            None
        }
    }
}

async fn run_add_format(config: &AppConfig, name: &str) -> ExitCode {
    let Some(store) = open_configured_store(config) else {
        return ExitCode::FAILURE;
    };
    match store.create_format(name).await {
        Ok(format) => {
            info!("Created format {} ({})", format.id, format.name);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to create format {}: {}", name, e);
            ExitCode::FAILURE
        }
    }
}

async fn run_reprice(config: &AppConfig, price: f64) -> ExitCode {
    if !is_valid_price(price) {
        error!("Invalid price: {}", price);
        return ExitCode::FAILURE;
    }
    let Some(store) = open_configured_store(config) else {
        return ExitCode::FAILURE;
    };
    match store.update_all_prices(price).await {
        Ok(count) => {
            info!("Updated {} product(s) to {}", count, price);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Bulk price update failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
