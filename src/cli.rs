use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catalog-reconciler")]
#[command(about = "Match shop products to images scraped from the supplier catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(short, long, default_value = "config.json", global = true)]
    pub config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the configured catalog pages
    Fetch,

    /// Extract key -> image URL pairs from the page files and save them as JSON
    Extract {
        /// Output JSON file
        #[arg(short, long, default_value = "extracted_list.json")]
        output: PathBuf,
    },

    /// Dry run: print the match found for every product
    Match {
        /// Previously extracted JSON (default: extract from the page files)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Create/update products and link their images in the product store
    Apply {
        /// Previously extracted JSON (default: extract from the page files)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Price for created and updated products (default: from config)
        #[arg(long)]
        price: Option<f64>,
    },

    /// Set one price on every product in the store
    Reprice {
        #[arg(long, required = true)]
        price: f64,
    },

    /// Add a format row (products need at least one)
    AddFormat {
        #[arg(required = true)]
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_apply_with_overrides() {
        let cli = Cli::try_parse_from([
            "catalog-reconciler",
            "--config",
            "shop.json",
            "apply",
            "--catalog",
            "list.json",
            "--price",
            "289",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("shop.json"));
        match cli.command {
            Commands::Apply { catalog, price } => {
                assert_eq!(catalog, Some(PathBuf::from("list.json")));
                assert_eq!(price, Some(289.0));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn extract_defaults_output_file() {
        let cli = Cli::try_parse_from(["catalog-reconciler", "extract", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Extract { output } => assert_eq!(output, PathBuf::from("extracted_list.json")),
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn add_format_takes_a_name() {
        let cli = Cli::try_parse_from(["catalog-reconciler", "add-format", "10x10"]).unwrap();
        match cli.command {
            Commands::AddFormat { name } => assert_eq!(name, "10x10"),
            _ => panic!("expected add-format"),
        }
    }

    #[test]
    fn reprice_requires_price() {
        assert!(Cli::try_parse_from(["catalog-reconciler", "reprice"]).is_err());
    }
}
