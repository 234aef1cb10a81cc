//! Command-line interface for chiv
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Merging command-line overrides into the loaded configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, LogLevel, StoreKind};
use crate::error::Result;
use crate::export::{ExportOption, FormatKind};
use crate::source::Driver;

pub mod completion;

/// chiv - stream database tables to object storage
#[derive(Parser, Debug)]
#[command(
    name = "chiv",
    version,
    about = "Archive database tables to object storage",
    long_about = "Stream the rows of a database table to an object store as CSV, JSON or YAML
without holding the table in memory."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more detail)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for chiv
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a table to the object store
    Export(ExportArgs),

    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// Arguments of the export subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Table to export
    #[arg(short = 't', long, value_name = "TABLE")]
    pub table: String,

    /// Destination bucket
    #[arg(short = 'b', long, value_name = "BUCKET")]
    pub bucket: String,

    /// Database URL
    #[arg(short = 'd', long, value_name = "URL", env = "DATABASE_URL")]
    pub database: Option<String>,

    /// Database driver (sqlite, postgres, mysql); inferred from the URL when omitted
    #[arg(short = 'r', long, value_name = "DRIVER")]
    pub driver: Option<Driver>,

    /// Output format (csv, json, yaml)
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<FormatKind>,

    /// Destination key (defaults to TABLE.EXTENSION)
    #[arg(short = 'k', long, value_name = "KEY", conflicts_with = "extension")]
    pub key: Option<String>,

    /// Extension of the generated key
    #[arg(short = 'e', long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Text written in place of NULL values
    #[arg(short = 'n', long, value_name = "TEXT")]
    pub null: Option<String>,

    /// Columns to export, comma separated (default: all)
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Root directory of the filesystem store
    #[arg(long, value_name = "DIR", conflicts_with = "endpoint")]
    pub root: Option<PathBuf>,

    /// Base URL of an HTTP store
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Show a progress spinner
    #[arg(long)]
    pub progress: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Configuration with command-line overrides applied
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        Ok(Self { args, config })
    }

    /// Get the configuration
    ///
    /// # Returns
    /// * `&Config` - Reference to configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    ///
    /// # Returns
    /// * `&CliArgs` - Reference to arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Export arguments, if the export subcommand was given
    pub fn export_args(&self) -> Option<&ExportArgs> {
        match &self.args.command {
            Commands::Export(args) => Some(args),
            _ => None,
        }
    }

    /// Export options for the run, built from the effective configuration
    pub fn export_options(&self) -> Vec<ExportOption> {
        self.config.to_export_options()
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    ///
    /// # Arguments
    /// * `config` - Configuration to modify
    /// * `args` - Parsed arguments
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_logging_args(config, args);
        if let Commands::Export(export) = &args.command {
            Self::apply_export_args(config, export);
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose > 0 {
            config.logging.level.max(LogLevel::Info).raised(args.verbose - 1)
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &ExportArgs) {
        if let Some(url) = &args.database {
            config.database.url = url.clone();
        }
        if let Some(driver) = args.driver {
            config.database.driver = Some(driver);
        }

        if let Some(root) = &args.root {
            config.store.kind = StoreKind::Fs;
            config.store.root = root.clone();
        }
        if let Some(endpoint) = &args.endpoint {
            config.store.kind = StoreKind::Http;
            config.store.endpoint = Some(endpoint.clone());
        }

        let export = &mut config.export;
        if let Some(format) = args.format {
            export.format = format;
        }
        if let Some(key) = &args.key {
            export.key = Some(key.clone());
        }
        if let Some(extension) = &args.extension {
            // A key from the config file would otherwise shadow the requested extension.
            export.key = None;
            export.extension = Some(extension.clone());
        }
        if let Some(null) = &args.null {
            export.null = Some(null.clone());
        }
        if !args.columns.is_empty() {
            export.columns = args
                .columns
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
    }

    /// Handle subcommands other than export
    ///
    /// # Returns
    /// * `Result<bool>` - True if the subcommand was handled, false for export
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Commands::Version => {
                self.show_version();
                Ok(true)
            }
            Commands::Completion { shell } => {
                completion::generate_completion(shell)?;
                Ok(true)
            }
            Commands::Config { show, validate } => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Commands::Export(_) => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("chiv version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults are in effect");
            return;
        }

        match Config::from_file(&path) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }
}
