use crate::config::toml_config::LoaderConfig;
use crate::config::AppSettings;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "csv-bulk-loader")]
#[command(about = "Stream a delimited file of person records into a record store")]
pub struct CliConfig {
    /// Path to a TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Record store file (JSON lines)
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log process CPU and memory after every batch
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import an uploaded file and print the run summary as JSON
    Import(ImportArgs),

    /// Print the most recently stored records and the total count as JSON
    List {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// The uploaded file
    pub file: PathBuf,

    /// Name to report for the file, defaults to its file name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Treat the first line as a header row and skip it
    #[arg(long)]
    pub has_headers: bool,

    #[arg(long)]
    pub delimiter: Option<char>,

    /// Leave the file in place after the import
    #[arg(long)]
    pub keep_file: bool,

    /// Load into an in-memory store instead of the configured one
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Merges defaults, the settings file (if any) and flags, in that order.
    pub fn resolve(&self) -> Result<AppSettings> {
        let file = match &self.config {
            Some(path) => LoaderConfig::from_file(path)?,
            None => LoaderConfig::default(),
        };
        let mut settings = file.into_settings();
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    pub fn apply_overrides(&self, settings: &mut AppSettings) {
        if let Some(store) = &self.store {
            settings.store_path = store.clone();
        }
        if self.monitor {
            settings.monitoring = true;
        }

        if let Command::Import(args) = &self.command {
            if let Some(batch_size) = args.batch_size {
                settings.import.batch_size = batch_size;
            }
            if args.has_headers {
                settings.import.has_headers = true;
            }
            if let Some(delimiter) = args.delimiter {
                settings.import.delimiter = delimiter;
            }
            if args.keep_file {
                settings.remove_after_import = false;
            }
        }
    }
}
