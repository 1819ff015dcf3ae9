use clap::Parser;
use csv_bulk_loader::config::cli::{Command, ImportArgs};
use csv_bulk_loader::utils::error::ErrorSeverity;
use csv_bulk_loader::utils::monitor::SystemMonitor;
use csv_bulk_loader::utils::{logger, validation::Validate};
use csv_bulk_loader::{
    AppSettings, CliConfig, ImportError, ImportPipeline, ImportService, JsonLinesStore,
    MemoryStore, RecordStore, UploadedFile,
};
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting csv-bulk-loader");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match cli.resolve().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e, "Configuration is invalid"),
    };

    let status = match &cli.command {
        Command::Import(args) => {
            if args.dry_run {
                tracing::info!("🔍 DRY RUN - records go to an in-memory store");
                import(MemoryStore::with_unique_ids(), &settings, args).await?
            } else {
                let store = open_store(&settings);
                import(store, &settings, args).await?
            }
        }
        Command::List { limit } => {
            let store = open_store(&settings);
            let service = ImportService::new(ImportPipeline::new(store, settings.import.clone()));
            let (status, response) = service.list_recent(*limit).await;
            print_json(&response)?;
            status
        }
    };

    if status != 200 {
        std::process::exit(exit_code(status));
    }
    Ok(())
}

async fn import<S: RecordStore>(
    store: S,
    settings: &AppSettings,
    args: &ImportArgs,
) -> Result<u16, Box<dyn std::error::Error>> {
    let upload = match UploadedFile::from_path(&args.file, args.name.clone()) {
        Ok(upload) => Some(upload),
        Err(e) => {
            tracing::warn!("⚠️ Cannot use {}: {}", args.file.display(), e);
            None
        }
    };

    let pipeline = ImportPipeline::new(store, settings.import.clone())
        .with_monitoring(SystemMonitor::new(settings.monitoring));
    let mut service = ImportService::new(pipeline);
    if !settings.remove_after_import {
        service = service.keep_uploads();
    }

    let (status, response) = service.handle_upload(upload).await;
    print_json(&response)?;
    Ok(status)
}

fn open_store(settings: &AppSettings) -> JsonLinesStore {
    match JsonLinesStore::open(&settings.store_path, settings.unique_ids) {
        Ok(store) => store,
        Err(e) => exit_with(&e, "Cannot open the record store"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(status: u16) -> i32 {
    match status {
        400..=499 => 2,
        _ => 1,
    }
}

fn exit_with(e: &ImportError, context: &str) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(code)
}
