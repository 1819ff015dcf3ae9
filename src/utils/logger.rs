use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "csv_bulk_loader=info";
const VERBOSE_FILTER: &str = "csv_bulk_loader=debug,info";

/// `RUST_LOG` wins over the built-in filter when it is set.
pub fn filter_for(verbose: bool) -> EnvFilter {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter_for(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines on stdout, for jobs whose logs are collected by a log shipper.
///
/// Event fields are flattened into each line and the enclosing `import` span
/// is attached as `span`, so every line of a run carries its `file` and
/// `bytes` and runs over different uploads can be told apart.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter_for(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}
