/// Tenderdesk - client-side state engine for reviewing extracted tender documents.
///
/// This crate owns the document-review state of a tender extraction tool:
/// summaries produced by backend extraction, their per-field validation
/// workflow, and streaming chat conversations grounded in each document.
///
/// # Architecture
///
/// The system uses:
/// - A snapshot-based entity store as the single owner of all summaries,
///   rows, and conversations
/// - A JSON file persistence adapter that rewrites the whole collection on
///   every committed change
/// - An incremental streaming engine that folds backend reply chunks into
///   the growing assistant message, with UTF-8 safety across chunk splits
/// - reqwest for backend HTTP calls, Tokio for the async runtime
///
/// # Example
///
/// ```no_run
/// use tenderdesk::backend::BackendClient;
/// use tenderdesk::core::config::AppConfig;
/// use tenderdesk::store::{EntityStore, JsonFilePersistence};
/// use tenderdesk::workflow::{self, BusyFlags};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     tenderdesk::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let store = EntityStore::open(Box::new(JsonFilePersistence::new(&config.state_path)))?;
///     let client = BackendClient::new(reqwest::Client::new(), &config.backend_base_url);
///     let busy = BusyFlags::new();
///
///     let payload = std::fs::read("tender_a.pdf")?;
///     let summary_id = workflow::summaries::upload_document(
///         &store,
///         &client,
///         &busy,
///         "tender_a.pdf",
///         payload,
///     )
///     .await?;
///
///     let conversation_id = workflow::conversations::open_conversation(&store, summary_id)?;
///     let mut exchange =
///         tenderdesk::chat::ChatExchange::new(summary_id, conversation_id);
///     exchange
///         .run(&store, &client, &busy, "What is the submission deadline?")
///         .await?;
///
///     Ok(())
/// }
/// ```
// Module declarations
pub mod backend;
pub mod chat;
pub mod core;
pub mod errors;
pub mod store;
pub mod validation;
pub mod workflow;

/// Configure structured logging for the application.
///
/// Sets up tracing-subscriber with an environment-driven filter (`RUST_LOG`,
/// defaulting to `info`). Call once at startup.
///
/// # Example
///
/// ```
/// tenderdesk::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
