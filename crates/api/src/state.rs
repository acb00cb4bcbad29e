use std::sync::Arc;

use lookbook_core::generation::ModelRegistry;
use lookbook_generation::{GenerationApi, GenerationBackend, JobTracker};
use lookbook_notion::{ImageProxy, NotionGateway};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Notion collections, with their resolved data source ids.
    pub notion: Arc<NotionGateway>,
    /// Relay for remote images.
    pub images: ImageProxy,
    /// Owner of the current generation job.
    pub generation: Arc<JobTracker>,
}

impl AppState {
    /// Build every client from `config`, sharing one HTTP connection pool.
    pub fn new(config: ServerConfig) -> Self {
        let client = reqwest::Client::new();

        let notion = NotionGateway::new(client.clone(), &config.notion);
        let images = ImageProxy::new(client.clone(), config.notion.image_max_bytes);

        let backend = config.generation.api_key.clone().map(|key| {
            Arc::new(GenerationApi::with_client(
                client,
                config.generation.api_base.clone(),
                key,
            )) as Arc<dyn GenerationBackend>
        });
        let generation = JobTracker::new(
            backend,
            Arc::new(ModelRegistry::default()),
            config.generation.poll.clone(),
        );

        Self {
            config: Arc::new(config),
            notion: Arc::new(notion),
            images,
            generation: Arc::new(generation),
        }
    }
}
