pub mod algorithms;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{RecError, RecResult};
pub use models::*;

use algorithms::{AttributeSimilarity, CandidateGenerator};
use auth::TokenVerifier;
use config::{CatalogBackend, StorageBackend};
use services::catalog::{CatalogFixture, InMemoryCatalog, ProductCatalog, RedisCatalog, UserDirectory};
use services::interaction_store::{InMemoryInteractionStore, InteractionStore, PgInteractionStore};
use services::recommendation::RecommendationService;
use services::recorder::InteractionRecorder;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn InteractionStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub users: Arc<dyn UserDirectory>,
    pub recorder: Arc<InteractionRecorder>,
    pub recommendation_service: Arc<RecommendationService>,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Builds the state from the backends named in `config`.
    pub async fn new(config: Config) -> RecResult<Self> {
        let store: Arc<dyn InteractionStore> = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory interaction store");
                Arc::new(InMemoryInteractionStore::new())
            }
            StorageBackend::Postgres => Arc::new(PgInteractionStore::connect(&config.storage).await?),
        };

        let (catalog, users): (Arc<dyn ProductCatalog>, Arc<dyn UserDirectory>) =
            match config.catalog.backend {
                CatalogBackend::Memory => {
                    let fixture = match &config.catalog.fixture_path {
                        Some(path) => CatalogFixture::from_file(path)?,
                        None => CatalogFixture::default(),
                    };
                    let catalog = Arc::new(InMemoryCatalog::from_fixture(fixture));
                    (
                        catalog.clone() as Arc<dyn ProductCatalog>,
                        catalog as Arc<dyn UserDirectory>,
                    )
                }
                CatalogBackend::Redis => {
                    let url = config.catalog.redis_url.clone();
                    let catalog = Arc::new(
                        utils::retry_with_backoff(
                            || RedisCatalog::connect(&url),
                            config.storage.connect_retries,
                            Duration::from_millis(200),
                        )
                        .await?,
                    );
                    (
                        catalog.clone() as Arc<dyn ProductCatalog>,
                        catalog as Arc<dyn UserDirectory>,
                    )
                }
            };

        Ok(Self::with_components(config, store, catalog, users))
    }

    pub fn with_components(
        config: Config,
        store: Arc<dyn InteractionStore>,
        catalog: Arc<dyn ProductCatalog>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let config = Arc::new(config);

        let generator: Arc<dyn CandidateGenerator> = Arc::new(AttributeSimilarity::new(
            catalog.clone(),
            config.recommendation.expansion_discount,
        ));

        let recorder = Arc::new(InteractionRecorder::new(
            store.clone(),
            catalog.clone(),
            users.clone(),
            config.recommendation.weights.clone(),
        ));

        let recommendation_service = Arc::new(RecommendationService::new(
            store.clone(),
            catalog.clone(),
            generator,
            config.recommendation.clone(),
        ));

        let tokens = Arc::new(TokenVerifier::new(&config.auth));

        Self {
            config,
            store,
            catalog,
            users,
            recorder,
            recommendation_service,
            tokens,
        }
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
