use crate::error::{RecError, RecResult};
use crate::models::InteractionType;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> RecResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| RecError::Config(format!("invalid listen address: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub postgres_url: String,
    pub max_connections: u32,
    pub connect_retries: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub redis_url: String,
    /// JSON fixture loaded into the in-memory catalog at startup.
    pub fixture_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// How many top direct products anchor candidate expansion.
    pub seed_products: usize,
    pub expansion_discount: f64,
    pub weights: InteractionWeights,
    pub quality: QualityThresholds,
}

/// Weight assigned to each interaction kind at record time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionWeights {
    pub view: f64,
    pub like: f64,
    pub add_to_cart: f64,
    pub remove_from_cart: f64,
    pub rating: f64,
    pub purchase: f64,
}

impl InteractionWeights {
    pub fn weight_for(&self, kind: InteractionType) -> f64 {
        match kind {
            InteractionType::View => self.view,
            InteractionType::Like => self.like,
            InteractionType::AddToCart => self.add_to_cart,
            InteractionType::RemoveFromCart => self.remove_from_cart,
            InteractionType::Rating => self.rating,
            InteractionType::Purchase => self.purchase,
        }
    }
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            like: 3.0,
            add_to_cart: 4.0,
            remove_from_cart: -2.0,
            rating: 5.0,
            purchase: 10.0,
        }
    }
}

/// Interaction counts at which the quality tier steps up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub medium: u64,
    pub good: u64,
    pub high: u64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            medium: 10,
            good: 30,
            high: 50,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: num_cpus::get(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            postgres_url: "postgresql://localhost:5432/storefront".to_string(),
            max_connections: 10,
            connect_retries: 5,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            fixture_path: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_seconds: 86_400,
            leeway_seconds: 30,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            seed_products: 5,
            expansion_discount: 0.5,
            weights: InteractionWeights::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            catalog: CatalogConfig::default(),
            auth: AuthConfig::default(),
            pagination: PaginationConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> RecResult<Self> {
        Self::build(Some(path))
    }

    /// Loads `path` when it exists, otherwise the defaults. Environment
    /// overrides apply in both cases.
    pub fn load_or_default(path: &str) -> RecResult<Self> {
        if std::path::Path::new(path).exists() {
            Self::build(Some(path))
        } else {
            tracing::info!("Config file {} not found, using defaults with environment overrides", path);
            Self::build(None)
        }
    }

    fn build(path: Option<&str>) -> RecResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("STOREFRONT_REC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RecError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| RecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecResult<()> {
        let quality = &self.recommendation.quality;
        if !(quality.medium <= quality.good && quality.good <= quality.high) {
            return Err(RecError::Config(
                "quality thresholds must satisfy medium <= good <= high".to_string(),
            ));
        }
        if self.recommendation.default_limit == 0
            || self.recommendation.default_limit > self.recommendation.max_limit
        {
            return Err(RecError::Config(
                "recommendation.default_limit must be in 1..=max_limit".to_string(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(RecError::Config(
                "pagination.default_limit must be in 1..=max_limit".to_string(),
            ));
        }
        if !self.recommendation.expansion_discount.is_finite()
            || self.recommendation.expansion_discount < 0.0
        {
            return Err(RecError::Config(
                "recommendation.expansion_discount must be a non-negative number".to_string(),
            ));
        }
        if self.server.workers == 0 {
            return Err(RecError::Config("server.workers must be positive".to_string()));
        }
        Ok(())
    }
}
