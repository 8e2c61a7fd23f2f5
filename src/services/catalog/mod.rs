pub mod redis_catalog;

use crate::error::{RecError, RecResult};
use crate::models::ProductSnapshot;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub use redis_catalog::RedisCatalog;

/// Read-only view over the storefront's product catalog.
#[async_trait::async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, product_id: Uuid) -> RecResult<Option<ProductSnapshot>>;

    async fn products_in_category(&self, category: &str) -> RecResult<Vec<Uuid>>;

    async fn products_of_brand(&self, brand: &str) -> RecResult<Vec<Uuid>>;

    async fn product_exists(&self, product_id: Uuid) -> RecResult<bool> {
        Ok(self.get_product(product_id).await?.is_some())
    }
}

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> RecResult<bool>;
}

/// Catalog contents as loaded from a JSON fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub users: Vec<Uuid>,
    #[serde(default)]
    pub products: Vec<ProductSnapshot>,
}

impl CatalogFixture {
    pub fn from_file(path: &str) -> RecResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RecError::Config(format!("cannot read fixture {}: {}", path, e)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    products: DashMap<Uuid, ProductSnapshot>,
    by_category: DashMap<String, Vec<Uuid>>,
    by_brand: DashMap<String, Vec<Uuid>>,
    users: DashSet<Uuid>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: CatalogFixture) -> Self {
        let catalog = Self::new();
        let (users, products) = (fixture.users.len(), fixture.products.len());
        for user_id in fixture.users {
            catalog.add_user(user_id);
        }
        for product in fixture.products {
            catalog.add_product(product);
        }
        info!("Loaded in-memory catalog with {} products and {} users", products, users);
        catalog
    }

    pub fn add_user(&self, user_id: Uuid) {
        self.users.insert(user_id);
    }

    pub fn add_product(&self, product: ProductSnapshot) {
        if let Some(previous) = self.products.insert(product.id, product.clone()) {
            Self::unindex(&self.by_category, previous.category.as_deref(), previous.id);
            Self::unindex(&self.by_brand, previous.brand.as_deref(), previous.id);
        }
        if let Some(category) = &product.category {
            self.by_category.entry(category.clone()).or_default().push(product.id);
        }
        if let Some(brand) = &product.brand {
            self.by_brand.entry(brand.clone()).or_default().push(product.id);
        }
    }

    fn unindex(index: &DashMap<String, Vec<Uuid>>, key: Option<&str>, product_id: Uuid) {
        if let Some(key) = key {
            if let Some(mut ids) = index.get_mut(key) {
                ids.retain(|id| *id != product_id);
            }
        }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, product_id: Uuid) -> RecResult<Option<ProductSnapshot>> {
        Ok(self.products.get(&product_id).map(|p| p.value().clone()))
    }

    async fn products_in_category(&self, category: &str) -> RecResult<Vec<Uuid>> {
        Ok(self.by_category.get(category).map(|ids| ids.value().clone()).unwrap_or_default())
    }

    async fn products_of_brand(&self, brand: &str) -> RecResult<Vec<Uuid>> {
        Ok(self.by_brand.get(brand).map(|ids| ids.value().clone()).unwrap_or_default())
    }

    async fn product_exists(&self, product_id: Uuid) -> RecResult<bool> {
        Ok(self.products.contains_key(&product_id))
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryCatalog {
    async fn user_exists(&self, user_id: Uuid) -> RecResult<bool> {
        Ok(self.users.contains(&user_id))
    }
}
