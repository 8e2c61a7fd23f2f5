use super::{CatalogFixture, ProductCatalog, UserDirectory};
use crate::error::RecResult;
use crate::models::ProductSnapshot;
use dashmap::DashMap;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

const USERS_KEY: &str = "catalog:users";

/// Catalog collaborator backed by Redis.
///
/// Layout:
/// - `catalog:product:{id}`: product snapshot as JSON
/// - `catalog:category:{name}` / `catalog:brand:{name}`: sets of product ids
/// - `catalog:users`: set of known user ids
///
/// Snapshots are immutable from this service's point of view, so they are
/// kept in a process-local cache once read.
pub struct RedisCatalog {
    connection: MultiplexedConnection,
    products_cache: DashMap<Uuid, ProductSnapshot>,
}

impl RedisCatalog {
    pub async fn connect(url: &str) -> RecResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis catalog at {}", url);

        Ok(Self {
            connection,
            products_cache: DashMap::new(),
        })
    }

    fn product_key(product_id: Uuid) -> String {
        format!("catalog:product:{}", product_id)
    }

    fn category_key(category: &str) -> String {
        format!("catalog:category:{}", category)
    }

    fn brand_key(brand: &str) -> String {
        format!("catalog:brand:{}", brand)
    }

    async fn members(&self, key: &str) -> RecResult<Vec<Uuid>> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.smembers(key).await?;

        let mut ids: Vec<Uuid> = raw
            .iter()
            .filter_map(|value| match Uuid::parse_str(value) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("Ignoring malformed product id {:?} in {}", value, key);
                    None
                }
            })
            .collect();
        // Set members come back unordered.
        ids.sort();
        Ok(ids)
    }

    /// Index sets that list `previous` but no longer apply to `current`.
    fn stale_index_keys(previous: &ProductSnapshot, current: &ProductSnapshot) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(category) = &previous.category {
            if current.category.as_ref() != Some(category) {
                keys.push(Self::category_key(category));
            }
        }
        if let Some(brand) = &previous.brand {
            if current.brand.as_ref() != Some(brand) {
                keys.push(Self::brand_key(brand));
            }
        }
        keys
    }

    /// Writes every product and user of `fixture`, replacing existing snapshots
    /// and moving re-imported products out of index sets they left.
    pub async fn import(&self, fixture: &CatalogFixture) -> RecResult<()> {
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();

        for user_id in &fixture.users {
            pipe.sadd(USERS_KEY, user_id.to_string()).ignore();
        }
        for product in &fixture.products {
            let previous: Option<String> = conn.get(Self::product_key(product.id)).await?;
            if let Some(previous) = previous {
                let previous: ProductSnapshot = serde_json::from_str(&previous)?;
                for key in Self::stale_index_keys(&previous, product) {
                    pipe.srem(key, product.id.to_string()).ignore();
                }
            }

            let payload = serde_json::to_string(product)?;
            pipe.set(Self::product_key(product.id), payload).ignore();
            if let Some(category) = &product.category {
                pipe.sadd(Self::category_key(category), product.id.to_string()).ignore();
            }
            if let Some(brand) = &product.brand {
                pipe.sadd(Self::brand_key(brand), product.id.to_string()).ignore();
            }
            self.products_cache.remove(&product.id);
        }

        pipe.query_async::<_, ()>(&mut conn).await?;
        info!(
            "Imported {} products and {} users into Redis catalog",
            fixture.products.len(),
            fixture.users.len()
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductCatalog for RedisCatalog {
    async fn get_product(&self, product_id: Uuid) -> RecResult<Option<ProductSnapshot>> {
        if let Some(product) = self.products_cache.get(&product_id) {
            return Ok(Some(product.value().clone()));
        }

        let mut conn = self.connection.clone();
        let cached: Option<String> = conn.get(Self::product_key(product_id)).await?;
        match cached {
            Some(payload) => {
                let product: ProductSnapshot = serde_json::from_str(&payload)?;
                self.products_cache.insert(product_id, product.clone());
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn products_in_category(&self, category: &str) -> RecResult<Vec<Uuid>> {
        self.members(&Self::category_key(category)).await
    }

    async fn products_of_brand(&self, brand: &str) -> RecResult<Vec<Uuid>> {
        self.members(&Self::brand_key(brand)).await
    }

    async fn product_exists(&self, product_id: Uuid) -> RecResult<bool> {
        if self.products_cache.contains_key(&product_id) {
            return Ok(true);
        }
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(Self::product_key(product_id)).await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl UserDirectory for RedisCatalog {
    async fn user_exists(&self, user_id: Uuid) -> RecResult<bool> {
        let mut conn = self.connection.clone();
        let known: bool = conn.sismember(USERS_KEY, user_id.to_string()).await?;
        Ok(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            RedisCatalog::product_key(id),
            "catalog:product:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(RedisCatalog::category_key("shoes"), "catalog:category:shoes");
        assert_eq!(RedisCatalog::brand_key("Acme"), "catalog:brand:Acme");
    }

    #[test]
    fn test_stale_index_keys_on_reimport() {
        let id = Uuid::new_v4();
        let previous = ProductSnapshot::new(id, "Trail runner", 95.0)
            .with_category("shoes")
            .with_brand("Stride");

        let unchanged = previous.clone().with_sale_price(80.0);
        assert!(RedisCatalog::stale_index_keys(&previous, &unchanged).is_empty());

        let moved = ProductSnapshot::new(id, "Trail runner", 95.0)
            .with_category("outdoor")
            .with_brand("Stride");
        assert_eq!(
            RedisCatalog::stale_index_keys(&previous, &moved),
            vec!["catalog:category:shoes".to_string()]
        );

        let unbranded = ProductSnapshot::new(id, "Trail runner", 95.0);
        assert_eq!(
            RedisCatalog::stale_index_keys(&previous, &unbranded),
            vec!["catalog:category:shoes".to_string(), "catalog:brand:Stride".to_string()]
        );
    }
}
