use super::{rank, CandidateGenerator};
use crate::error::RecResult;
use crate::models::{ProductScore, ProductSnapshot};
use crate::services::catalog::ProductCatalog;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Content-based expansion over shared category and brand.
///
/// A candidate sharing one attribute with a seed earns half of the seed's
/// score, sharing both earns all of it; the sum over seeds is then scaled
/// by `discount` so expanded products rank below equally-scored seeds.
pub struct AttributeSimilarity {
    catalog: Arc<dyn ProductCatalog>,
    discount: f64,
}

impl AttributeSimilarity {
    pub fn new(catalog: Arc<dyn ProductCatalog>, discount: f64) -> Self {
        Self { catalog, discount }
    }

    async fn neighbours(&self, seed: &ProductSnapshot) -> RecResult<HashMap<Uuid, u32>> {
        let mut shared: HashMap<Uuid, u32> = HashMap::new();

        if let Some(category) = &seed.category {
            for id in self.catalog.products_in_category(category).await? {
                *shared.entry(id).or_insert(0) += 1;
            }
        }
        if let Some(brand) = &seed.brand {
            for id in self.catalog.products_of_brand(brand).await? {
                *shared.entry(id).or_insert(0) += 1;
            }
        }

        shared.remove(&seed.id);
        Ok(shared)
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for AttributeSimilarity {
    async fn expand(
        &self,
        seeds: &[ProductScore],
        exclude: &HashSet<Uuid>,
    ) -> RecResult<Vec<ProductScore>> {
        let mut candidates: HashMap<Uuid, ProductScore> = HashMap::new();

        for seed in seeds {
            let Some(snapshot) = self.catalog.get_product(seed.product_id).await? else {
                debug!("Seed product {} missing from catalog", seed.product_id);
                continue;
            };

            for (product_id, shared) in self.neighbours(&snapshot).await? {
                if exclude.contains(&product_id) {
                    continue;
                }
                let contribution = seed.score * (f64::from(shared) / 2.0) * self.discount;
                let entry = candidates.entry(product_id).or_insert_with(|| ProductScore {
                    product_id,
                    score: 0.0,
                    last_interaction_at: seed.last_interaction_at,
                    interactions: 0,
                });
                entry.score += contribution;
                if seed.last_interaction_at > entry.last_interaction_at {
                    entry.last_interaction_at = seed.last_interaction_at;
                }
            }
        }

        let mut expanded: Vec<ProductScore> = candidates
            .into_values()
            .filter(|candidate| candidate.score > 0.0)
            .collect();
        rank(&mut expanded);
        Ok(expanded)
    }
}
