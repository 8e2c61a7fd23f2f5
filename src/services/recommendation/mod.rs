use crate::algorithms::{self, CandidateGenerator};
use crate::config::RecommendationConfig;
use crate::error::RecResult;
use crate::models::*;
use crate::services::catalog::ProductCatalog;
use crate::services::interaction_store::InteractionStore;
use crate::utils::validation::validate_recommendation_limit;
use chrono::Utc;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct RecommendationService {
    store: Arc<dyn InteractionStore>,
    catalog: Arc<dyn ProductCatalog>,
    generator: Arc<dyn CandidateGenerator>,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn InteractionStore>,
        catalog: Arc<dyn ProductCatalog>,
        generator: Arc<dyn CandidateGenerator>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            generator,
            config,
        }
    }

    pub fn quality_tier(&self, total_interactions: u64) -> QualityTier {
        QualityTier::from_count(total_interactions, &self.config.quality)
    }

    /// Ranked recommendations for `user_id`.
    ///
    /// A user without interactions gets an empty list; falling back to
    /// popular products is left to the caller.
    pub async fn recommend(&self, user_id: Uuid, limit: i64) -> RecResult<Vec<RecommendationResult>> {
        let limit = validate_recommendation_limit(limit, self.config.max_limit)?;
        let history = self.store.history(user_id).await?;
        let (ranked, tier) = self.rank_for(&history, limit).await?;

        Ok(ranked
            .into_iter()
            .map(|(score, _)| RecommendationResult {
                product_id: score.product_id,
                score: score.score,
                quality_tier: tier,
            })
            .collect())
    }

    /// Ranked products that are still listed in the catalog, paired with
    /// their snapshots. Delisted products neither take a slot nor seed
    /// expansion.
    async fn rank_for(
        &self,
        history: &[Interaction],
        limit: usize,
    ) -> RecResult<(Vec<(ProductScore, ProductSnapshot)>, QualityTier)> {
        let tier = self.quality_tier(history.len() as u64);
        if history.is_empty() {
            return Ok((Vec::new(), tier));
        }

        let mut ranked = self.listed(algorithms::direct_scores(history)).await?;

        if ranked.len() < limit {
            let seen: HashSet<Uuid> = history.iter().map(|i| i.product_id).collect();
            let seeds: Vec<ProductScore> = ranked
                .iter()
                .take(self.config.seed_products)
                .map(|(score, _)| score.clone())
                .collect();
            let expanded = self.listed(self.generator.expand(&seeds, &seen).await?).await?;
            debug!(
                direct = ranked.len(),
                expanded = expanded.len(),
                "Expanded sparse recommendation set"
            );
            ranked.extend(expanded);
        }

        ranked.truncate(limit);
        Ok((ranked, tier))
    }

    async fn listed(&self, scores: Vec<ProductScore>) -> RecResult<Vec<(ProductScore, ProductSnapshot)>> {
        let snapshots = try_join_all(
            scores
                .iter()
                .map(|score| self.catalog.get_product(score.product_id)),
        )
        .await?;

        Ok(scores
            .into_iter()
            .zip(snapshots)
            .filter_map(|(score, snapshot)| match snapshot {
                Some(product) => Some((score, product)),
                None => {
                    warn!("Product {} missing from catalog, skipping", score.product_id);
                    None
                }
            })
            .collect())
    }

    /// Recommendations joined with catalog snapshots, as served over the API.
    pub async fn recommend_products(
        &self,
        user_id: Uuid,
        limit: i64,
        include_metadata: bool,
    ) -> RecResult<RecommendationResponse> {
        let limit = validate_recommendation_limit(limit, self.config.max_limit)?;
        let history = self.store.history(user_id).await?;
        let (ranked, tier) = self.rank_for(&history, limit).await?;

        let recommendations: Vec<RecommendedProduct> = ranked
            .into_iter()
            .map(|(score, product)| RecommendedProduct {
                product_id: product.id,
                name: product.name,
                image: product.image,
                price: product.price,
                sale_price: product.sale_price,
                score: include_metadata.then_some(score.score),
                quality_tier: include_metadata.then_some(tier),
            })
            .collect();

        info!(
            "Served {} recommendations for user {} ({:?} quality)",
            recommendations.len(),
            user_id,
            tier
        );

        Ok(RecommendationResponse {
            user_id,
            recommendations,
            quality: include_metadata.then(|| QualityReport {
                quality_tier: tier,
                total_interactions: history.len() as u64,
            }),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::AttributeSimilarity;
    use crate::services::catalog::InMemoryCatalog;
    use crate::services::interaction_store::InMemoryInteractionStore;
    use chrono::Duration;

    struct Fixture {
        service: RecommendationService,
        store: Arc<InMemoryInteractionStore>,
        catalog: Arc<InMemoryCatalog>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryInteractionStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let config = RecommendationConfig::default();
        let generator = Arc::new(AttributeSimilarity::new(catalog.clone(), config.expansion_discount));
        let service = RecommendationService::new(store.clone(), catalog.clone(), generator, config);
        Fixture {
            service,
            store,
            catalog,
        }
    }

    async fn add(store: &InMemoryInteractionStore, user: Uuid, product: Uuid, kind: InteractionType, weight: f64, seconds_ago: i64) {
        let interaction = Interaction::new(user, product, kind, weight)
            .at(Utc::now() - Duration::seconds(seconds_ago));
        store.append(&interaction).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_interactions_is_empty_not_error() {
        let f = fixture();
        let results = f.service.recommend(Uuid::new_v4(), 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_weighted_scores_ranked() {
        let f = fixture();
        let user = Uuid::new_v4();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        f.catalog.add_product(ProductSnapshot::new(p1, "Camera", 499.0).with_category("photo"));
        f.catalog.add_product(ProductSnapshot::new(p2, "Blender", 89.0).with_category("kitchen"));
        add(&f.store, user, p1, InteractionType::View, 1.0, 30).await;
        add(&f.store, user, p1, InteractionType::Purchase, 10.0, 20).await;
        add(&f.store, user, p2, InteractionType::View, 1.0, 10).await;

        let results = f.service.recommend(user, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].product_id, p1);
        assert_eq!(results[0].score, 11.0);
        assert_eq!(results[1].product_id, p2);
        assert_eq!(results[1].score, 1.0);
        assert!(results.iter().all(|r| r.quality_tier == QualityTier::Low));
    }

    #[tokio::test]
    async fn test_expansion_fills_remaining_slots_only() {
        let f = fixture();
        let user = Uuid::new_v4();
        let seen = Uuid::from_u128(1);
        let sibling = Uuid::from_u128(2);
        let removed = Uuid::from_u128(3);
        f.catalog.add_product(ProductSnapshot::new(seen, "Tent", 200.0).with_category("outdoor"));
        f.catalog.add_product(ProductSnapshot::new(sibling, "Sleeping bag", 80.0).with_category("outdoor"));
        f.catalog.add_product(ProductSnapshot::new(removed, "Stove", 40.0).with_category("outdoor"));
        add(&f.store, user, seen, InteractionType::Like, 3.0, 5).await;
        add(&f.store, user, removed, InteractionType::AddToCart, 4.0, 4).await;
        add(&f.store, user, removed, InteractionType::RemoveFromCart, -2.0, 3).await;
        add(&f.store, user, removed, InteractionType::RemoveFromCart, -2.0, 2).await;

        let results = f.service.recommend(user, 5).await.unwrap();
        let ids: Vec<Uuid> = results.iter().map(|r| r.product_id).collect();
        // The stove nets to zero and was already seen, so it never reappears.
        assert_eq!(ids, vec![seen, sibling]);
        assert_eq!(results[1].score, 0.75);

        let single = f.service.recommend(user, 1).await.unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].product_id, seen);
    }

    #[tokio::test]
    async fn test_tier_steps_at_tenth_interaction() {
        let f = fixture();
        let user = Uuid::new_v4();
        let product = Uuid::new_v4();
        f.catalog.add_product(ProductSnapshot::new(product, "Lamp", 15.0));
        for i in 0..9 {
            add(&f.store, user, product, InteractionType::View, 1.0, 100 - i).await;
        }
        let results = f.service.recommend(user, 1).await.unwrap();
        assert_eq!(results[0].quality_tier, QualityTier::Low);

        add(&f.store, user, product, InteractionType::View, 1.0, 0).await;
        let results = f.service.recommend(user, 1).await.unwrap();
        assert_eq!(results[0].quality_tier, QualityTier::Medium);
    }

    #[tokio::test]
    async fn test_invalid_limit_rejected() {
        let f = fixture();
        assert!(f.service.recommend(Uuid::new_v4(), 0).await.is_err());
        assert!(f.service.recommend(Uuid::new_v4(), 1_000).await.is_err());
    }

    #[tokio::test]
    async fn test_delisted_products_do_not_take_slots() {
        let f = fixture();
        let user = Uuid::new_v4();
        let tent = Uuid::from_u128(10);
        let siblings = [Uuid::from_u128(11), Uuid::from_u128(12), Uuid::from_u128(13)];
        f.catalog.add_product(ProductSnapshot::new(tent, "Tent", 200.0).with_category("camping"));
        for (i, id) in siblings.iter().enumerate() {
            f.catalog.add_product(ProductSnapshot::new(*id, format!("Camping gear {}", i), 30.0).with_category("camping"));
        }
        let delisted = [Uuid::new_v4(), Uuid::new_v4()];
        add(&f.store, user, tent, InteractionType::Purchase, 10.0, 30).await;
        add(&f.store, user, delisted[0], InteractionType::Purchase, 10.0, 20).await;
        add(&f.store, user, delisted[1], InteractionType::Purchase, 10.0, 10).await;

        let response = f.service.recommend_products(user, 3, true).await.unwrap();
        let ids: Vec<Uuid> = response.recommendations.iter().map(|r| r.product_id).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], tent);
        assert!(ids[1..].iter().all(|id| siblings.contains(id)));
        assert!(!ids.iter().any(|id| delisted.contains(id)));

        let results = f.service.recommend(user, 3).await.unwrap();
        let plain: Vec<Uuid> = results.iter().map(|r| r.product_id).collect();
        assert_eq!(plain, ids);
    }

    #[tokio::test]
    async fn test_products_joined_with_optional_metadata() {
        let f = fixture();
        let user = Uuid::new_v4();
        let listed = Uuid::new_v4();
        let delisted = Uuid::new_v4();
        f.catalog.add_product(ProductSnapshot::new(listed, "Backpack", 60.0).with_sale_price(45.0));
        add(&f.store, user, listed, InteractionType::AddToCart, 4.0, 2).await;
        add(&f.store, user, delisted, InteractionType::Purchase, 10.0, 1).await;

        let plain = f.service.recommend_products(user, 10, false).await.unwrap();
        assert_eq!(plain.recommendations.len(), 1);
        assert_eq!(plain.recommendations[0].product_id, listed);
        assert_eq!(plain.recommendations[0].sale_price, Some(45.0));
        assert!(plain.recommendations[0].score.is_none());
        assert!(plain.quality.is_none());

        let detailed = f.service.recommend_products(user, 10, true).await.unwrap();
        assert_eq!(detailed.recommendations[0].score, Some(4.0));
        assert_eq!(detailed.recommendations[0].quality_tier, Some(QualityTier::Low));
        let quality = detailed.quality.unwrap();
        assert_eq!(quality.total_interactions, 2);
    }
}
