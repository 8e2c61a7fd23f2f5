pub mod expansion;

use crate::error::RecResult;
use crate::models::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub use expansion::AttributeSimilarity;

/// Proposes products beyond the ones a user has interacted with.
#[async_trait::async_trait]
pub trait CandidateGenerator: Send + Sync {
    /// `seeds` are ranked direct scores; nothing in `exclude` may be returned.
    async fn expand(
        &self,
        seeds: &[ProductScore],
        exclude: &HashSet<Uuid>,
    ) -> RecResult<Vec<ProductScore>>;
}

/// Sums interaction weights per product. Sums are clamped at zero.
pub fn aggregate_scores(interactions: &[Interaction]) -> Vec<ProductScore> {
    let mut by_product: HashMap<Uuid, ProductScore> = HashMap::new();

    for interaction in interactions {
        let entry = by_product
            .entry(interaction.product_id)
            .or_insert_with(|| ProductScore {
                product_id: interaction.product_id,
                score: 0.0,
                last_interaction_at: interaction.created_at,
                interactions: 0,
            });
        entry.score += interaction.weight;
        entry.interactions += 1;
        if interaction.created_at > entry.last_interaction_at {
            entry.last_interaction_at = interaction.created_at;
        }
    }

    by_product
        .into_values()
        .map(|mut score| {
            score.score = score.score.max(0.0);
            score
        })
        .collect()
}

/// Score desc, then most recent interaction desc, then product id asc.
pub fn compare_scores(a: &ProductScore, b: &ProductScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.last_interaction_at.cmp(&a.last_interaction_at))
        .then_with(|| a.product_id.cmp(&b.product_id))
}

pub fn rank(scores: &mut [ProductScore]) {
    scores.sort_by(compare_scores);
}

/// Aggregated, ranked products with a positive score.
pub fn direct_scores(interactions: &[Interaction]) -> Vec<ProductScore> {
    let mut scores: Vec<ProductScore> = aggregate_scores(interactions)
        .into_iter()
        .filter(|score| score.score > 0.0)
        .collect();
    rank(&mut scores);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn interaction(product_id: Uuid, kind: InteractionType, weight: f64, minutes_ago: i64) -> Interaction {
        Interaction::new(Uuid::nil(), product_id, kind, weight)
            .at(Utc::now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_weights_summed_per_product() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let history = vec![
            interaction(p1, InteractionType::View, 1.0, 3),
            interaction(p1, InteractionType::Purchase, 10.0, 2),
            interaction(p2, InteractionType::View, 1.0, 1),
        ];

        let ranked = direct_scores(&history);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id, p1);
        assert_eq!(ranked[0].score, 11.0);
        assert_eq!(ranked[0].interactions, 2);
        assert_eq!(ranked[1].product_id, p2);
        assert_eq!(ranked[1].score, 1.0);
    }

    #[test]
    fn test_negative_sums_clamped_and_dropped() {
        let p1 = Uuid::new_v4();
        let history = vec![
            interaction(p1, InteractionType::View, 1.0, 5),
            interaction(p1, InteractionType::RemoveFromCart, -2.0, 4),
            interaction(p1, InteractionType::RemoveFromCart, -2.0, 3),
        ];

        let aggregated = aggregate_scores(&history);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].score, 0.0);
        assert!(direct_scores(&history).is_empty());
    }

    #[test]
    fn test_ties_broken_by_recency_then_id() {
        let older = Uuid::from_u128(1);
        let newer = Uuid::from_u128(2);
        let history = vec![
            interaction(older, InteractionType::Like, 3.0, 10),
            interaction(newer, InteractionType::Like, 3.0, 1),
        ];
        let ranked = direct_scores(&history);
        assert_eq!(ranked[0].product_id, newer);

        let at = Utc::now();
        let low_id = Uuid::from_u128(5);
        let high_id = Uuid::from_u128(9);
        let same_time = vec![
            Interaction::new(Uuid::nil(), high_id, InteractionType::Like, 3.0).at(at),
            Interaction::new(Uuid::nil(), low_id, InteractionType::Like, 3.0).at(at),
        ];
        let ranked = direct_scores(&same_time);
        assert_eq!(ranked[0].product_id, low_id);
        assert_eq!(ranked[1].product_id, high_id);
    }

    #[test]
    fn test_ranking_is_deterministic_under_permutation() {
        let at = Utc::now();
        let mut history: Vec<Interaction> = (0..20u128)
            .map(|i| {
                Interaction::new(Uuid::nil(), Uuid::from_u128(i % 7), InteractionType::View, 1.0)
                    .at(at - Duration::seconds((i % 3) as i64))
            })
            .collect();

        let first: Vec<Uuid> = direct_scores(&history).iter().map(|s| s.product_id).collect();
        history.reverse();
        let second: Vec<Uuid> = direct_scores(&history).iter().map(|s| s.product_id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_history() {
        assert!(direct_scores(&[]).is_empty());
    }
}
