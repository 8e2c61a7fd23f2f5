pub mod postgres;

use crate::error::RecResult;
use crate::models::*;
use crate::utils::validation::PageRequest;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

pub use postgres::PgInteractionStore;

/// Append-only, per-user interaction history.
///
/// All read operations return interactions newest first; interactions with
/// the same timestamp come back in reverse insertion order.
#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    async fn append(&self, interaction: &Interaction) -> RecResult<()>;

    async fn list_by_user(&self, user_id: Uuid, request: PageRequest) -> RecResult<InteractionPage>;

    async fn history(&self, user_id: Uuid) -> RecResult<Vec<Interaction>>;

    async fn count_by_user(&self, user_id: Uuid) -> RecResult<u64>;
}

#[derive(Default)]
pub struct InMemoryInteractionStore {
    by_user: RwLock<HashMap<Uuid, Vec<Interaction>>>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(interactions: &[Interaction]) -> impl Iterator<Item = &Interaction> {
        let mut order: Vec<usize> = (0..interactions.len()).collect();
        // Stable sort on reversed insertion order keeps same-timestamp records newest first.
        order.reverse();
        order.sort_by(|&a, &b| interactions[b].created_at.cmp(&interactions[a].created_at));
        order.into_iter().map(move |i| &interactions[i])
    }
}

#[async_trait::async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn append(&self, interaction: &Interaction) -> RecResult<()> {
        self.by_user
            .write()
            .entry(interaction.user_id)
            .or_default()
            .push(interaction.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid, request: PageRequest) -> RecResult<InteractionPage> {
        let by_user = self.by_user.read();
        let history = by_user.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        let pagination = Pagination::new(request.page, request.limit, history.len() as u64);

        let interactions = Self::newest_first(history)
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(request.limit as usize)
            .cloned()
            .collect();

        Ok(InteractionPage {
            interactions,
            pagination,
        })
    }

    async fn history(&self, user_id: Uuid) -> RecResult<Vec<Interaction>> {
        let by_user = self.by_user.read();
        let history = by_user.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::newest_first(history).cloned().collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> RecResult<u64> {
        Ok(self
            .by_user
            .read()
            .get(&user_id)
            .map_or(0, |history| history.len() as u64))
    }
}
