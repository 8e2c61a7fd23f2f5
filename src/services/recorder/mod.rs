use crate::config::InteractionWeights;
use crate::error::{RecError, RecResult};
use crate::models::*;
use crate::services::catalog::{ProductCatalog, UserDirectory};
use crate::services::interaction_store::InteractionStore;
use crate::utils::validation::validate_metadata;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct InteractionRecorder {
    store: Arc<dyn InteractionStore>,
    catalog: Arc<dyn ProductCatalog>,
    users: Arc<dyn UserDirectory>,
    weights: InteractionWeights,
}

impl InteractionRecorder {
    pub fn new(
        store: Arc<dyn InteractionStore>,
        catalog: Arc<dyn ProductCatalog>,
        users: Arc<dyn UserDirectory>,
        weights: InteractionWeights,
    ) -> Self {
        Self {
            store,
            catalog,
            users,
            weights,
        }
    }

    /// Parses `kind` and records the interaction. See [`Self::record_kind`].
    pub async fn record(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        kind: &str,
        metadata: Option<Metadata>,
    ) -> RecResult<Interaction> {
        let kind: InteractionType = kind.parse()?;
        self.record_kind(user_id, product_id, kind, metadata).await
    }

    /// Appends one interaction whose weight comes from the weight table.
    pub async fn record_kind(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        kind: InteractionType,
        metadata: Option<Metadata>,
    ) -> RecResult<Interaction> {
        if let Some(metadata) = &metadata {
            validate_metadata(kind, metadata)?;
        }

        if !self.users.user_exists(user_id).await? {
            return Err(RecError::NotFound(format!("user {}", user_id)));
        }
        if !self.catalog.product_exists(product_id).await? {
            return Err(RecError::NotFound(format!("product {}", product_id)));
        }

        let weight = self.weights.weight_for(kind);
        let mut interaction = Interaction::new(user_id, product_id, kind, weight);
        if let Some(metadata) = metadata {
            interaction = interaction.with_metadata(metadata);
        }

        self.store.append(&interaction).await?;
        debug!(
            user_id = %user_id,
            product_id = %product_id,
            kind = %kind,
            weight,
            "Recorded interaction"
        );
        Ok(interaction)
    }
}
