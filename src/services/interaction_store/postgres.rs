use super::InteractionStore;
use crate::config::StorageConfig;
use crate::error::{RecError, RecResult};
use crate::models::*;
use crate::utils::retry_with_backoff;
use crate::utils::validation::PageRequest;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS interactions (
        seq BIGSERIAL UNIQUE,
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        product_id UUID NOT NULL,
        kind TEXT NOT NULL,
        weight DOUBLE PRECISION NOT NULL,
        metadata JSONB,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS interactions_user_recent
        ON interactions (user_id, created_at DESC, seq DESC)"#,
];

const SELECT_COLUMNS: &str = "id, user_id, product_id, kind, weight, metadata, created_at";

pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub async fn connect(config: &StorageConfig) -> RecResult<Self> {
        let pool = retry_with_backoff(
            || {
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(&config.postgres_url)
            },
            config.connect_retries,
            Duration::from_millis(200),
        )
        .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Connected to PostgreSQL interaction store");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> RecResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn row_to_interaction(row: &PgRow) -> RecResult<Interaction> {
        let kind: String = row.try_get("kind")?;
        let metadata: Option<Json<Metadata>> = row.try_get("metadata")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(Interaction {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            kind: kind.parse().map_err(|_| {
                RecError::Internal(anyhow::anyhow!("stored interaction has unknown kind {:?}", kind))
            })?,
            weight: row.try_get("weight")?,
            metadata: metadata.map(|json| json.0),
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl InteractionStore for PgInteractionStore {
    async fn append(&self, interaction: &Interaction) -> RecResult<()> {
        sqlx::query(
            "INSERT INTO interactions (id, user_id, product_id, kind, weight, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(interaction.product_id)
        .bind(interaction.kind.as_str())
        .bind(interaction.weight)
        .bind(interaction.metadata.clone().map(Json))
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid, request: PageRequest) -> RecResult<InteractionPage> {
        let total = self.count_by_user(user_id).await?;
        let pagination = Pagination::new(request.page, request.limit, total);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM interactions WHERE user_id = $1 \
             ORDER BY created_at DESC, seq DESC LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(request.limit))
        .bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let interactions = rows
            .iter()
            .map(Self::row_to_interaction)
            .collect::<RecResult<Vec<_>>>()?;

        Ok(InteractionPage {
            interactions,
            pagination,
        })
    }

    async fn history(&self, user_id: Uuid) -> RecResult<Vec<Interaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM interactions WHERE user_id = $1 ORDER BY created_at DESC, seq DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn count_by_user(&self, user_id: Uuid) -> RecResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, SubsecRound};

    // Needs a reachable PostgreSQL: DATABASE_URL=postgres://... cargo test -- --ignored
    async fn store() -> Option<PgInteractionStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        let store = PgInteractionStore::from_pool(pool);
        store.ensure_schema().await.unwrap();
        Some(store)
    }

    #[tokio::test]
    #[ignore]
    async fn test_newest_first_paging_with_timestamp_ties() {
        let Some(store) = store().await else {
            return;
        };
        let user = Uuid::new_v4();
        let product = Uuid::new_v4();
        let now = Utc::now().trunc_subsecs(0);

        let older = Interaction::new(user, product, InteractionType::View, 1.0).at(now - ChronoDuration::minutes(5));
        let first = Interaction::new(user, product, InteractionType::Like, 3.0).at(now);
        let second = Interaction::new(user, product, InteractionType::Purchase, 10.0).at(now);
        for interaction in [&older, &first, &second] {
            store.append(interaction).await.unwrap();
        }

        let page = store.list_by_user(user, PageRequest::new(1, 2, 100).unwrap()).await.unwrap();
        let ids: Vec<Uuid> = page.interactions.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.pages, 2);

        let page = store.list_by_user(user, PageRequest::new(2, 2, 100).unwrap()).await.unwrap();
        assert_eq!(page.interactions.len(), 1);
        assert_eq!(page.interactions[0].id, older.id);
        assert_eq!(page.interactions[0].kind, InteractionType::View);

        let past_end = store.list_by_user(user, PageRequest::new(5, 2, 100).unwrap()).await.unwrap();
        assert!(past_end.interactions.is_empty());
        assert_eq!(past_end.pagination.total, 3);

        let history = store.history(user).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, second.id);
        assert_eq!(store.count_by_user(user).await.unwrap(), 3);
    }
}
