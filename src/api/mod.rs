use crate::auth::AuthUser;
use crate::error::{RecError, RecResult};
use crate::models::*;
use crate::utils::validation::PageRequest;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            error_kind: None,
        }
    }

    pub fn error(kind: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            error_kind: Some(kind.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordInteractionBody {
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    limit: Option<i64>,
    #[serde(default)]
    metadata: bool,
}

fn query_error(rejection: QueryRejection) -> RecError {
    RecError::Validation(rejection.body_text())
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "storefront-recommendations".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn record_interaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<RecordInteractionBody>, JsonRejection>,
) -> RecResult<(StatusCode, Json<ApiResponse<Interaction>>)> {
    let Json(body) = body.map_err(|rejection| RecError::Validation(rejection.body_text()))?;

    let interaction = state
        .recorder
        .record(user_id, body.product_id, &body.kind, body.metadata)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(interaction))))
}

async fn list_interactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> RecResult<Json<ApiResponse<InteractionPage>>> {
    let Query(query) = query.map_err(query_error)?;
    let pagination = &state.config.pagination;
    let request = PageRequest::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(i64::from(pagination.default_limit)),
        pagination.max_limit,
    )?;

    let page = state.store.list_by_user(user_id, request).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn get_recommendations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> RecResult<Json<ApiResponse<RecommendationResponse>>> {
    let Query(query) = query.map_err(query_error)?;
    let limit = query
        .limit
        .unwrap_or(state.config.recommendation.default_limit as i64);

    let response = state
        .recommendation_service
        .recommend_products(user_id, limit, query.metadata)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/interactions", get(list_interactions).post(record_interaction))
        .route("/recommendations", get(get_recommendations))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
