use crate::config::QualityThresholds;
use crate::error::RecError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Like,
    AddToCart,
    RemoveFromCart,
    Rating,
    Purchase,
}

impl InteractionType {
    pub const ALL: [InteractionType; 6] = [
        InteractionType::View,
        InteractionType::Like,
        InteractionType::AddToCart,
        InteractionType::RemoveFromCart,
        InteractionType::Rating,
        InteractionType::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::AddToCart => "add_to_cart",
            InteractionType::RemoveFromCart => "remove_from_cart",
            InteractionType::Rating => "rating",
            InteractionType::Purchase => "purchase",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InteractionType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RecError::InvalidType(s.to_string()))
    }
}

/// A single recorded user action against a product. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(user_id: Uuid, product_id: Uuid, kind: InteractionType, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            kind,
            weight,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Read-only product fields joined into responses. Owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

impl ProductSnapshot {
    pub fn new(id: Uuid, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
            price,
            sale_price: None,
            category: None,
            brand: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_sale_price(mut self, sale_price: f64) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    Good,
    High,
}

impl QualityTier {
    pub fn from_count(count: u64, thresholds: &QualityThresholds) -> Self {
        if count >= thresholds.high {
            QualityTier::High
        } else if count >= thresholds.good {
            QualityTier::Good
        } else if count >= thresholds.medium {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

/// Aggregated affinity of one user for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductScore {
    pub product_id: Uuid,
    pub score: f64,
    pub last_interaction_at: DateTime<Utc>,
    pub interactions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub product_id: Uuid,
    pub score: f64,
    pub quality_tier: QualityTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
    pub total: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionPage {
    pub interactions: Vec<Interaction>,
    pub pagination: Pagination,
}

/// Product summary returned by the recommendation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub sale_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub quality_tier: QualityTier,
    pub total_interactions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: Uuid,
    pub recommendations: Vec<RecommendedProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
    pub generated_at: DateTime<Utc>,
}
