use crate::error::{RecError, RecResult};
use crate::models::{InteractionType, Metadata};

pub const MAX_METADATA_KEYS: usize = 32;
pub const MAX_METADATA_KEY_LEN: usize = 64;

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64, max_limit: u32) -> RecResult<Self> {
        if page < 1 {
            return Err(RecError::Validation("page must be a positive integer".to_string()));
        }
        if limit < 1 {
            return Err(RecError::Validation("limit must be a positive integer".to_string()));
        }
        if limit > i64::from(max_limit) {
            return Err(RecError::Validation(format!(
                "limit too large (max {})",
                max_limit
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| RecError::Validation("page out of range".to_string()))?;

        Ok(Self {
            page,
            limit: limit as u32,
        })
    }
}

pub fn validate_recommendation_limit(limit: i64, max_limit: usize) -> RecResult<usize> {
    if limit < 1 {
        return Err(RecError::Validation("limit must be a positive integer".to_string()));
    }
    let limit = usize::try_from(limit)
        .map_err(|_| RecError::Validation("limit out of range".to_string()))?;
    if limit > max_limit {
        return Err(RecError::Validation(format!(
            "limit too large (max {})",
            max_limit
        )));
    }
    Ok(limit)
}

pub fn validate_metadata(kind: InteractionType, metadata: &Metadata) -> RecResult<()> {
    if metadata.len() > MAX_METADATA_KEYS {
        return Err(RecError::Validation(format!(
            "metadata has too many keys (max {})",
            MAX_METADATA_KEYS
        )));
    }

    for key in metadata.keys() {
        if key.is_empty() {
            return Err(RecError::Validation("metadata keys cannot be empty".to_string()));
        }
        if key.chars().count() > MAX_METADATA_KEY_LEN {
            return Err(RecError::Validation(format!(
                "metadata key too long (max {} characters)",
                MAX_METADATA_KEY_LEN
            )));
        }
    }

    if kind == InteractionType::Rating {
        if let Some(rating) = metadata.get("rating") {
            match rating.as_f64() {
                Some(value) if (1.0..=5.0).contains(&value) => {}
                _ => {
                    return Err(RecError::Validation(
                        "rating must be a number between 1 and 5".to_string(),
                    ))
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(1, 10, 100).unwrap(), PageRequest { page: 1, limit: 10 });
        assert!(matches!(PageRequest::new(0, 10, 100), Err(RecError::Validation(_))));
        assert!(matches!(PageRequest::new(1, 0, 100), Err(RecError::Validation(_))));
        assert!(matches!(PageRequest::new(-3, 10, 100), Err(RecError::Validation(_))));
        assert!(matches!(PageRequest::new(1, 101, 100), Err(RecError::Validation(_))));
    }

    #[test]
    fn test_recommendation_limit() {
        assert_eq!(validate_recommendation_limit(5, 100).unwrap(), 5);
        assert!(validate_recommendation_limit(0, 100).is_err());
        assert!(validate_recommendation_limit(-1, 100).is_err());
        assert!(validate_recommendation_limit(101, 100).is_err());
    }

    #[test]
    fn test_rating_metadata() {
        let ok = metadata(json!({ "rating": 4 }));
        assert!(validate_metadata(InteractionType::Rating, &ok).is_ok());

        let out_of_range = metadata(json!({ "rating": 7 }));
        assert!(validate_metadata(InteractionType::Rating, &out_of_range).is_err());

        let not_a_number = metadata(json!({ "rating": "five" }));
        assert!(validate_metadata(InteractionType::Rating, &not_a_number).is_err());

        // Only rating interactions constrain the rating key.
        assert!(validate_metadata(InteractionType::View, &out_of_range).is_ok());
    }

    #[test]
    fn test_metadata_key_limits() {
        let mut too_many = Metadata::new();
        for i in 0..=MAX_METADATA_KEYS {
            too_many.insert(format!("k{}", i), json!(i));
        }
        assert!(validate_metadata(InteractionType::View, &too_many).is_err());

        let empty_key = metadata(json!({ "": 1 }));
        assert!(validate_metadata(InteractionType::Like, &empty_key).is_err());
    }
}
