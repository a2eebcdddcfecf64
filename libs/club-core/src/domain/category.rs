use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("Category name cannot be empty".into()));
        }
        if self.color.trim().is_empty() {
            return Err(CoreError::Validation("Category color cannot be empty".into()));
        }
        Ok(())
    }
}

/// Seed set every new shop starts with.
pub fn default_categories() -> Vec<NewCategory> {
    [
        ("General", "bg-blue-500", "General discussions", 1),
        ("Products", "bg-green-500", "About our products", 2),
        ("Support", "bg-orange-500", "Questions and support", 3),
    ]
    .into_iter()
    .map(|(name, color, description, sort_order)| NewCategory {
        name: name.to_string(),
        color: color.to_string(),
        description: Some(description.to_string()),
        sort_order,
    })
    .collect()
}
