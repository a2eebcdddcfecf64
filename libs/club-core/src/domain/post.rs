use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub shop_id: String,
    pub author_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty()
            || self.content.trim().is_empty()
            || self.author_id.trim().is_empty()
        {
            return Err(CoreError::Validation(
                "Title, content, and author_id are required".into(),
            ));
        }
        Ok(())
    }
}
