use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub shop_id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: String,
    pub author_id: String,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.content.trim().is_empty() || self.author_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Content and author_id are required".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_or_author_is_rejected() {
        let mut comment = NewComment {
            post_id: "post-1".into(),
            author_id: "user-1".into(),
            content: "  ".into(),
        };
        assert!(matches!(comment.validate(), Err(CoreError::Validation(_))));

        comment.content = "Nice".into();
        assert!(comment.validate().is_ok());

        comment.author_id = String::new();
        assert!(matches!(comment.validate(), Err(CoreError::Validation(_))));
    }
}
