use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_REACTION_TYPE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub shop_id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub reaction_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReaction {
    pub post_id: String,
    pub user_id: String,
    pub reaction_type: String,
}

impl NewReaction {
    /// Reaction types are compared case-insensitively, so `like` and `LIKE`
    /// toggle the same reaction.
    pub fn new(post_id: String, user_id: String, reaction_type: &str) -> Self {
        Self {
            post_id,
            user_id,
            reaction_type: reaction_type.trim().to_ascii_uppercase(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.reaction_type.is_empty() || self.user_id.trim().is_empty() {
            return Err(CoreError::Validation("Type and user_id are required".into()));
        }
        if self.reaction_type.len() > MAX_REACTION_TYPE_LEN {
            return Err(CoreError::Validation(format!(
                "Reaction type may not exceed {MAX_REACTION_TYPE_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Outcome of toggling a user's reaction on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReactionToggle {
    Created {
        reaction: Reaction,
    },
    /// The user had reacted with a different type; it was replaced.
    Updated {
        reaction: Reaction,
    },
    /// The user reacted with the same type again; it was removed.
    Removed {
        #[serde(rename = "type")]
        reaction_type: String,
    },
}
