pub mod create_category;
pub mod create_comment;
pub mod create_post;
pub mod toggle_reaction;
pub mod update_user_role;

pub use create_category::CreateCategoryHandler;
pub use create_comment::CreateCommentHandler;
pub use create_post::CreatePostHandler;
pub use toggle_reaction::ToggleReactionHandler;
pub use update_user_role::UpdateUserRoleHandler;
