pub mod category;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod scope;
pub mod shop;
pub mod user;
