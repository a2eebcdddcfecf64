pub mod shop_context;

pub use shop_context::{SHOP_COOKIE_ATTRIBUTES, shop_context};
