//! Business logic. Each function takes the pool (or, for checkout's inner
//! unit of work, a transaction connection) explicitly; there is no ambient
//! database state.

pub mod auth_service;
pub mod cart_service;
pub mod product_service;
pub mod wishlist_service;
