//! Data structures representing database entities.

pub mod cart_item;
pub mod product;
pub mod user;
pub mod wishlist_item;

// Re-export the model structs for convenient access
pub use cart_item::CartItem;
pub use product::Product;
pub use user::User;
pub use wishlist_item::WishlistItem;
