use actix_web::web;

use crate::web::handlers::{auth_handlers, cart_handlers, product_handlers, wishlist_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called from `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/profile", web::get().to(auth_handlers::profile_handler))
          .route("/update", web::put().to(auth_handlers::update_profile_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/users", web::get().to(auth_handlers::list_users_handler))
          .route("/users/{user_id}/approve", web::put().to(auth_handlers::approve_user_handler))
          .route("/users/{user_id}/restrict", web::put().to(auth_handlers::restrict_user_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/add/{product_id}", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/increase/{product_id}", web::put().to(cart_handlers::increase_quantity_handler))
          .route("/decrease/{product_id}", web::put().to(cart_handlers::decrease_quantity_handler))
          .route("/remove/{product_id}", web::delete().to(cart_handlers::remove_from_cart_handler))
          .route("/checkout", web::post().to(cart_handlers::checkout_handler))
          .route("/checkout-selected", web::post().to(cart_handlers::checkout_selected_handler)),
      )
      .service(
        web::scope("/wishlist")
          .route("", web::get().to(wishlist_handlers::get_wishlist_handler))
          .route("", web::delete().to(wishlist_handlers::clear_wishlist_handler))
          .route("/contains/{product_id}", web::get().to(wishlist_handlers::contains_handler))
          .route("/{product_id}", web::post().to(wishlist_handlers::add_to_wishlist_handler))
          .route("/{product_id}", web::delete().to(wishlist_handlers::remove_from_wishlist_handler)),
      ),
  );
}
