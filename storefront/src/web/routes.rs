// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::web::handlers::{
  admin_handlers as admin, appointment_handlers as appointments, auth_handlers as auth, cart_handlers as cart,
  checkout_handlers as checkout, order_handlers as orders, product_handlers as products, tool_handlers as tools,
};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Mounts the `/api/v1` API. Appointment routes are left out when the module is disabled.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig, appointments_enabled: bool) {
  let mut admin_scope = web::scope("/admin")
    .route("/products", web::get().to(admin::list_products_handler))
    .route("/products", web::post().to(admin::create_product_handler))
    .service(
      web::resource("/products/{product_id}")
        .route(web::put().to(admin::update_product_handler))
        .route(web::delete().to(admin::deactivate_product_handler)),
    )
    .route("/products/{product_id}/stock", web::put().to(admin::set_stock_handler))
    .route("/products/{product_id}/stock/adjust", web::post().to(admin::adjust_stock_handler))
    .route("/inventory/low-stock", web::get().to(admin::low_stock_handler))
    .route("/catalog/seed", web::post().to(admin::seed_catalog_handler))
    .route("/discounts", web::get().to(admin::list_discounts_handler))
    .route("/discounts", web::post().to(admin::create_discount_handler))
    .route("/discounts/{discount_id}", web::put().to(admin::update_discount_handler))
    .route("/discounts/{discount_id}/deactivate", web::post().to(admin::deactivate_discount_handler))
    .route("/invoices", web::get().to(admin::list_invoices_handler))
    .route("/invoices/{invoice_id}", web::get().to(admin::get_invoice_handler))
    .route("/invoices/{invoice_id}/pay", web::post().to(admin::pay_invoice_handler))
    .route("/invoices/{invoice_id}/void", web::post().to(admin::void_invoice_handler))
    .route("/users", web::get().to(admin::list_users_handler))
    .route("/users/{user_id}/role", web::put().to(admin::set_user_role_handler))
    .route("/payment-methods", web::get().to(admin::list_payment_methods_handler))
    .route("/payment-methods", web::post().to(admin::create_payment_method_handler))
    .route("/payment-methods/{method_id}", web::put().to(admin::update_payment_method_handler))
    .route("/orders", web::get().to(admin::list_orders_handler))
    .route("/orders/{order_id}/status", web::post().to(admin::change_order_status_handler));

  if appointments_enabled {
    admin_scope = admin_scope.route(
      "/appointments/slots/bulk",
      web::post().to(appointments::bulk_create_slots_handler),
    );
  }

  let mut api = web::scope("/api/v1")
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/auth")
        .route("/signup", web::post().to(auth::signup_handler))
        .route("/signin", web::post().to(auth::signin_handler))
        .route("/signout", web::post().to(auth::signout_handler))
        .route("/me", web::get().to(auth::me_handler)),
    )
    .service(
      web::scope("/products")
        .route("", web::get().to(products::list_products_handler))
        .route("/{product_id}", web::get().to(products::get_product_handler)),
    )
    .service(
      web::scope("/cart")
        .route("", web::get().to(cart::view_cart_handler))
        .route("", web::delete().to(cart::clear_cart_handler))
        .route("/items", web::post().to(cart::add_cart_item_handler))
        .service(
          web::resource("/items/{product_id}")
            .route(web::put().to(cart::set_cart_item_handler))
            .route(web::delete().to(cart::remove_cart_item_handler)),
        ),
    )
    .route("/payment-methods", web::get().to(products::list_payment_methods_handler))
    .route("/checkout", web::post().to(checkout::checkout_handler))
    .service(
      web::scope("/orders")
        .route("", web::get().to(orders::list_my_orders_handler))
        .route("/{order_id}", web::get().to(orders::get_order_handler)),
    )
    .route("/tools/inventory", web::post().to(tools::inventory_tool_handler))
    .service(admin_scope);

  if appointments_enabled {
    api = api.service(
      web::scope("/appointments")
        .route("/slots", web::get().to(appointments::list_available_slots_handler))
        .route("", web::post().to(appointments::book_appointment_handler))
        .route("", web::get().to(appointments::list_appointments_handler))
        .route("/{appointment_id}/cancel", web::post().to(appointments::cancel_appointment_handler)),
    );
  }

  cfg.service(api);
}
