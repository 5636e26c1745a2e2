//! Bazaarline - self-hosted multi-seller storefront service.

use anyhow::{Context, Result};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaarline::auth::AuthKeys;
use bazaarline::handlers::{address, admin, auth, cart, orders, products, seller, wishlist};
use bazaarline::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL").context("DATABASE_URL not set")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => async_nats::connect(&url).await.ok(),
        Err(_) => None,
    };
    let auth_keys = AuthKeys::from_secret(
        std::env::var("JWT_SECRET")
            .context("JWT_SECRET not set")?
            .as_bytes(),
    );

    let state = AppState {
        db,
        nats,
        auth: auth_keys,
    };

    let api = Router::new()
        // identity
        .route("/signup", post(auth::signup))
        .route("/verify-email", get(auth::verify_email))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        // catalog
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/similar", get(products::similar_products))
        .route("/products/:id/reviews", post(products::create_review))
        .route("/brands", get(products::list_brands))
        // cart
        .route("/cart", get(cart::get_cart).patch(cart::update_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/total", get(cart::cart_total))
        // addresses
        .route("/address", get(address::list_addresses).post(address::create_address))
        .route(
            "/address/:id",
            patch(address::update_address).delete(address::delete_address),
        )
        // orders and coupons
        .route("/order", get(orders::my_orders).post(orders::place_order))
        .route("/coupon", post(orders::evaluate_coupon))
        // wishlist
        .route("/wishlist", get(wishlist::get_wishlist))
        .route("/wishlist/toggle", post(wishlist::toggle_wishlist))
        // seller
        .route(
            "/my-products",
            get(seller::my_products).post(seller::create_product),
        )
        .route(
            "/my-products/:id",
            get(seller::get_my_product)
                .patch(seller::update_my_product)
                .delete(seller::delete_my_product),
        )
        .route(
            "/seller/orders",
            get(seller::seller_orders).patch(seller::advance_order_item),
        )
        .route("/seller/dashboard", get(seller::seller_dashboard))
        // admin
        .route("/admin/login", post(admin::admin_login))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", delete(admin::delete_user))
        .route("/admin/sellers", get(admin::list_sellers))
        .route("/admin/products", get(admin::list_all_products))
        .route("/admin/products/:id", delete(admin::delete_product))
        .route("/admin/orders", get(admin::list_all_orders))
        .route("/admin/orders/:id", patch(admin::update_order))
        .route("/admin/dashboard", get(admin::admin_dashboard));

    let app = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bazaarline"})) }),
        )
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("bazaarline listening on 0.0.0.0:{}", port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?,
        app,
    )
    .await?;
    Ok(())
}
