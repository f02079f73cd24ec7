//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GoogleBooksAdapter, PgStore},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        library::{
            add_book_handler, list_library_handler, remove_book_handler,
            update_progress_handler, update_status_handler,
        },
        middleware::require_auth,
        profile::{get_profile_handler, onboarding_handler, update_profile_handler},
        rest::{popular_books_handler, search_books_handler, ApiDoc},
        social::{
            list_friends_handler, list_requests_handler, remove_friend_handler,
            respond_request_handler, search_users_handler, send_request_handler,
        },
        state::AppState,
        tracking::{
            log_reading_handler, record_session_handler, stats_handler, streaks_handler,
            upsert_today_handler,
        },
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use chapterly_core::{
    LibraryLedger, ProfileService, ReadingTracker, SessionRecorder, SocialService, StreakEngine,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Catalog Adapter ---
    let catalog = Arc::new(GoogleBooksAdapter::new(
        config.books_api_base.clone(),
        config.books_search_limit,
    ));

    // --- 4. Build the Core Services ---
    let ledger = LibraryLedger::new(store.clone());
    let recorder = SessionRecorder::new(store.clone());
    let streaks = StreakEngine::new(store.clone());
    let tracker = ReadingTracker::new(ledger.clone(), recorder.clone(), streaks.clone());
    let profiles = ProfileService::new(store.clone());
    let social = SocialService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth: store.clone(),
        catalog,
        ledger,
        recorder,
        streaks,
        tracker,
        profiles,
        social,
    });

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/books/search", get(search_books_handler))
        .route("/books/popular", get(popular_books_handler))
        .route("/library", post(add_book_handler).get(list_library_handler))
        .route("/library/{id}", delete(remove_book_handler))
        .route("/library/{id}/status", patch(update_status_handler))
        .route("/library/{id}/progress", patch(update_progress_handler))
        .route("/sessions", post(record_session_handler))
        .route("/sessions/log", post(log_reading_handler))
        .route("/stats", get(stats_handler))
        .route("/streaks", get(streaks_handler))
        .route("/streaks/today", post(upsert_today_handler))
        .route(
            "/profile",
            get(get_profile_handler).patch(update_profile_handler),
        )
        .route("/profile/onboarding", post(onboarding_handler))
        .route("/friends", get(list_friends_handler))
        .route("/friends/{id}", delete(remove_friend_handler))
        .route(
            "/friends/requests",
            get(list_requests_handler).post(send_request_handler),
        )
        .route(
            "/friends/requests/{id}/respond",
            post(respond_request_handler),
        )
        .route("/users/search", get(search_users_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
