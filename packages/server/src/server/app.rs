//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use twilio::{TwilioOptions, TwilioService};

use crate::config::Config;
use crate::kernel::{
    BaseMediaStore, BaseSmsService, CloudinaryClient, LoggingSmsService, PgAgentStore,
    PgOtpStore, PgPolicyStore, PgRefreshTokenStore, ServerDeps, TwilioAdapter,
};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    create_policy_handler, get_policy_handler, login_agent_handler, login_handler,
    logout_handler, me_handler, ping_handler, refresh_token_handler, register_agent_handler,
    send_otp_handler, submit_application_handler, upload_files_handler, ROLE_HEADER,
};
use crate::server::static_files::serve_public;

/// Whole-request cap for multipart routes; single files are capped lower.
pub const MAX_UPLOAD_BODY_BYTES: usize = 50 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(150);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
}

/// Wire production dependencies: Postgres stores plus whichever external
/// services are configured.
pub fn build_server_deps(config: Config, pool: PgPool) -> Result<ServerDeps> {
    let sms: Arc<dyn BaseSmsService> = match &config.twilio {
        Some(settings) => {
            info!("SMS delivery via Twilio");
            Arc::new(TwilioAdapter::new(Arc::new(TwilioService::new(
                TwilioOptions {
                    account_sid: settings.account_sid.clone(),
                    auth_token: settings.auth_token.clone(),
                    from_number: settings.from_number.clone(),
                },
            ))))
        }
        None => {
            warn!("Twilio not configured, OTP codes will be logged instead of sent");
            Arc::new(LoggingSmsService)
        }
    };

    let media: Option<Arc<dyn BaseMediaStore>> = match &config.cloudinary {
        Some(settings) => Some(Arc::new(CloudinaryClient::new(settings.clone())?)),
        None => {
            warn!("Cloudinary not configured, uploads are disabled");
            None
        }
    };

    Ok(ServerDeps::new(
        config,
        Arc::new(PgAgentStore::new(pool.clone())),
        Arc::new(PgOtpStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool.clone())),
        Arc::new(PgPolicyStore::new(pool)),
        sms,
        media,
    ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // Credentials rule out the literal wildcard, so `*` echoes the caller.
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(ROLE_HEADER),
        ])
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps) -> Router {
    let cors = cors_layer(&deps.config.cors_origins);
    let state = AppState {
        deps: Arc::new(deps),
    };
    let require_session = middleware::from_fn_with_state(state.clone(), jwt_auth_middleware);

    let authenticated = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        .route("/policy", post(create_policy_handler))
        .route("/policy/:id", get(get_policy_handler))
        .route("/policy/:id/applications", post(submit_application_handler))
        .route_layer(require_session);

    let uploads = Router::new()
        .route("/auth/register-agent", post(register_agent_handler))
        .route("/files/upload", post(upload_files_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES));

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/auth/send-otp", post(send_otp_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/login-agent", post(login_agent_handler))
        .route("/auth/refresh-token", post(refresh_token_handler))
        .merge(authenticated)
        .merge(uploads)
        .fallback(serve_public)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
