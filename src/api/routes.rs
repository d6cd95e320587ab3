use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::dispatcher::{dispatch, ParsedRequest};
use super::handlers::{self, HandlerResult};
use super::response::HandlerResponse;
use crate::AppState;

/// The resource a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NotFound,
    Ping,
    Tokens,
    Users,
}

impl Route {
    pub async fn handle(self, state: &AppState, request: &ParsedRequest) -> HandlerResult {
        match self {
            Route::NotFound => handlers::not_found().await,
            Route::Ping => handlers::ping().await,
            Route::Tokens => handlers::tokens::handle(state, request).await,
            Route::Users => handlers::users::handle(state, request).await,
        }
    }
}

/// Fixed mapping from trimmed path to resource, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<&'static str, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        let routes = HashMap::from([
            ("ping", Route::Ping),
            ("tokens", Route::Tokens),
            ("users", Route::Users),
        ]);
        Self { routes }
    }

    /// Unmapped paths resolve to [`Route::NotFound`].
    pub fn resolve(&self, path: &str) -> Route {
        self.routes.get(path).copied().unwrap_or(Route::NotFound)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");

    HandlerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        .into_response()
}
