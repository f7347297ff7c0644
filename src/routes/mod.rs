mod health;
mod translation;
mod words;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::services::word_store::WordStoreError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .nest("/health", health::router())
        .route("/api/translate", post(translation::translate))
        .route("/api/show-alternatives", post(translation::show_alternatives))
        .route("/api/check-translation", post(translation::check_translation))
        .route("/api/create-word", post(words::create_word))
        .route("/api/word-pairs", post(words::add_word_pair))
        .route(
            "/api/word-list",
            get(words::get_word_list).put(words::save_word_list),
        )
        .route("/api/filter-words", post(words::filter_words))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}

/// Runs word-list file I/O on the blocking pool.
pub(crate) async fn on_word_store<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, WordStoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result.map_err(AppError::from),
        Err(err) => {
            tracing::error!(error = %err, "word list task failed");
            Err(AppError::internal("word list task failed"))
        }
    }
}
