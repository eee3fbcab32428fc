use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use tokio::sync::watch;

use crate::types::CallbackOutcome;

/// Receives the OAuth redirect.
///
/// A request carrying `code` or `error` settles the login attempt; the first
/// one wins and later ones leave the outcome untouched. Requests with neither
/// parameter (favicon fetches, stray probes) get a 400 and are ignored.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(outcome): Extension<Arc<watch::Sender<CallbackOutcome>>>,
) -> (StatusCode, Html<String>) {
    if let Some(code) = params.get("code") {
        if settle(&outcome, CallbackOutcome::AuthorizationCode(code.clone())) {
            (
                StatusCode::OK,
                Html(
                    "<h2>Authentication successful!</h2><p>You can close this window.</p>"
                        .to_string(),
                ),
            )
        } else {
            (
                StatusCode::CONFLICT,
                Html("<h4>This login attempt has already completed.</h4>".to_string()),
            )
        }
    } else if let Some(error) = params.get("error") {
        settle(&outcome, CallbackOutcome::AuthorizationError(error.clone()));
        (
            StatusCode::BAD_REQUEST,
            Html(format!(
                "<h4>Authentication failed: {}</h4>",
                html_escape::encode_text(error)
            )),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Html("<h4>Authentication failed: missing code.</h4>".to_string()),
        )
    }
}

/// Records `next` if the attempt is still pending. Returns whether it did.
fn settle(outcome: &watch::Sender<CallbackOutcome>, next: CallbackOutcome) -> bool {
    outcome.send_if_modified(|current| {
        if current.is_pending() {
            *current = next;
            true
        } else {
            false
        }
    })
}
