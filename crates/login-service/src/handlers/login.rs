//! Login, logout and username/password authentication handlers.
//!
//! Each handler builds a fresh request context from the shared shutdown token
//! and the configured deadline, hands it to the selected login controller and
//! records the outcome against the controller's backend label.

use crate::controllers::backend_label;
use crate::context::RequestContext;
use crate::errors::LoginError;
use crate::observability::{metrics, outcome};
use crate::repositories::lazy_transaction::LazyTransaction;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use common::types::{
    ApiClientAuthorization, LoginOptions, LoginResponse, LogoutOptions, LogoutResponse,
    UserAuthenticateOptions,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

fn observe<T>(state: &AppState, operation: &str, start: Instant, result: &Result<T, LoginError>) {
    metrics::record_operation(
        backend_label(state.controller.as_ref()),
        operation,
        outcome(result),
        start.elapsed(),
    );
}

/// `GET /login`
#[instrument(
    skip_all,
    name = "login.handler.login",
    fields(callback = !opts.code.is_empty(), remote = %opts.remote)
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(opts): Query<LoginOptions>,
) -> Result<Response, LoginError> {
    let start = Instant::now();
    let mut ctx = RequestContext::new(state.request_cancellation());

    let result = state.controller.login(&mut ctx, opts).await;
    observe(&state, "login", start, &result);

    Ok(login_response(result?))
}

/// A redirect target wins over an HTML body.
fn login_response(resp: LoginResponse) -> Response {
    if resp.redirect_location.is_empty() {
        Html(resp.html).into_response()
    } else {
        Redirect::to(&resp.redirect_location).into_response()
    }
}

/// `GET /logout`
#[instrument(skip_all, name = "login.handler.logout")]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Query(opts): Query<LogoutOptions>,
) -> Result<Response, LoginError> {
    let start = Instant::now();
    let mut ctx = RequestContext::new(state.request_cancellation());

    let result = state.controller.logout(&mut ctx, opts).await;
    observe(&state, "logout", start, &result);

    let LogoutResponse { redirect_location } = result?;
    Ok(Redirect::to(&redirect_location).into_response())
}

/// `POST /arvados/v1/users/authenticate`
///
/// Runs the controller against a credential transaction that is begun on the
/// first lookup and committed only when authentication succeeds.
#[instrument(skip_all, name = "login.handler.user_authenticate")]
pub async fn user_authenticate(
    State(state): State<Arc<AppState>>,
    Json(opts): Json<UserAuthenticateOptions>,
) -> Result<Json<ApiClientAuthorization>, LoginError> {
    let start = Instant::now();

    let result = authenticate_in_transaction(&state, opts).await;
    observe(&state, "user_authenticate", start, &result);

    result.map(Json)
}

async fn authenticate_in_transaction(
    state: &AppState,
    opts: UserAuthenticateOptions,
) -> Result<ApiClientAuthorization, LoginError> {
    let cancellation = state.request_cancellation();
    let mut tx = LazyTransaction::new(state.pool.clone(), cancellation.clone());

    let authorization = {
        let mut ctx = RequestContext::new(cancellation).with_transaction(&mut tx);
        state.controller.user_authenticate(&mut ctx, opts).await?
    };

    tx.commit().await?;
    Ok(authorization)
}
