use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{
    BulkScoreUpdate, Identity, OrganizationDraft, Registration, ScoreSubmission, StorageKey,
};
use super::repository::{CredentialService, RepositoryError, ScoreRepository};
use super::service::{ScoreEngine, ScoreError};

/// Header carrying the identity of the signer behind a mutating request.
pub const SIGNER_HEADER: &str = "x-growth-signer";

/// Router builder exposing organization and score lifecycle endpoints.
pub fn scoring_router<R, C>(engine: Arc<ScoreEngine<R, C>>) -> Router
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    Router::new()
        .route(
            "/api/v1/organizations",
            post(create_organization_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization",
            get(organization_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization/applicants",
            post(register_handler::<R, C>).get(list_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization/applicants/:applicant",
            get(status_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization/applicants/:applicant/verify",
            post(verify_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization/applicants/:applicant/scores",
            post(receive_handler::<R, C>).put(bulk_update_handler::<R, C>),
        )
        .route(
            "/api/v1/organizations/:organization/applicants/:applicant/send",
            post(send_handler::<R, C>),
        )
        .with_state(engine)
}

/// HTTP status for each engine failure.
pub fn status_for(error: &ScoreError) -> StatusCode {
    match error {
        ScoreError::InvalidConfig(_)
        | ScoreError::ScoreShape { .. }
        | ScoreError::FutureTimestamp { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScoreError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        ScoreError::OrganizationNotFound { .. }
        | ScoreError::RecordNotFound { .. }
        | ScoreError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScoreError::OrganizationExists { .. }
        | ScoreError::AlreadyRegistered { .. }
        | ScoreError::InvalidState { .. }
        | ScoreError::EmptyScore
        | ScoreError::InsufficientScores { .. }
        | ScoreError::NotVerified { .. }
        | ScoreError::AlreadySent
        | ScoreError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ScoreError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        ScoreError::Repository(_) | ScoreError::Credential(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ScoreError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        ScoreError::CooldownActive { remaining_seconds } => json!({
            "error": error.to_string(),
            "remaining_seconds": remaining_seconds,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}

fn signer(headers: &HeaderMap) -> Result<Identity, Response> {
    match headers
        .get(SIGNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(value) => Ok(Identity::new(value)),
        None => {
            let payload = json!({
                "error": format!("missing {SIGNER_HEADER} header"),
            });
            Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
        }
    }
}

pub(crate) async fn create_organization_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<OrganizationDraft>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.create_organization(&caller, draft) {
        Ok(organization) => (StatusCode::CREATED, axum::Json(organization)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn organization_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path(organization): Path<String>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    match engine.organization(&StorageKey(organization)) {
        Ok(organization) => (StatusCode::OK, axum::Json(organization)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path(organization): Path<String>,
    headers: HeaderMap,
    axum::Json(registration): axum::Json<Registration>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.register(&caller, &StorageKey(organization), registration) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path(organization): Path<String>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    match engine.records(&StorageKey(organization)) {
        Ok(records) => {
            let views = records
                .iter()
                .map(|record| record.status_view())
                .collect::<Vec<_>>();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path((organization, applicant)): Path<(String, String)>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    match engine.record(&StorageKey(organization), &Identity::new(applicant)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verify_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path((organization, applicant)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.verify(
        &caller,
        &StorageKey(organization),
        &Identity::new(applicant),
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn receive_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path((organization, applicant)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ScoreSubmission>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.receive_score(
        &caller,
        &StorageKey(organization),
        &Identity::new(applicant),
        submission,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bulk_update_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path((organization, applicant)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<BulkScoreUpdate>,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.update_scores(
        &caller,
        &StorageKey(organization),
        &Identity::new(applicant),
        update,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn send_handler<R, C>(
    State(engine): State<Arc<ScoreEngine<R, C>>>,
    Path((organization, applicant)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ScoreRepository + 'static,
    C: CredentialService + 'static,
{
    let caller = match signer(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match engine.send_score(
        &caller,
        &StorageKey(organization),
        &Identity::new(applicant),
    ) {
        Ok(record) => {
            let payload = json!({
                "record": record.status_view(),
                "published": record.published,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
