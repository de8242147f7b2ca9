//! HTTP surface. Operational probes stay open; everything under `/api/v1`
//! except login requires a bearer token issued by the session store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthError, IssuedToken, LoginRequest, SessionStore};
use crate::error::AppError;
use crate::transfers::allocation::{AllocationOptions, AllocationOutcome};
use crate::transfers::district::District;
use crate::transfers::export;
use crate::transfers::roster::Pen;
use crate::transfers::round::{RoundSummary, TransferRound};
use crate::transfers::service::{
    AppliedListing, AppliedQuery, ApplicationForm, DashboardStats, DraftEntry, FinalEntry,
    ListQuery, RosterEntry, RosterQuery, TransferService,
};
use crate::transfers::store::RoundStore;
use crate::transfers::vacancy::{DistrictVacancyView, VacancySlot, VacancyUpdate};

pub struct AppState<S> {
    pub service: TransferService<S>,
    pub sessions: Arc<SessionStore>,
    pub readiness: Arc<AtomicBool>,
    pub metrics: PrometheusHandle,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            service: self.service.clone(),
            sessions: Arc::clone(&self.sessions),
            readiness: Arc::clone(&self.readiness),
            metrics: self.metrics.clone(),
        }
    }
}

/// Router builder exposing the transfer management endpoints.
pub fn transfer_router<S>(
    state: AppState<S>,
    prometheus_layer: PrometheusMetricLayer<'static>,
) -> Router
where
    S: RoundStore + 'static,
{
    let guarded = Router::new()
        .route("/rounds", get(list_rounds::<S>).post(open_round::<S>))
        .route("/rounds/:key", delete(delete_round::<S>))
        .route("/rounds/:key/dashboard", get(dashboard::<S>))
        .route(
            "/rounds/:key/cadre",
            get(cadre_list::<S>).post(cadre_add::<S>),
        )
        .route("/rounds/:key/cadre/import", post(cadre_import::<S>))
        .route(
            "/rounds/:key/cadre/:pen",
            put(cadre_update::<S>).delete(cadre_remove::<S>),
        )
        .route(
            "/rounds/:key/vacancies",
            get(vacancies_get::<S>).put(vacancies_save::<S>),
        )
        .route("/rounds/:key/vacancies/overview", get(vacancy_overview::<S>))
        .route(
            "/rounds/:key/applications",
            get(applied_list::<S>)
                .post(mark_applied::<S>)
                .delete(clear_applications::<S>),
        )
        .route("/rounds/:key/applications/pending", get(pending_applicants::<S>))
        .route("/rounds/:key/applications/unlock-all", post(unlock_all::<S>))
        .route(
            "/rounds/:key/applications/:pen",
            put(update_application::<S>).delete(remove_application::<S>),
        )
        .route("/rounds/:key/applications/:pen/lock", post(set_lock::<S>))
        .route(
            "/rounds/:key/draft",
            get(draft_list::<S>).post(draft_add::<S>).delete(draft_clear::<S>),
        )
        .route("/rounds/:key/draft/autofill", post(run_autofill::<S>))
        .route("/rounds/:key/draft/confirm", post(confirm_draft::<S>))
        .route("/rounds/:key/draft/excluded", get(draft_excluded::<S>))
        .route("/rounds/:key/draft/:pen", delete(draft_remove::<S>))
        .route(
            "/rounds/:key/final",
            get(final_list::<S>).delete(final_clear::<S>),
        )
        .route("/rounds/:key/final/revert", post(final_revert::<S>))
        .route("/rounds/:key/final/excluded", get(final_excluded::<S>))
        .route("/rounds/:key/final/:pen", delete(final_remove::<S>))
        .route("/rounds/:key/export/:file", get(export_csv::<S>))
        .route("/auth/logout", post(logout::<S>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<S>,
        ));

    // Login stays outside the bearer-token guard.
    let api = Router::new()
        .route("/auth/login", post(login::<S>))
        .merge(guarded);

    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint::<S>))
        .route("/metrics", get(metrics_endpoint::<S>))
        .nest("/api/v1", api)
        .layer(prometheus_layer)
        .with_state(state)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn require_auth<S>(
    State(state): State<AppState<S>>,
    request: Request,
    next: Next,
) -> Response
where
    S: RoundStore + 'static,
{
    let authorized = bearer_token(&request)
        .map(|token| state.sessions.authorize(token).is_ok())
        .unwrap_or(false);
    if !authorized {
        return AppError::Auth(AuthError::InvalidToken).into_response();
    }
    next.run(request).await
}

fn parse_round(key: &str) -> Result<TransferRound, AppError> {
    key.parse::<TransferRound>().map_err(AppError::from)
}

// ------------------------------------------------------------------ probes

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: RoundStore + 'static,
{
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };
    (status, Json(payload))
}

async fn metrics_endpoint<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: RoundStore + 'static,
{
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

// -------------------------------------------------------------------- auth

async fn login<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, AppError>
where
    S: RoundStore + 'static,
{
    let issued = state.sessions.login(&request)?;
    Ok(Json(issued))
}

async fn logout<S>(State(state): State<AppState<S>>, request: Request) -> Json<serde_json::Value>
where
    S: RoundStore + 'static,
{
    let revoked = bearer_token(&request)
        .map(|token| state.sessions.logout(token))
        .unwrap_or(false);
    Json(json!({ "revoked": revoked }))
}

// ------------------------------------------------------------------ rounds

async fn list_rounds<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<RoundSummary>>, AppError>
where
    S: RoundStore + 'static,
{
    Ok(Json(state.service.rounds()?))
}

async fn open_round<S>(
    State(state): State<AppState<S>>,
    Json(round): Json<TransferRound>,
) -> Result<(StatusCode, Json<RoundSummary>), AppError>
where
    S: RoundStore + 'static,
{
    let summary = state.service.open_round(&round)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn delete_round<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.delete_round(&round)?;
    Ok(Json(json!({ "deleted": key })))
}

async fn dashboard<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<DashboardStats>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.dashboard(&round)?))
}

// ------------------------------------------------------------------- cadre

async fn cadre_list<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<RosterEntry>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.roster(&round, &query)?))
}

async fn cadre_add<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(record): Json<crate::transfers::roster::EmployeeRecord>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.add_employee(&round, record)?;
    Ok(StatusCode::CREATED)
}

async fn cadre_update<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
    Json(mut record): Json<crate::transfers::roster::EmployeeRecord>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    record.pen = Pen::new(pen);
    state.service.update_employee(&round, record)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cadre_remove<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.remove_employee(&round, &Pen::new(pen))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    csv: String,
    #[serde(default)]
    replace: bool,
}

async fn cadre_import<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let import =
        state
            .service
            .import_roster(&round, request.csv.as_bytes(), request.replace)?;
    Ok(Json(
        json!({ "imported": import.imported, "skipped": import.skipped }),
    ))
}

// --------------------------------------------------------------- vacancies

async fn vacancies_get<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<Vec<(District, VacancySlot)>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.vacancies(&round)?))
}

async fn vacancies_save<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(updates): Json<Vec<VacancyUpdate>>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.save_vacancies(&round, &updates)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vacancy_overview<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<Vec<DistrictVacancyView>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.vacancy_overview(&round)?))
}

// ------------------------------------------------------------ applications

#[derive(Debug, Deserialize)]
struct PendingQuery {
    district: Option<District>,
}

async fn pending_applicants<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<RosterEntry>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(
        state.service.pending_applicants(&round, query.district)?,
    ))
}

async fn applied_list<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Query(query): Query<AppliedQuery>,
) -> Result<Json<AppliedListing>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.applied(&round, &query)?))
}

async fn mark_applied<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(forms): Json<Vec<ApplicationForm>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let marked = state.service.mark_applied(&round, forms)?;
    Ok(Json(json!({ "marked": marked })))
}

async fn update_application<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
    Json(mut form): Json<ApplicationForm>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    form.pen = Pen::new(pen);
    state.service.update_application(&round, form)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_application<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.remove_application(&round, &Pen::new(pen))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_applications<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let removed = state.service.clear_applications(&round)?;
    Ok(Json(json!({ "removed": removed })))
}

#[derive(Debug, Deserialize)]
struct LockRequest {
    locked: bool,
}

async fn set_lock<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
    Json(request): Json<LockRequest>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state
        .service
        .set_lock(&round, &Pen::new(pen), request.locked)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlock_all<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let unlocked = state.service.unlock_all(&round)?;
    Ok(Json(json!({ "unlocked": unlocked })))
}

// ------------------------------------------------------------------- draft

async fn run_autofill<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(options): Json<AllocationOptions>,
) -> Result<Json<AllocationOutcome>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.run_autofill(&round, options)?))
}

async fn draft_list<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DraftEntry>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.draft(&round, &query)?))
}

#[derive(Debug, Deserialize)]
struct DraftAddRequest {
    pen: Pen,
    to_district: District,
}

async fn draft_add<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Json(request): Json<DraftAddRequest>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state
        .service
        .add_draft(&round, &request.pen, request.to_district)?;
    Ok(StatusCode::CREATED)
}

async fn draft_remove<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.remove_draft(&round, &Pen::new(pen))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn draft_clear<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let removed = state.service.clear_draft(&round)?;
    Ok(Json(json!({ "removed": removed })))
}

async fn confirm_draft<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let confirmed = state.service.confirm(&round)?;
    Ok(Json(json!({ "confirmed": confirmed })))
}

async fn draft_excluded<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<AppliedListing>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.draft_excluded(&round)?))
}

// ------------------------------------------------------------------- final

async fn final_list<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FinalEntry>>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.final_list(&round, &query)?))
}

async fn final_remove<S>(
    State(state): State<AppState<S>>,
    Path((key, pen)): Path<(String, String)>,
) -> Result<StatusCode, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    state.service.remove_final(&round, &Pen::new(pen))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn final_clear<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let removed = state.service.revert_confirmation(&round)?;
    Ok(Json(json!({ "removed": removed })))
}

async fn final_revert<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let reverted = state.service.revert_confirmation(&round)?;
    Ok(Json(json!({ "reverted": reverted })))
}

async fn final_excluded<S>(
    State(state): State<AppState<S>>,
    Path(key): Path<String>,
) -> Result<Json<AppliedListing>, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    Ok(Json(state.service.final_excluded(&round)?))
}

// ----------------------------------------------------------------- exports

async fn export_csv<S>(
    State(state): State<AppState<S>>,
    Path((key, file)): Path<(String, String)>,
) -> Result<Response, AppError>
where
    S: RoundStore + 'static,
{
    let round = parse_round(&key)?;
    let body = match file.as_str() {
        "cadre.csv" => export::cadre_csv(&state.service.roster(&round, &RosterQuery::default())?)?,
        "applied.csv" => {
            let listing = state.service.applied(&round, &AppliedQuery::default())?;
            export::applied_csv(&listing.entries)?
        }
        "draft.csv" => export::draft_csv(&state.service.draft(&round, &ListQuery::default())?)?,
        "final.csv" => export::final_csv(&state.service.final_list(&round, &ListQuery::default())?)?,
        _ => {
            let payload = json!({ "error": format!("unknown export '{file}'") });
            return Ok((StatusCode::NOT_FOUND, Json(payload)).into_response());
        }
    };
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file}\""),
            ),
        ],
        body,
    )
        .into_response())
}
