// HTTP query API
//
// Paginated listing per signal, distinct services, and the typed query
// dispatcher. All reads go through the storage port.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use telemorph_core::SignalType;
use telemorph_storage::{dispatch, fetch, QueryError, QueryPage, QueryRequest};

use crate::{AppError, AppState};

/// `?limit=&offset=` on listing endpoints. Negative or non-numeric values are
/// rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /api/v1/traces
pub(crate) async fn list_traces(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<QueryPage>, AppError> {
    list(SignalType::Traces, &state, params).await
}

/// GET /api/v1/metrics
pub(crate) async fn list_metrics(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<QueryPage>, AppError> {
    list(SignalType::Metrics, &state, params).await
}

/// GET /api/v1/logs
pub(crate) async fn list_logs(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<QueryPage>, AppError> {
    list(SignalType::Logs, &state, params).await
}

async fn list(
    signal: SignalType,
    state: &AppState,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<QueryPage>, AppError> {
    counter!("telemorph.query.requests", "signal" => signal.as_str()).increment(1);

    let Query(params) = params.map_err(|rejection| {
        AppError::bad_request(anyhow::anyhow!(
            "Invalid pagination parameters: {}",
            rejection.body_text()
        ))
    })?;

    let page = state.query_limits.page(params.limit, params.offset);
    let result = fetch(state.store.as_ref(), signal, page)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(result))
}

/// GET /api/v1/services
pub(crate) async fn list_services(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    counter!("telemorph.query.requests", "signal" => "services").increment(1);

    let services = state
        .store
        .get_services()
        .await
        .map_err(AppError::internal)?;

    Ok(Json(json!({ "services": services })))
}

/// POST /api/v1/query
pub(crate) async fn run_query(
    State(state): State<AppState>,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryPage>, AppError> {
    let Json(request) = request.map_err(|rejection| {
        AppError::bad_request(anyhow::anyhow!(
            "Invalid query request: {}",
            rejection.body_text()
        ))
    })?;

    counter!("telemorph.query.requests", "signal" => "query").increment(1);

    match dispatch(state.store.as_ref(), &request, &state.query_limits).await {
        Ok(page) => Ok(Json(page)),
        Err(e @ QueryError::UnknownSignal(_)) => Err(AppError::bad_request(e)),
        Err(QueryError::Storage(e)) => Err(AppError::internal(e)),
    }
}
