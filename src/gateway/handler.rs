use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::gateway::error::GatewayError;
use crate::gateway::state::GatewayState;
use crate::model::{HighlightResult, Query, SavedQuerySummary};
use crate::oracle::{OracleCredentials, RelevanceOracle};
use crate::pipeline::STATUS_HEADER;
use crate::store::QueryStore;

/// Request header carrying a per-request oracle key. Wins over a key in
/// the request body.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Deserialize)]
pub struct HighlightRequest {
    pub text: String,
    pub question: String,
    /// Optional per-request oracle key. Used for this call only, never
    /// persisted and never logged.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedListResponse {
    pub queries: Vec<SavedQuerySummary>,
}

#[derive(Debug, Serialize)]
pub struct SavedQueryResponse {
    pub query: Query,
    pub result: HighlightResult,
}

/// Scores `text` against `question` sentence by sentence.
///
/// The cache disposition of the request (HIT, MISS, COALESCED) is
/// reported in the `X-Hilite-Status` response header.
#[instrument(skip_all, fields(status = tracing::field::Empty))]
pub async fn highlight_handler<O, S>(
    State(state): State<GatewayState<O, S>>,
    headers: HeaderMap,
    Json(request): Json<HighlightRequest>,
) -> Result<Response, GatewayError>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    let header_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let credentials = OracleCredentials::from_request_key(header_key.or(request.api_key));

    let outcome = state
        .pipeline
        .highlight(&request.text, &request.question, credentials)
        .await?;
    tracing::Span::current().record("status", outcome.status.as_header_value());

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        STATUS_HEADER,
        HeaderValue::from_static(outcome.status.as_header_value()),
    );

    Ok((StatusCode::OK, response_headers, Json(outcome.result)).into_response())
}

/// Lists saved queries, most recent first.
#[instrument(skip_all)]
pub async fn saved_list_handler<O, S>(
    State(state): State<GatewayState<O, S>>,
) -> Result<Json<SavedListResponse>, GatewayError>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    let queries = state
        .store
        .list()
        .await
        .map_err(|err| GatewayError::Store {
            reason: err.to_string(),
        })?;

    Ok(Json(SavedListResponse { queries }))
}

/// Fetches one saved query by its permalink hash.
#[instrument(skip(state))]
pub async fn saved_get_handler<O, S>(
    State(state): State<GatewayState<O, S>>,
    Path(hash): Path<String>,
) -> Result<Json<SavedQueryResponse>, GatewayError>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    let record = state
        .store
        .get(&hash)
        .await
        .map_err(|err| GatewayError::Store {
            reason: err.to_string(),
        })?;

    match record {
        Some(record) => Ok(Json(SavedQueryResponse {
            query: record.query,
            result: record.result,
        })),
        None => Err(GatewayError::NotFound { hash }),
    }
}
