use axum::{
    extract::{rejection::QueryRejection, Path, Query, RawQuery, State},
    response::Json,
};
use http::StatusCode;
use nordpool_prices::{Granularity, PriceError, PriceQuery, PriceResult};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

type QueryResult = Result<Query<PriceQuery>, QueryRejection>;

pub async fn at(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    query: QueryResult,
) -> Reply<PriceResult> {
    let query = match price_query(query, raw) {
        Ok(q) => q,
        Err(e) => return respond(Err(e)),
    };
    respond(state.prices.at(&query).await)
}

pub async fn range(
    State(state): State<AppState>,
    Path(granularity): Path<String>,
    RawQuery(raw): RawQuery,
    query: QueryResult,
) -> Reply<Vec<PriceResult>> {
    let granularity = match granularity.parse::<Granularity>() {
        Ok(g) => g,
        Err(e) => return respond(Err(e)),
    };
    let query = match price_query(query, raw) {
        Ok(q) => q,
        Err(e) => return respond(Err(e)),
    };
    respond(state.prices.fetch(granularity, &query).await)
}

/// Unparseable `from`/`to` become `MalformedInput` so they share the envelope.
fn price_query(query: QueryResult, raw: Option<String>) -> Result<PriceQuery, PriceError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| PriceError::MalformedInput {
            field: "query",
            value: raw.unwrap_or_default(),
            reason: rejection.body_text(),
        })
}

fn respond<T>(result: Result<T, PriceError>) -> Reply<T> {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(ApiResponse {
                ok: true,
                data: Some(data),
                error: None,
            }),
        ),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!("Price query failed: {e}");
            } else {
                tracing::info!("Price query rejected: {e}");
            }
            (
                status,
                Json(ApiResponse {
                    ok: false,
                    data: None,
                    error: Some(format!("{e}")),
                }),
            )
        }
    }
}

fn status_for(err: &PriceError) -> StatusCode {
    match err {
        PriceError::MalformedInput { .. } => StatusCode::BAD_REQUEST,
        PriceError::NotFound(_) => StatusCode::NOT_FOUND,
        PriceError::Transport { .. } | PriceError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status() {
        assert_eq!(
            status_for(&PriceError::NotFound("2024-06-15T13:00:00+02:00".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&PriceError::Decode("bad".into())),
            StatusCode::BAD_GATEWAY
        );
        let (status, Json(body)) = respond::<()>(Err(PriceError::MalformedInput {
            field: "date",
            value: "x".into(),
            reason: "premature end of input".into(),
        }));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.ok);
        assert!(body.error.unwrap().contains("malformed date 'x'"));
    }

    #[test]
    fn bad_bounds_use_the_envelope() {
        let uri: http::Uri = "/prices/hourly?area=NO1&from=last-tuesday".parse().unwrap();
        let parsed = price_query(
            Query::<PriceQuery>::try_from_uri(&uri),
            uri.query().map(str::to_string),
        );
        let (status, Json(body)) = respond::<()>(parsed.map(|_| ()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.ok);
        assert!(body
            .error
            .unwrap()
            .contains("malformed query 'area=NO1&from=last-tuesday'"));

        let uri: http::Uri = "/prices/hourly?area=NO1&from=2024-06-15T13:00:00Z"
            .parse()
            .unwrap();
        let query = price_query(
            Query::<PriceQuery>::try_from_uri(&uri),
            uri.query().map(str::to_string),
        )
        .unwrap();
        assert_eq!(query.area.as_deref(), Some("NO1"));
        assert!(query.from.is_some());
    }
}
