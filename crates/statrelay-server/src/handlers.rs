use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use statrelay_common::sign;
use statrelay_common::types::{MetricKind, MetricValue};
use statrelay_common::wire::{self, MetricPayload};
use statrelay_storage::{Storage, StorageError};

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

fn not_implemented() -> Response {
    plain(StatusCode::NOT_IMPLEMENTED, "not implemented")
}

fn storage_error(err: StorageError) -> Response {
    tracing::error!(error = %err, "Storage operation failed");
    plain(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// `POST /update/{kind}/{name}/{value}` — path-encoded single update.
pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Response {
    let value = match kind.as_str() {
        "gauge" => match value.parse::<f64>() {
            Ok(v) => MetricValue::Gauge(v),
            Err(e) => {
                return plain(
                    StatusCode::BAD_REQUEST,
                    format!("value {name} not acceptable - {e}"),
                )
            }
        },
        "counter" => match value.parse::<i64>() {
            Ok(d) => MetricValue::Counter(d),
            Err(e) => {
                return plain(
                    StatusCode::BAD_REQUEST,
                    format!("value {name} not acceptable - {e}"),
                )
            }
        },
        _ => return not_implemented(),
    };

    match state.storage.put(&name, value).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => storage_error(e),
    }
}

/// `POST /update/` — one JSON payload.
pub async fn update_json(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: MetricPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return plain(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if payload.metric_kind().is_err() {
        return not_implemented();
    }
    let sample = match payload.to_sample() {
        Ok(s) => s,
        Err(e) => return plain(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if let Err(e) = payload.verify_hash(state.sign_key()) {
        return plain(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.storage.put(&sample.name, sample.value).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => storage_error(e),
    }
}

/// `POST /updates/` — JSON array batch. Any invalid item aborts the whole
/// call before anything is applied.
pub async fn updates_json(State(state): State<AppState>, body: Bytes) -> Response {
    let payloads = match wire::decode_batch(&body) {
        Ok(p) => p,
        Err(e) => return plain(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let mut samples = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        let sample = match payload.to_sample() {
            Ok(s) => s,
            Err(e) => return plain(StatusCode::BAD_REQUEST, e.to_string()),
        };
        if let Err(e) = payload.verify_hash(state.sign_key()) {
            return plain(StatusCode::BAD_REQUEST, e.to_string());
        }
        samples.push(sample);
    }

    match state.storage.put_batch(&samples).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => storage_error(e),
    }
}

/// `GET /value/{kind}/{name}` — plain-text stored value.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let kind: MetricKind = match kind.parse() {
        Ok(k) => k,
        Err(_) => return not_implemented(),
    };

    match state.storage.get(&name).await {
        Ok(MetricValue::Gauge(value)) if kind == MetricKind::Gauge => {
            plain(StatusCode::OK, format!("{value}"))
        }
        Ok(MetricValue::Counter(delta)) if kind == MetricKind::Counter => {
            plain(StatusCode::OK, delta.to_string())
        }
        Ok(_) | Err(StorageError::NotFound { .. }) => plain(
            StatusCode::NOT_FOUND,
            format!("{kind} metric with key '{name}' not found"),
        ),
        Err(e) => storage_error(e),
    }
}

/// `POST /value/` — echoes the stored value for `{id, type}`, with a fresh
/// integrity tag when a key is configured.
pub async fn value_json(State(state): State<AppState>, body: Bytes) -> Response {
    let mut payload: MetricPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return plain(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let kind = match payload.metric_kind() {
        Ok(k) => k,
        Err(_) => return not_implemented(),
    };

    let stored = match state.storage.get(&payload.id).await {
        Ok(v) => v,
        Err(StorageError::NotFound { .. }) => {
            return plain(
                StatusCode::NOT_FOUND,
                format!("{kind} metric with key '{}' not found", payload.id),
            )
        }
        Err(e) => return storage_error(e),
    };

    match (kind, stored) {
        (MetricKind::Gauge, MetricValue::Gauge(value)) => {
            payload.value = Some(value);
            payload.delta = None;
            payload.hash = state
                .sign_key()
                .map(|key| sign::gauge_hash(key, &payload.id, value));
        }
        (MetricKind::Counter, MetricValue::Counter(delta)) => {
            payload.delta = Some(delta);
            payload.value = None;
            payload.hash = state
                .sign_key()
                .map(|key| sign::counter_hash(key, &payload.id, delta));
        }
        _ => {
            return plain(
                StatusCode::NOT_FOUND,
                format!("{kind} metric with key '{}' not found", payload.id),
            )
        }
    }

    (StatusCode::OK, Json(payload)).into_response()
}

/// `GET /ping` — liveness of the relational backend.
pub async fn ping(State(state): State<AppState>) -> Response {
    let Some(db) = &state.db else {
        return plain(StatusCode::INTERNAL_SERVER_ERROR, "database not plugged in");
    };
    match db.ping().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => plain(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /` — HTML listing, gauges sorted by name.
pub async fn list(State(state): State<AppState>) -> Response {
    let store = match state.storage.get_all().await {
        Ok(s) => s,
        Err(e) => return storage_error(e),
    };

    let mut gauges: Vec<_> = store.gauges.iter().collect();
    gauges.sort_by(|a, b| a.0.cmp(b.0));
    let mut counters: Vec<_> = store.counters.iter().collect();
    counters.sort_by(|a, b| a.0.cmp(b.0));

    let mut body = String::from("<h1>Current metrics data:</h1>");
    body.push_str("<div><h2>Gauges</h2>");
    for (name, value) in gauges {
        body.push_str(&format!("<div>{name} - {value}</div>"));
    }
    body.push_str("</div>");
    body.push_str("<div><h2>Counters</h2>");
    for (name, delta) in counters {
        body.push_str(&format!("<div>{name} - {delta}</div>"));
    }
    body.push_str("</div>");

    Html(body).into_response()
}
