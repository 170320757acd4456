//! Request-timing middleware for the ingress API: pure axum plumbing with
//! no domain content.

use axum::extract::{FromRequestParts, Request};
use axum::http::{request::Parts, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReqStamp {
    pub uuid: Uuid,
    pub time_in: DateTime<Utc>,
}

pub async fn req_stamp(mut req: Request, next: Next) -> Response {
    let time_in = Utc::now();
    let uuid = Uuid::new_v4();
    req.extensions_mut().insert(ReqStamp { uuid, time_in });
    next.run(req).await
}

impl<S: Send + Sync> FromRequestParts<S> for ReqStamp {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ReqStamp>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub async fn log_request(uri: Uri, method: Method, stamp: ReqStamp, res: Response) -> Response {
    let err = res.extensions().get::<serde_json::Value>();
    let error_type = err.map(|e| e["type"].as_str().unwrap_or_default().to_string());

    let now = Utc::now();
    let duration_ms = (now - stamp.time_in).num_milliseconds();
    debug!(
        request = %stamp.uuid,
        method = %method,
        path = %uri,
        status = res.status().as_u16(),
        duration_ms,
        error = error_type.as_deref(),
        "request completed",
    );

    res
}
