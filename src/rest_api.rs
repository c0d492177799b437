//! REST API surface giving browsers access to the scale.
//!
//! Handlers only translate between HTTP and `ScaleService`. Service calls can
//! sleep for the configured wait while holding the port, so they run on the
//! blocking pool rather than on the async workers.

use axum::{
    extract::{
        rejection::QueryRejection, Form, FromRequest, Multipart, Query, Request,
        State as AxumState,
    },
    http::{header, StatusCode},
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppResult,
    service::{ReadError, ScaleService, SettingsUpdate, UpdateResult},
};

#[derive(Clone)]
pub struct RestContext {
    pub service: ScaleService,
}

impl RestContext {
    pub fn new(service: ScaleService) -> Self {
        Self { service }
    }

    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&ScaleService) -> T + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        Ok(tokio::task::spawn_blocking(move || f(&service)).await?)
    }
}

#[derive(Serialize)]
struct UpdateResponse {
    status: &'static str,
    #[serde(flatten)]
    result: UpdateResult,
}

// ---------- Router Builder ----------
pub fn build_router(ctx: RestContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get_settings", get(get_settings))
        .route(
            "/update_settings",
            get(update_settings_query).post(update_settings_form),
        )
        .route("/read", get(read_weight))
        .route("/ports", get(list_ports))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

// ---------- Handlers ----------
async fn index() -> Html<&'static str> {
    Html(concat!(
        "Access a serial port scale via http: <ul>",
        "<li><a href='/read'>'/read'</a> to read scale response</li>",
        "<li><a href='/get_settings'>'/get_settings'</a> to view scale settings</li>",
        "<li><a href='/update_settings'>'/update_settings'</a> to change scale settings via GET or POST</li>",
        "<li><a href='/ports'>'/ports'</a> to list detected serial ports</li>",
        "</ul>"
    ))
}

async fn get_settings(AxumState(ctx): AxumState<RestContext>) -> AppResult<Json<Value>> {
    let settings = ctx.run(|service| service.settings()).await?;
    Ok(Json(json!({"status": "ok", "settings": settings})))
}

async fn update_settings_query(
    AxumState(ctx): AxumState<RestContext>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<UpdateResponse>> {
    let Query(pairs) = query?;
    apply_update(ctx, SettingsUpdate::from_pairs(pairs)).await
}

/// Accepts urlencoded and multipart bodies alike.
async fn update_settings_form(
    AxumState(ctx): AxumState<RestContext>,
    request: Request,
) -> AppResult<Json<UpdateResponse>> {
    let pairs = if is_multipart(&request) {
        multipart_pairs(Multipart::from_request(request, &()).await?).await?
    } else {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &()).await?;
        pairs
    };
    apply_update(ctx, SettingsUpdate::from_pairs(pairs)).await
}

async fn apply_update(ctx: RestContext, update: SettingsUpdate) -> AppResult<Json<UpdateResponse>> {
    let result = ctx
        .run(move |service| service.update_and_get_settings(&update))
        .await?;
    let status = if result.is_success() { "ok" } else { "error" };
    Ok(Json(UpdateResponse { status, result }))
}

async fn read_weight(AxumState(ctx): AxumState<RestContext>) -> AppResult<(StatusCode, Json<Value>)> {
    let response = match ctx.run(|service| service.read_weight()).await? {
        Ok(reading) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "data": reading.text(),
                "bytes_read": reading.len()
            })),
        ),
        Err(e) => (read_error_status(&e), Json(err_json(e.kind(), &e.to_string()))),
    };
    Ok(response)
}

async fn list_ports(AxumState(ctx): AxumState<RestContext>) -> AppResult<Json<Value>> {
    let ports = ctx.run(|service| service.available_ports()).await?;
    Ok(Json(match ports {
        Ok(ports) => json!({"status": "ok", "ports": ports}),
        Err(e) => err_json("ListPortsError", &e.to_string()),
    }))
}

// ---------- Helpers ----------
fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Text fields of a multipart body, in order. Unnamed parts are skipped.
async fn multipart_pairs(mut multipart: Multipart) -> AppResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        pairs.push((name, field.text().await?));
    }
    Ok(pairs)
}

fn read_error_status(err: &ReadError) -> StatusCode {
    match err {
        ReadError::NotConnected => StatusCode::CONFLICT,
        ReadError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ReadError::WriteFailed(_) | ReadError::ReadFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn err_json(kind: &str, msg: &str) -> Value {
    json!({"status":"error","error":{"type":kind,"message":msg}})
}
