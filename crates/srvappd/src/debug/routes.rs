//! Routers and handlers for the private and public listeners.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::context::{DebugContext, Trigger};
use super::static_files;

type Shared = Arc<DebugContext>;

/// Router for the private debug listener.
pub fn private_router(context: Shared) -> Router {
    Router::new()
        .route("/debug/appinfo/", get(app_info))
        .route("/debug/appinfo", get(app_info))
        .route("/debug/counters/", get(counters))
        .route("/debug/counters", get(counters))
        .route("/debug/logs/", get(logs))
        .route("/debug/logs", get(logs))
        .route("/cmd/crash/", any(crash))
        .route("/cmd/crash", any(crash))
        .route("/cmd/shutdown/", any(shutdown))
        .route("/cmd/shutdown", any(shutdown))
        .fallback(private_static)
        .with_state(context)
}

/// Router for the public listener.
pub fn public_router(context: Shared) -> Router {
    Router::new().fallback(public_static).with_state(context)
}

/// Plain-text error body in the `<code> : <text>` form.
pub(crate) fn error_response(status: StatusCode, text: &str) -> Response {
    (status, format!("{} : {text}\n", status.as_u16())).into_response()
}

fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Response {
    let mut body = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut serializer) {
        Ok(()) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error"),
    }
}

async fn app_info(State(context): State<Shared>) -> Response {
    pretty_json(&context.inventory())
}

async fn counters(State(context): State<Shared>) -> Response {
    pretty_json(&context.counters().snapshot())
}

async fn logs(State(context): State<Shared>) -> Response {
    pretty_json(&context.buffer().read_all())
}

async fn crash(State(context): State<Shared>, method: Method) -> Response {
    trigger(&context, &method, Trigger::Crash)
}

async fn shutdown(State(context): State<Shared>, method: Method) -> Response {
    trigger(&context, &method, Trigger::Shutdown)
}

fn trigger(context: &Shared, method: &Method, trigger: Trigger) -> Response {
    if method != Method::POST {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not supported");
    }
    let label = trigger.label();
    context
        .log()
        .info(format_args!("{label} initiated via http request"));
    if !context.schedule(trigger) {
        context
            .log()
            .info(format_args!("{label} already pending; request merged"));
    }
    (StatusCode::OK, format!("{label} initiated\n")).into_response()
}

async fn private_static(State(context): State<Shared>, uri: Uri) -> Response {
    static_files::serve(context.private_static_dir(), uri.path(), context.log()).await
}

async fn public_static(State(context): State<Shared>, uri: Uri) -> Response {
    static_files::serve(context.public_static_dir(), uri.path(), context.log()).await
}
