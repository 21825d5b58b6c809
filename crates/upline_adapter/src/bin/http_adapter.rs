#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use upline_adapter::{
    create_member_http_status, malformed_sale_request, sale_outcome_http_status,
    AdapterErrorResponse, AdapterRejection, AdapterRuntime, CreateMemberAdapterRequest,
    SaleAdapterRequest,
};

type SharedRuntime = Arc<Mutex<AdapterRuntime>>;

#[derive(Debug, serde::Deserialize)]
struct UplineQuery {
    max_levels: Option<u8>,
}

#[derive(Debug, serde::Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let bind = env::var("UPLINE_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let runtime: SharedRuntime = Arc::new(Mutex::new(AdapterRuntime::default()));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/commission-table", get(commission_table))
        .route("/v1/members", post(create_member))
        .route("/v1/members/:id/upline", get(member_upline))
        .route("/v1/members/:id/payouts", get(member_payouts))
        .route("/v1/members/:id/summary", get(member_summary))
        .route("/v1/sales", post(record_sale))
        .route("/v1/sales/:id/payouts", get(sale_payouts))
        .with_state(runtime);

    info!(%addr, "upline_adapter_http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn lock(runtime: &SharedRuntime) -> Result<MutexGuard<'_, AdapterRuntime>, Response> {
    runtime.lock().map_err(|_| {
        warn!("adapter runtime lock poisoned");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AdapterErrorResponse {
                status: "error".to_string(),
                outcome: "UNAVAILABLE".to_string(),
                reason: "adapter runtime lock poisoned".to_string(),
            }),
        )
            .into_response()
    })
}

fn rejected(rejection: AdapterRejection) -> Response {
    let status = rejection.http_status();
    (status, Json(rejection.into_response_body())).into_response()
}

fn path_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, Response> {
    path.map(|Path(id)| id)
        .map_err(|e| rejected(AdapterRejection::malformed(e.body_text())))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|Query(q)| q)
        .map_err(|e| rejected(AdapterRejection::malformed(e.body_text())))
}

fn reply<T: serde::Serialize>(result: Result<T, AdapterRejection>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(rejection) => rejected(rejection),
    }
}

async fn healthz(State(runtime): State<SharedRuntime>) -> Response {
    match lock(&runtime) {
        Ok(runtime) => (StatusCode::OK, Json(runtime.health_report())).into_response(),
        Err(response) => response,
    }
}

async fn commission_table(State(runtime): State<SharedRuntime>) -> Response {
    match lock(&runtime) {
        Ok(runtime) => (StatusCode::OK, Json(runtime.commission_table())).into_response(),
        Err(response) => response,
    }
}

async fn create_member(
    State(runtime): State<SharedRuntime>,
    body: Result<Json<CreateMemberAdapterRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => return rejected(AdapterRejection::malformed(e.body_text())),
    };
    let mut runtime = match lock(&runtime) {
        Ok(runtime) => runtime,
        Err(response) => return response,
    };
    let result = runtime.create_member(request);
    let status = create_member_http_status(&result);
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(rejection) => rejected(rejection),
    }
}

async fn member_upline(
    State(runtime): State<SharedRuntime>,
    path: Result<Path<u64>, PathRejection>,
    params: Result<Query<UplineQuery>, QueryRejection>,
) -> Response {
    let (id, params) = match (path_id(path), query(params)) {
        (Ok(id), Ok(params)) => (id, params),
        (Err(response), _) | (_, Err(response)) => return response,
    };
    match lock(&runtime) {
        Ok(runtime) => reply(runtime.upline_report(id, params.max_levels)),
        Err(response) => response,
    }
}

async fn member_payouts(
    State(runtime): State<SharedRuntime>,
    path: Result<Path<u64>, PathRejection>,
    params: Result<Query<LimitQuery>, QueryRejection>,
) -> Response {
    let (id, params) = match (path_id(path), query(params)) {
        (Ok(id), Ok(params)) => (id, params),
        (Err(response), _) | (_, Err(response)) => return response,
    };
    match lock(&runtime) {
        Ok(runtime) => reply(runtime.member_payouts(id, params.limit)),
        Err(response) => response,
    }
}

async fn member_summary(
    State(runtime): State<SharedRuntime>,
    path: Result<Path<u64>, PathRejection>,
) -> Response {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match lock(&runtime) {
        Ok(runtime) => reply(runtime.member_summary(id)),
        Err(response) => response,
    }
}

async fn sale_payouts(
    State(runtime): State<SharedRuntime>,
    path: Result<Path<u64>, PathRejection>,
) -> Response {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match lock(&runtime) {
        Ok(runtime) => reply(runtime.sale_payouts(id)),
        Err(response) => response,
    }
}

async fn record_sale(
    State(runtime): State<SharedRuntime>,
    body: Result<Json<SaleAdapterRequest>, JsonRejection>,
) -> Response {
    let outcome = match body {
        Ok(Json(request)) => match lock(&runtime) {
            Ok(mut runtime) => runtime.record_sale(request),
            Err(response) => return response,
        },
        Err(e) => malformed_sale_request(e.body_text()),
    };
    (sale_outcome_http_status(&outcome), Json(outcome)).into_response()
}
