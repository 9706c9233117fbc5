use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapter::driver::request_dto::{CreateOrderRequest, UpdateOrderStatusRequest};
use crate::adapter::driver::response_dto::OrderResponse;
use crate::application::auth::AuthorizationGate;
use crate::application::service::{OrderApplicationService, OrderQueryService, OrderView};
use crate::application::ApplicationError;
use crate::domain::model::{OrderId, UserId};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderApplicationService>,
    pub order_query_service: Arc<OrderQueryService>,
    pub gate: AuthorizationGate,
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/orders", get(get_orders).post(create_order))
        .route("/api/orders/my-orders", get(get_my_orders))
        .route("/api/orders/user/:user_id", get(get_orders_by_user))
        .route(
            "/api/orders/:order_id",
            get(get_order_by_id).delete(cancel_order),
        )
        .route("/api/orders/:order_id/status", put(update_order_status))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Authorizationヘッダーから呼び出し元を特定する
fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<UserId> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state
        .gate
        .authenticate(authorization)
        .map_err(map_application_error)
}

fn parse_order_id(raw: &str) -> ApiResult<OrderId> {
    OrderId::from_string(raw).map_err(|_| {
        map_application_error(ApplicationError::Validation(format!(
            "無効な注文ID形式です: {}",
            raw
        )))
    })
}

fn parse_user_id(raw: &str) -> ApiResult<UserId> {
    UserId::from_string(raw).map_err(|_| {
        map_application_error(ApplicationError::Validation(format!(
            "無効なユーザーID形式です: {}",
            raw
        )))
    })
}

fn to_responses(views: Vec<OrderView>) -> Vec<OrderResponse> {
    views.iter().map(OrderResponse::from_view).collect()
}

fn body_rejected(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    map_application_error(ApplicationError::Validation(rejection.body_text()))
}

// 注文作成エンドポイント
async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let user_id = authenticate(&state, &headers)?;
    let Json(request) = body.map_err(body_rejected)?;

    let view = state
        .order_service
        .create_order(user_id, request.into_command())
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from_view(&view))))
}

// 注文一覧取得エンドポイント
async fn get_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    authenticate(&state, &headers)?;
    let views = state
        .order_query_service
        .get_all_orders()
        .await
        .map_err(map_application_error)?;
    Ok(Json(to_responses(views)))
}

// 自分の注文一覧取得エンドポイント
async fn get_my_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let user_id = authenticate(&state, &headers)?;
    let views = state
        .order_query_service
        .get_orders_by_user(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(to_responses(views)))
}

// ユーザー別注文一覧取得エンドポイント
async fn get_orders_by_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    authenticate(&state, &headers)?;
    let user_id = parse_user_id(&user_id)?;
    let views = state
        .order_query_service
        .get_orders_by_user(user_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(to_responses(views)))
}

// 注文詳細取得エンドポイント
async fn get_order_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    authenticate(&state, &headers)?;
    let order_id = parse_order_id(&order_id)?;
    let view = state
        .order_service
        .get_order(order_id)
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderResponse::from_view(&view)))
}

// 注文ステータス更新エンドポイント
async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
    body: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&state, &headers)?;
    let order_id = parse_order_id(&order_id)?;
    let Json(request) = body.map_err(body_rejected)?;
    let command = request.into_command().map_err(map_application_error)?;

    state
        .order_service
        .update_order_status(actor, order_id, command)
        .await
        .map_err(map_application_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// 注文キャンセルエンドポイント
async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> ApiResult<StatusCode> {
    let caller = authenticate(&state, &headers)?;
    let order_id = parse_order_id(&order_id)?;

    state
        .order_service
        .cancel_order(caller, order_id)
        .await
        .map_err(map_application_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match &err {
        ApplicationError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        ApplicationError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        ApplicationError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ApplicationError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ApplicationError::InsufficientStock(_) => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
        ApplicationError::InvalidTransition(_) => (StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
        ApplicationError::Repository(repo_err) => {
            tracing::error!(error = %repo_err, "リポジトリエラーが発生しました");
            (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR")
        }
    };

    let error = match err {
        ApplicationError::Unauthenticated(msg)
        | ApplicationError::Forbidden(msg)
        | ApplicationError::NotFound(msg)
        | ApplicationError::Validation(msg)
        | ApplicationError::InsufficientStock(msg)
        | ApplicationError::InvalidTransition(msg) => msg,
        ApplicationError::Repository(repo_err) => repo_err.to_string(),
    };

    (
        status,
        Json(ApiError {
            error,
            code: code.to_string(),
        }),
    )
}
