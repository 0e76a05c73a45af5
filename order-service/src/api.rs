use axum::{
    extract::{multipart::Field, rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::*;
use tracing::error;
use uuid::Uuid;

use crate::extract::{AuthCaller, OrderId};
use crate::uploads::ProofStore;
use crate::views::OrderView;
use crate::workflow::{NewOrderRequest, OrderWorkflow, ProofSubmission};

/// Multipart framing and the text fields ride on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub workflow: OrderWorkflow,
    pub proofs: ProofStore,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub shipping_address: String,
    pub shipping_phone: Option<String>,
    pub shipping_notes: Option<String>,
    #[serde(alias = "payment_method_id")]
    pub payment_method: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn create_router(state: AppState) -> Router {
    let proof_limit = state.proofs.max_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/my-orders", get(my_orders))
        .route("/orders/business-orders", get(business_orders))
        .route("/orders/:id", get(get_order).delete(cancel_order))
        .route("/orders/:id/status", put(update_order_status))
        .route(
            "/orders/:id/payment",
            put(submit_payment_proof).layer(DefaultBodyLimit::max(proof_limit)),
        )
        .route("/orders/:id/payment/status", put(update_payment_status))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

/// Maps a workflow error onto a status code and the error envelope.
/// Persistence details are logged, never sent.
pub fn error_response(e: OrderError) -> ApiError {
    let status = match &e {
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrderError::InvalidState(_)
        | OrderError::InsufficientStock { .. }
        | OrderError::Unavailable(_)
        | OrderError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = match e {
        OrderError::Persistence(detail) => {
            error!("Persistence failure: {}", detail);
            "Server error, please retry".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ErrorResponse { success: false, error: message }))
}

fn single(status: StatusCode, aggregate: crate::orders::OrderAggregate) -> ApiResult<OrderView> {
    Ok((
        status,
        Json(ApiResponse {
            success: true,
            count: None,
            data: OrderView::from(aggregate),
        }),
    ))
}

fn many(aggregates: Vec<crate::orders::OrderAggregate>) -> ApiResult<Vec<OrderView>> {
    let data: Vec<OrderView> = aggregates.into_iter().map(OrderView::from).collect();
    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            count: Some(data.len()),
            data,
        }),
    ))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(OrderError::validation(rejection.body_text())))
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<OrderView> {
    let request = json_body(payload)?;

    let aggregate = state
        .workflow
        .create_order(
            caller,
            NewOrderRequest {
                items: request.items,
                shipping_address: request.shipping_address,
                shipping_phone: request.shipping_phone,
                shipping_notes: request.shipping_notes,
                payment_method_id: request.payment_method,
            },
        )
        .await
        .map_err(error_response)?;

    single(StatusCode::CREATED, aggregate)
}

pub async fn list_orders(State(state): State<AppState>, AuthCaller(caller): AuthCaller) -> ApiResult<Vec<OrderView>> {
    many(state.workflow.all_orders(caller).await.map_err(error_response)?)
}

pub async fn my_orders(State(state): State<AppState>, AuthCaller(caller): AuthCaller) -> ApiResult<Vec<OrderView>> {
    many(state.workflow.my_orders(caller).await.map_err(error_response)?)
}

pub async fn business_orders(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> ApiResult<Vec<OrderView>> {
    many(state.workflow.business_orders(caller).await.map_err(error_response)?)
}

pub async fn get_order(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    OrderId(id): OrderId,
) -> ApiResult<OrderView> {
    let aggregate = state.workflow.get_order(caller, id).await.map_err(error_response)?;
    single(StatusCode::OK, aggregate)
}

pub async fn update_order_status(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    OrderId(id): OrderId,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<OrderView> {
    let target: OrderStatus = json_body(payload)?.status.parse().map_err(error_response)?;

    let aggregate = state
        .workflow
        .update_order_status(caller, id, target)
        .await
        .map_err(error_response)?;
    single(StatusCode::OK, aggregate)
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    OrderId(id): OrderId,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<OrderView> {
    let target: PaymentStatus = json_body(payload)?.status.parse().map_err(error_response)?;

    let aggregate = state
        .workflow
        .set_payment_status(caller, id, target)
        .await
        .map_err(error_response)?;
    single(StatusCode::OK, aggregate)
}

pub async fn cancel_order(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    OrderId(id): OrderId,
) -> ApiResult<OrderView> {
    let aggregate = state.workflow.cancel_order(caller, id).await.map_err(error_response)?;
    single(StatusCode::OK, aggregate)
}

struct ProofUpload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct ProofForm {
    upload: Option<ProofUpload>,
    reference_number: Option<String>,
    notes: Option<String>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> OrderError {
    OrderError::validation(format!("Malformed upload: {}", e.body_text()))
}

async fn read_file(mut field: Field<'_>, max_bytes: usize) -> Result<ProofUpload, OrderError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(OrderError::validation(format!(
                "Payment proof exceeds the {} byte limit",
                max_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(ProofUpload { file_name, content_type, bytes })
}

async fn read_proof_form(multipart: &mut Multipart, max_bytes: usize) -> Result<ProofForm, OrderError> {
    let mut form = ProofForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("payment_proof") => form.upload = Some(read_file(field, max_bytes).await?),
            Some("reference_number") => {
                form.reference_number = Some(field.text().await.map_err(multipart_error)?)
            }
            Some("notes") => form.notes = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    form.reference_number = form.reference_number.filter(|s| !s.trim().is_empty());
    form.notes = form.notes.filter(|s| !s.trim().is_empty());
    Ok(form)
}

pub async fn submit_payment_proof(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    OrderId(id): OrderId,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> ApiResult<OrderView> {
    let mut multipart =
        multipart.map_err(|_| error_response(OrderError::validation("Please upload a payment proof")))?;

    let form = read_proof_form(&mut multipart, state.proofs.max_bytes())
        .await
        .map_err(error_response)?;
    let upload = form
        .upload
        .ok_or_else(|| error_response(OrderError::validation("Please upload a payment proof")))?;

    let stored = state
        .proofs
        .save(&upload.file_name, upload.content_type.as_deref(), &upload.bytes)
        .await
        .map_err(error_response)?;

    let submission = ProofSubmission {
        proof_image: stored.reference.clone(),
        reference_number: form.reference_number,
        notes: form.notes,
    };

    match state.workflow.submit_payment_proof(caller, id, submission).await {
        Ok(aggregate) => single(StatusCode::OK, aggregate),
        Err(e) => {
            state.proofs.discard(&stored).await;
            Err(error_response(e))
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
