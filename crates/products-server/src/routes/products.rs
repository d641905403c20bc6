use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use products_core::model::{Envelope, NO_PRODUCTS, NO_SUCH_PRODUCT, Payload, ProductInput};

use super::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", get(list).post(create))
        .route(
            "/api/v1/products/{id}",
            get(get_one).put(update).delete(remove),
        )
}

type Reply = Json<Envelope<Payload>>;

async fn list(State(state): State<AppState>) -> ApiResult<Reply> {
    let products = state.db.list_products().await?;
    Ok(Json(Envelope::success(Payload::or_message(
        products,
        NO_PRODUCTS,
    ))))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Reply> {
    let products = state.db.get_product(&id).await?;
    Ok(Json(Envelope::success(Payload::or_message(
        products,
        NO_SUCH_PRODUCT,
    ))))
}

async fn create(
    State(state): State<AppState>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Reply)> {
    let Json(input) = body?;
    let products = state.db.create_product(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(products.into())),
    ))
}

// Unknown ids answer 200 with an empty array rather than 404.
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Reply> {
    let Json(input) = body?;
    let products = state.db.update_product(&id, &input).await?;
    Ok(Json(Envelope::success(products.into())))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Reply> {
    let products = state.db.delete_product(&id).await?;
    Ok(Json(Envelope::success(products.into())))
}
