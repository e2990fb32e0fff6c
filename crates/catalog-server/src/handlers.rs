use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog_api::{ApiError, ApiResult};
use catalog_reconcile::DesiredSet;
use catalog_storage::{
    Category, CategoryPatch, EntityId, NewCategory, NewProduct, NewTag, Product, ProductPatch,
    Tag, TagPatch,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::server::AppState;

const NO_PRODUCT: &str = "No product found with this id!";
const NO_CATEGORY: &str = "No category found with this id!";
const NO_TAG: &str = "No tag found with this id!";

/// Request field carrying the desired tag identifiers of a product.
pub const TAG_IDS_FIELD: &str = "tagIds";

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    backend: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProductWithTags {
    #[serde(flatten)]
    pub product: Product,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct TagWithProducts {
    #[serde(flatten)]
    pub tag: Tag,
    pub products: Vec<Product>,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            backend: state.storage.backend_name(),
        }),
    )
}

/// Unwraps a JSON body, turning extractor rejections into API errors.
fn payload(body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn parse<T: DeserializeOwned>(payload: &Value) -> ApiResult<T> {
    serde_json::from_value(payload.clone()).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// Rejects a desired set naming tags that do not exist.
async fn ensure_tags_exist(state: &AppState, desired: &DesiredSet) -> ApiResult<()> {
    let missing = state.storage.missing_tags(desired.as_slice()).await?;
    if missing.is_empty() {
        return Ok(());
    }
    Err(ApiError::bad_request(format!("unknown tag ids: {missing:?}")))
}

fn deleted(count: u64, not_found: &str) -> ApiResult<Response> {
    if count == 0 {
        return Err(ApiError::not_found(not_found));
    }
    Ok((StatusCode::OK, Json(count)).into_response())
}

// ---- Products ----

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.storage.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<ProductWithTags>> {
    let product = state
        .storage
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_PRODUCT))?;
    let tags = state.storage.list_tags_for_product(id).await?;
    Ok(Json(ProductWithTags { product, tags }))
}

/// Creates a product, then its tag links when `tagIds` is non-empty.
///
/// `tagIds` is required. Unknown tag ids are rejected before the product is
/// written. With tags the response is the created join rows, otherwise the
/// product.
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let payload = payload(body)?;
    let desired = DesiredSet::from_payload_field(&payload, TAG_IDS_FIELD)?;
    let input: NewProduct = parse(&payload)?;
    input.validate()?;
    if let Some(desired) = &desired {
        ensure_tags_exist(&state, desired).await?;
    }

    let product = state.storage.create_product(&input).await?;

    let Some(desired) = desired else {
        return Ok((StatusCode::OK, Json(product)).into_response());
    };

    let outcome = state.product_tags.reconcile(product.id, &desired).await?;
    tracing::info!(
        product_id = product.id,
        added = outcome.inserted.len(),
        "product created with tags"
    );
    Ok((StatusCode::OK, Json(outcome.inserted)).into_response())
}

/// Updates product fields, then replaces its tag set when `tagIds` is
/// non-empty. A missing or `null` `tagIds` leaves the tags alone. The whole
/// body, including tag existence, is checked before anything is written.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ProductWithTags>> {
    let payload = payload(body)?;
    let desired = DesiredSet::from_optional_payload_field(&payload, TAG_IDS_FIELD)?;
    let patch: ProductPatch = parse(&payload)?;
    patch.validate()?;

    if let Some(desired) = &desired {
        if state.storage.get_product(id).await?.is_none() {
            return Err(ApiError::not_found(NO_PRODUCT));
        }
        ensure_tags_exist(&state, desired).await?;
    }

    let product = state
        .storage
        .update_product(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_PRODUCT))?;

    if let Some(desired) = desired {
        let outcome = state.product_tags.reconcile(id, &desired).await?;
        tracing::info!(
            product_id = id,
            removed = outcome.removed,
            added = outcome.inserted.len(),
            "product tags reconciled"
        );
    }

    let tags = state.storage.list_tags_for_product(id).await?;
    Ok(Json(ProductWithTags { product, tags }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Response> {
    deleted(state.storage.delete_product(id).await?, NO_PRODUCT)
}

// ---- Categories ----

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.storage.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<CategoryWithProducts>> {
    let category = state
        .storage
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_CATEGORY))?;
    let products = state.storage.list_products_in_category(id).await?;
    Ok(Json(CategoryWithProducts { category, products }))
}

pub async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let input: NewCategory = parse(&payload(body)?)?;
    Ok(Json(state.storage.create_category(&input).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let patch: CategoryPatch = parse(&payload(body)?)?;
    let category = state
        .storage
        .update_category(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_CATEGORY))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Response> {
    deleted(state.storage.delete_category(id).await?, NO_CATEGORY)
}

// ---- Tags ----

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.storage.list_tags().await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<TagWithProducts>> {
    let tag = state
        .storage
        .get_tag(id)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_TAG))?;
    let products = state.storage.list_products_for_tag(id).await?;
    Ok(Json(TagWithProducts { tag, products }))
}

pub async fn create_tag(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Tag>> {
    let input: NewTag = parse(&payload(body)?)?;
    Ok(Json(state.storage.create_tag(&input).await?))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Tag>> {
    let patch: TagPatch = parse(&payload(body)?)?;
    let tag = state
        .storage
        .update_tag(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_TAG))?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<Response> {
    deleted(state.storage.delete_tag(id).await?, NO_TAG)
}
