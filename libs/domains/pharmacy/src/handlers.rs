use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, UnprocessableEntityResponse,
    },
    AppError, AuditEvent, AuditOutcome, AuthUser, IdPath, UuidPath, ValidatedJson,
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::PharmacyResult;
use crate::models::{
    AddToCart, ArticleFilter, ArticleInput, Cart, CartLine, Checkout, CheckoutResult, Dci,
    IncludeQuery, Invoice, InvoiceStatus, Lot, LotFilter, LotInput, Sale, SaleDetails, SaleLine,
};
use crate::repository::PharmacyRepository;
use crate::resource::{ArticleResource, DciSummary};
use crate::service::PharmacyService;

pub const TAG: &str = "pharmacy";

/// OpenAPI documentation for the Pharmacy API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_articles,
        create_article,
        get_article,
        update_article,
        list_dcis,
        list_lots,
        create_lot,
        update_lot,
        delete_lot,
        get_cart,
        clear_cart,
        add_cart_item,
        remove_cart_item,
        checkout,
        get_sale,
    ),
    components(
        schemas(
            ArticleResource, DciSummary, ArticleInput, ArticleFilter, Dci, Lot, LotInput,
            LotFilter, Cart, CartLine, AddToCart, Checkout, CheckoutResult, InvoiceStatus,
            Sale, SaleLine, SaleDetails, Invoice
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnprocessableEntityResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Pharmacy catalog, stock, cart and sales")
    )
)]
pub struct ApiDoc;

/// Create the pharmacy router. Cart routes need [`AuthUser`] claims in the
/// request extensions.
pub fn router<R: PharmacyRepository + 'static>(service: PharmacyService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route("/articles/{id}", get(get_article).patch(update_article))
        .route("/dcis", get(list_dcis))
        .route("/lots", get(list_lots).post(create_lot))
        .route("/lots/{id}", patch(update_lot).delete(delete_lot))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/{id}", delete(remove_cart_item))
        .route("/cart/checkout", post(checkout))
        .route("/sales/{id}", get(get_sale))
        .with_state(shared_service)
}

fn owner_id(user: &AuthUser) -> Result<Uuid, AppError> {
    Ok(user.claims().user_id()?)
}

/// List articles
#[utoipa::path(
    get,
    path = "/articles",
    tag = TAG,
    params(ArticleFilter),
    responses(
        (status = 200, description = "Articles ordered by name", body = Vec<ArticleResource>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_articles<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    Query(filter): Query<ArticleFilter>,
) -> PharmacyResult<Json<Vec<ArticleResource>>> {
    let articles = service.list_articles(filter).await?;
    Ok(Json(articles))
}

/// Create an article
#[utoipa::path(
    post,
    path = "/articles",
    tag = TAG,
    request_body = ArticleInput,
    responses(
        (status = 201, description = "Article created", body = ArticleResource),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_article<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    ValidatedJson(input): ValidatedJson<ArticleInput>,
) -> PharmacyResult<impl IntoResponse> {
    let article = service.create_article(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// Get an article, optionally with its DCI (`?include=dci`)
#[utoipa::path(
    get,
    path = "/articles/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Article ID"),
        IncludeQuery
    ),
    responses(
        (status = 200, description = "Article found", body = ArticleResource),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_article<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    IdPath(id): IdPath,
    Query(include): Query<IncludeQuery>,
) -> PharmacyResult<Json<ArticleResource>> {
    let article = service.get_article(id, include.include_dci()).await?;
    Ok(Json(article))
}

/// Replace an article
#[utoipa::path(
    patch,
    path = "/articles/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Article ID")
    ),
    request_body = ArticleInput,
    responses(
        (status = 200, description = "Article updated", body = ArticleResource),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_article<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<ArticleInput>,
) -> PharmacyResult<Json<ArticleResource>> {
    let article = service.update_article(id, input).await?;
    Ok(Json(article))
}

/// List DCIs
#[utoipa::path(
    get,
    path = "/dcis",
    tag = TAG,
    responses(
        (status = 200, description = "DCIs ordered by name", body = Vec<Dci>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_dcis<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
) -> PharmacyResult<Json<Vec<Dci>>> {
    let dcis = service.list_dcis().await?;
    Ok(Json(dcis))
}

/// List lots, earliest expiry first
#[utoipa::path(
    get,
    path = "/lots",
    tag = TAG,
    params(LotFilter),
    responses(
        (status = 200, description = "Lots ordered by expiry, undated last", body = Vec<Lot>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_lots<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    Query(filter): Query<LotFilter>,
) -> PharmacyResult<Json<Vec<Lot>>> {
    let lots = service.list_lots(filter).await?;
    Ok(Json(lots))
}

/// Receive a stock lot
#[utoipa::path(
    post,
    path = "/lots",
    tag = TAG,
    request_body = LotInput,
    responses(
        (status = 201, description = "Lot created", body = Lot),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_lot<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    ValidatedJson(input): ValidatedJson<LotInput>,
) -> PharmacyResult<impl IntoResponse> {
    let lot = service.create_lot(input).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// Replace a lot
#[utoipa::path(
    patch,
    path = "/lots/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Lot ID")
    ),
    request_body = LotInput,
    responses(
        (status = 200, description = "Lot updated", body = Lot),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_lot<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<LotInput>,
) -> PharmacyResult<Json<Lot>> {
    let lot = service.update_lot(id, input).await?;
    Ok(Json(lot))
}

/// Delete a lot
#[utoipa::path(
    delete,
    path = "/lots/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Lot ID")
    ),
    responses(
        (status = 204, description = "Lot deleted"),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_lot<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    IdPath(id): IdPath,
) -> PharmacyResult<StatusCode> {
    service.delete_lot(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's cart
#[utoipa::path(
    get,
    path = "/cart",
    tag = TAG,
    responses(
        (status = 200, description = "Current cart", body = Cart),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_cart<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    user: AuthUser,
) -> Result<Json<Cart>, AppError> {
    let cart = service.get_cart(owner_id(&user)?).await?;
    Ok(Json(cart))
}

/// Empty the caller's cart
#[utoipa::path(
    delete,
    path = "/cart",
    tag = TAG,
    responses(
        (status = 200, description = "Emptied cart", body = Cart),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn clear_cart<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    user: AuthUser,
) -> Result<Json<Cart>, AppError> {
    let cart = service.clear_cart(owner_id(&user)?).await?;
    Ok(Json(cart))
}

/// Add an article to the caller's cart
#[utoipa::path(
    post,
    path = "/cart/items",
    tag = TAG,
    request_body = AddToCart,
    responses(
        (status = 201, description = "Updated cart", body = Cart),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn add_cart_item<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<AddToCart>,
) -> Result<impl IntoResponse, AppError> {
    let cart = service.add_to_cart(owner_id(&user)?, input).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Remove a line from the caller's cart
#[utoipa::path(
    delete,
    path = "/cart/items/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Cart line ID")
    ),
    responses(
        (status = 200, description = "Updated cart", body = Cart),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn remove_cart_item<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    user: AuthUser,
    UuidPath(line_id): UuidPath,
) -> Result<Json<Cart>, AppError> {
    let cart = service.remove_cart_line(owner_id(&user)?, line_id).await?;
    Ok(Json(cart))
}

/// Check out the caller's cart
///
/// Stock is taken from the earliest-expiring lots. With `auto_invoice` an
/// invoice is issued after the sale is committed; a failed invoice is
/// reported in the body and does not undo the sale.
#[utoipa::path(
    post,
    path = "/cart/checkout",
    tag = TAG,
    request_body = Checkout,
    responses(
        (status = 201, description = "Sale recorded", body = CheckoutResult),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = UnprocessableEntityResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn checkout<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    user: AuthUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<Checkout>,
) -> Result<impl IntoResponse, AppError> {
    let result = service.checkout(owner_id(&user)?, input).await?;

    AuditEvent::new(
        Some(user.claims().sub.clone()),
        "pharmacy.checkout",
        Some(format!("sale:{}", result.sale.id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .with_details(json!({
        "total": result.sale.total,
        "lines": result.sale.lines.len(),
        "invoice_status": result.invoice_status,
        "invoice_number": result.invoice.as_ref().map(|i| i.number.as_str()),
    }))
    .log();

    Ok((StatusCode::CREATED, Json(result)))
}

/// Get a sale with its invoice
#[utoipa::path(
    get,
    path = "/sales/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Sale ID")
    ),
    responses(
        (status = 200, description = "Sale found", body = SaleDetails),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_sale<R: PharmacyRepository>(
    State(service): State<Arc<PharmacyService<R>>>,
    IdPath(id): IdPath,
) -> PharmacyResult<Json<SaleDetails>> {
    let sale = service.get_sale(id).await?;
    Ok(Json(sale))
}
