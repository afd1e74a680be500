//! Medicine catalog handlers: geo-ranked search, popular listing, and the
//! catalog-maintenance writes used by pharmacy operators.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medfinder_core::catalog::MedicineForm;
use medfinder_core::geo::GeoPoint;
use medfinder_core::search::{rank, Ranked, SortMode};
use medfinder_db::{MedicineRow, MedicineSearchRow};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Fixed result count for the popular listing.
const POPULAR_LIMIT: i64 = 10;

// ---------------------------------------------------------------------------
// Query parameters and request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    pub query: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery: Option<bool>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateMedicineRequest {
    pub pharmacy_id: Uuid,
    pub name: String,
    pub strength: Option<String>,
    pub form: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub requires_prescription: bool,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep
// current), Some(None) = "explicitly cleared", Some(Some(v)) = "set to value"
// (PATCH semantics).
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateMedicineRequest {
    pub name: Option<String>,
    pub strength: Option<Option<String>>,
    pub form: Option<String>,
    pub unit_price: Option<Decimal>,
    pub requires_prescription: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RestockRequest {
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct MedicineSummary {
    pub id: Uuid,
    pub name: String,
    pub strength: Option<String>,
    pub form: String,
    pub requires_prescription: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct PharmacySummary {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
    /// Explicitly `null` when unknown, so clients can tell "unknown" from
    /// "zero kilometers away".
    pub distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchResultItem {
    pub medicine: MedicineSummary,
    pub price: Decimal,
    pub pharmacy: PharmacySummary,
    pub available: bool,
}

/// Pharmacy embed for the popular listing; no distance is ever computed there.
#[derive(Debug, Serialize)]
pub(super) struct PharmacyInfo {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub(super) struct PopularItem {
    pub medicine: MedicineSummary,
    pub price: Decimal,
    pub quantity: i32,
    pub pharmacy: PharmacyInfo,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct MedicineDetail {
    pub id: Uuid,
    pub name: String,
    pub strength: Option<String>,
    pub form: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub out_of_stock: bool,
    pub requires_prescription: bool,
}

impl From<MedicineRow> for MedicineDetail {
    fn from(row: MedicineRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            strength: row.strength,
            form: row.form,
            unit_price: row.unit_price,
            quantity: row.quantity,
            out_of_stock: row.out_of_stock,
            requires_prescription: row.requires_prescription,
        }
    }
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/medicines/search — geo-ranked catalog search.
pub(super) async fn search_medicines(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Vec<SearchResultItem>>>, ApiError> {
    let rid = &req_id.0;

    let observer = resolve_observer(rid, params.latitude, params.longitude)?;
    let sort = SortMode::resolve(params.sort.as_deref(), observer.is_some())
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let rows = medfinder_db::search_in_stock(&state.pool, params.query.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let delivery_only = params.delivery.unwrap_or(false);
    let data = rank(rows, observer, delivery_only, sort)
        .into_iter()
        .map(search_item)
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/medicines/popular — top entries by remaining quantity.
pub(super) async fn popular_medicines(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PopularItem>>>, ApiError> {
    let rows = medfinder_db::list_popular(&state.pool, POPULAR_LIMIT)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(popular_item).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

// ---------------------------------------------------------------------------
// Write handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/medicines — add a catalog entry to a pharmacy.
pub(super) async fn create_medicine(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MedicineDetail>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    validate_name(rid, &name)?;
    let form = parse_form(rid, &body.form)?;
    validate_unit_price(rid, body.unit_price)?;
    validate_quantity(rid, body.quantity)?;

    let pharmacy = medfinder_db::get_pharmacy_by_public_id(&state.pool, body.pharmacy_id)
        .await
        .map_err(|e| match e {
            medfinder_db::DbError::NotFound => {
                ApiError::new(rid, "not_found", "no pharmacy with that id")
            }
            other => map_db_error(rid.clone(), &other),
        })?;

    let row = medfinder_db::insert_medicine(
        &state.pool,
        pharmacy.id,
        &medfinder_db::NewMedicine {
            name,
            strength: body.strength,
            form,
            unit_price: body.unit_price,
            quantity: body.quantity,
            requires_prescription: body.requires_prescription,
        },
    )
    .await
    .map_err(|e| map_unique_violation(rid, &e, "that pharmacy already lists this medicine"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: MedicineDetail::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/medicines/{public_id} — partial field update.
pub(super) async fn update_medicine(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
    Json(body): Json<UpdateMedicineRequest>,
) -> Result<Json<ApiResponse<MedicineDetail>>, ApiError> {
    let rid = &req_id.0;

    let name = match body.name {
        Some(raw) => {
            let trimmed = raw.trim().to_owned();
            validate_name(rid, &trimmed)?;
            Some(trimmed)
        }
        None => None,
    };
    let form = match body.form.as_deref() {
        Some(raw) => Some(parse_form(rid, raw)?),
        None => None,
    };
    if let Some(price) = body.unit_price {
        validate_unit_price(rid, price)?;
    }

    let row = medfinder_db::update_medicine(
        &state.pool,
        public_id,
        &medfinder_db::MedicineUpdate {
            name,
            strength: body.strength,
            form,
            unit_price: body.unit_price,
            requires_prescription: body.requires_prescription,
        },
    )
    .await
    .map_err(|e| match e {
        medfinder_db::DbError::NotFound => {
            ApiError::new(rid, "not_found", "no medicine with that id")
        }
        other => map_db_error(rid.clone(), &other),
    })?;

    Ok(Json(ApiResponse {
        data: MedicineDetail::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/medicines/{public_id}/restock — set the remaining quantity.
pub(super) async fn restock_medicine(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
    Json(body): Json<RestockRequest>,
) -> Result<Json<ApiResponse<MedicineDetail>>, ApiError> {
    let rid = &req_id.0;
    validate_quantity(rid, body.quantity)?;

    let row = medfinder_db::restock_medicine(&state.pool, public_id, body.quantity)
        .await
        .map_err(|e| match e {
            medfinder_db::DbError::NotFound => {
                ApiError::new(rid, "not_found", "no medicine with that id")
            }
            other => map_db_error(rid.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: MedicineDetail::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the optional observer position from query coordinates.
///
/// Both absent is valid (distance features off); one without the other, or a
/// value outside its range, is a validation error raised before retrieval.
pub(super) fn resolve_observer(
    rid: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, ApiError> {
    GeoPoint::from_parts(longitude, latitude)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
}

fn search_item(ranked: Ranked<MedicineSearchRow>) -> SearchResultItem {
    let distance_km = ranked.distance_km;
    let row = ranked.item;
    let available = row.available();

    SearchResultItem {
        medicine: MedicineSummary {
            id: row.public_id,
            name: row.name,
            strength: row.strength,
            form: row.form,
            requires_prescription: row.requires_prescription,
        },
        price: row.unit_price,
        pharmacy: PharmacySummary {
            id: row.pharmacy_public_id,
            name: row.pharmacy_name,
            city: row.pharmacy_city,
            delivery_available: row.delivery_available,
            rating: row.rating,
            distance_km,
        },
        available,
    }
}

fn popular_item(row: MedicineSearchRow) -> PopularItem {
    let available = row.available();

    PopularItem {
        medicine: MedicineSummary {
            id: row.public_id,
            name: row.name,
            strength: row.strength,
            form: row.form,
            requires_prescription: row.requires_prescription,
        },
        price: row.unit_price,
        quantity: row.quantity,
        pharmacy: PharmacyInfo {
            id: row.pharmacy_public_id,
            name: row.pharmacy_name,
            city: row.pharmacy_city,
            delivery_available: row.delivery_available,
            rating: row.rating,
        },
        available,
    }
}

fn validate_name(rid: &str, name: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    Ok(())
}

fn parse_form(rid: &str, raw: &str) -> Result<MedicineForm, ApiError> {
    MedicineForm::parse(raw).map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
}

fn validate_unit_price(rid: &str, price: Decimal) -> Result<(), ApiError> {
    if price <= Decimal::ZERO {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("unit_price must be positive, got {price}"),
        ));
    }
    Ok(())
}

fn validate_quantity(rid: &str, quantity: i32) -> Result<(), ApiError> {
    if quantity < 0 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("quantity must be non-negative, got {quantity}"),
        ));
    }
    Ok(())
}

fn map_unique_violation(rid: &str, e: &medfinder_db::DbError, message: &str) -> ApiError {
    if let medfinder_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::new(rid, "conflict", message);
        }
    }
    map_db_error(rid.to_owned(), e)
}
