//! Pharmacy handlers: listing, registration, and the distance-ranked
//! nearby lookup.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medfinder_core::geo::GeoPoint;
use medfinder_core::search::rank_nearest;
use medfinder_db::PharmacyRow;

use crate::middleware::RequestId;

use super::medicines::resolve_observer;
use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Query parameters and request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePharmacyRequest {
    pub name: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct PharmacyItem {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearbyPharmacyItem {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
    /// `null` for pharmacies with no known position; those trail the list.
    pub distance_km: Option<f64>,
}

impl From<PharmacyRow> for PharmacyItem {
    fn from(row: PharmacyRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            city: row.city,
            latitude: row.latitude,
            longitude: row.longitude,
            delivery_available: row.delivery_available,
            rating: row.rating,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/pharmacies — all active pharmacies in retrieval order.
pub(super) async fn list_pharmacies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PharmacyItem>>>, ApiError> {
    let rows = medfinder_db::list_active_pharmacies(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(PharmacyItem::from).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/pharmacies/nearby — active pharmacies ranked by distance.
///
/// Unlike search, the observer position is mandatory here.
pub(super) async fn nearby_pharmacies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<ApiResponse<Vec<NearbyPharmacyItem>>>, ApiError> {
    let rid = &req_id.0;

    let observer = resolve_observer(rid, params.latitude, params.longitude)?.ok_or_else(|| {
        ApiError::new(
            rid,
            "validation_error",
            "latitude and longitude are required",
        )
    })?;

    let rows = medfinder_db::list_active_pharmacies(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let delivery_only = params.delivery.unwrap_or(false);
    let data = rank_nearest(rows, observer, delivery_only)
        .into_iter()
        .map(|ranked| {
            let distance_km = ranked.distance_km;
            let row = ranked.item;
            NearbyPharmacyItem {
                id: row.public_id,
                name: row.name,
                city: row.city,
                delivery_available: row.delivery_available,
                rating: row.rating,
                distance_km,
            }
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/pharmacies — register a pharmacy.
pub(super) async fn create_pharmacy(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePharmacyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PharmacyItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    let city = body.city.trim().to_owned();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    if city.is_empty() || city.len() > 100 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "city must be 1–100 characters",
        ));
    }

    let point = GeoPoint::from_parts(body.longitude, body.latitude)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    if let Some(rating) = body.rating {
        if rating < Decimal::ZERO || rating > Decimal::from(5) {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("rating must be within 0–5, got {rating}"),
            ));
        }
    }

    let row = medfinder_db::insert_pharmacy(
        &state.pool,
        &medfinder_db::NewPharmacy {
            name,
            city,
            point,
            delivery_available: body.delivery_available,
            rating: body.rating,
        },
    )
    .await
    .map_err(|e| map_conflict(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PharmacyItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

fn map_conflict(rid: &str, e: &medfinder_db::DbError) -> ApiError {
    if let medfinder_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::new(
                rid,
                "conflict",
                "a pharmacy with that name already exists in this city",
            );
        }
    }
    map_db_error(rid.to_owned(), e)
}
