//! Database operations for the `pharmacies` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use medfinder_core::geo::GeoPoint;
use medfinder_core::search::Locatable;

use crate::DbError;

/// Input record for inserting a pharmacy.
#[derive(Debug, Clone)]
pub struct NewPharmacy {
    pub name: String,
    pub city: String,
    pub point: Option<GeoPoint>,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
}

/// A row from the `pharmacies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PharmacyRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PharmacyRow {
    /// The pharmacy's position, when known.
    ///
    /// A CHECK constraint keeps the coordinate pair complete in the database;
    /// a hypothetical partial pair degrades to "no position" rather than
    /// surfacing half a point.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint {
                longitude,
                latitude,
            }),
            _ => None,
        }
    }
}

impl Locatable for PharmacyRow {
    fn location(&self) -> Option<GeoPoint> {
        PharmacyRow::location(self)
    }

    fn delivery_available(&self) -> bool {
        self.delivery_available
    }
}

/// List all active pharmacies.
///
/// Ordered by `id ASC` so retrieval order is deterministic; the in-memory
/// ranking relies on this as its tie-break.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_pharmacies(pool: &PgPool) -> Result<Vec<PharmacyRow>, DbError> {
    let rows = sqlx::query_as::<_, PharmacyRow>(
        "SELECT id, public_id, name, city, latitude, longitude, \
                delivery_available, rating, is_active, created_at, updated_at \
         FROM pharmacies \
         WHERE is_active = TRUE \
         ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch a single pharmacy by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such pharmacy exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_pharmacy_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<PharmacyRow, DbError> {
    sqlx::query_as::<_, PharmacyRow>(
        "SELECT id, public_id, name, city, latitude, longitude, \
                delivery_available, rating, is_active, created_at, updated_at \
         FROM pharmacies \
         WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Insert a new pharmacy and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// violations on (name, city).
pub async fn insert_pharmacy(
    pool: &PgPool,
    pharmacy: &NewPharmacy,
) -> Result<PharmacyRow, DbError> {
    let (latitude, longitude) = match pharmacy.point {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    };

    let row = sqlx::query_as::<_, PharmacyRow>(
        "INSERT INTO pharmacies (name, city, latitude, longitude, delivery_available, rating) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, public_id, name, city, latitude, longitude, \
                   delivery_available, rating, is_active, created_at, updated_at",
    )
    .bind(&pharmacy.name)
    .bind(&pharmacy.city)
    .bind(latitude)
    .bind(longitude)
    .bind(pharmacy.delivery_available)
    .bind(pharmacy.rating)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
