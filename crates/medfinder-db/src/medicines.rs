//! Database operations for the `medicines` table and the search retrieval
//! queries that feed the in-memory ranker.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use medfinder_core::catalog::MedicineForm;
use medfinder_core::geo::GeoPoint;
use medfinder_core::search::{Locatable, Priced};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `medicines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MedicineRow {
    pub id: i64,
    pub public_id: Uuid,
    pub pharmacy_id: i64,
    pub name: String,
    pub strength: Option<String>,
    /// Stored lowercase; constrained by the schema to a known dosage form.
    pub form: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub out_of_stock: bool,
    pub requires_prescription: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A medicine joined with its selling pharmacy, as retrieved for search,
/// popular listings, and ranking.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MedicineSearchRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub strength: Option<String>,
    pub form: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub out_of_stock: bool,
    pub requires_prescription: bool,
    pub pharmacy_public_id: Uuid,
    pub pharmacy_name: String,
    pub pharmacy_city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
}

impl MedicineSearchRow {
    /// Availability as surfaced to clients: stock counter and flag must agree.
    #[must_use]
    pub fn available(&self) -> bool {
        self.quantity > 0 && !self.out_of_stock
    }
}

impl Locatable for MedicineSearchRow {
    fn location(&self) -> Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint {
                longitude,
                latitude,
            }),
            _ => None,
        }
    }

    fn delivery_available(&self) -> bool {
        self.delivery_available
    }
}

impl Priced for MedicineSearchRow {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

/// Input record for inserting a medicine.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub strength: Option<String>,
    pub form: MedicineForm,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub requires_prescription: bool,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep
// current), Some(None) = "explicitly cleared", Some(Some(v)) = "set to value"
// (PATCH semantics).
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub strength: Option<Option<String>>,
    pub form: Option<MedicineForm>,
    pub unit_price: Option<Decimal>,
    pub requires_prescription: Option<bool>,
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// Retrieve in-stock catalog entries, optionally filtered by a
/// case-insensitive name substring, joined with their pharmacy.
///
/// This is the only filter pushed to the store; delivery filtering, distance
/// computation, and ordering all happen in memory afterwards. Ordered by
/// `m.id ASC` so the ranker's stable sorts have a deterministic tie-break.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_in_stock(
    pool: &PgPool,
    name_query: Option<&str>,
) -> Result<Vec<MedicineSearchRow>, DbError> {
    let rows = if let Some(query) = name_query {
        let pattern = format!("%{}%", escape_like(query));
        sqlx::query_as::<_, MedicineSearchRow>(
            "SELECT m.id, m.public_id, m.name, m.strength, m.form, \
                    m.unit_price, m.quantity, m.out_of_stock, m.requires_prescription, \
                    p.public_id AS pharmacy_public_id, p.name AS pharmacy_name, \
                    p.city AS pharmacy_city, p.latitude, p.longitude, \
                    p.delivery_available, p.rating \
             FROM medicines m \
             JOIN pharmacies p ON p.id = m.pharmacy_id \
             WHERE m.quantity > 0 \
               AND m.out_of_stock = FALSE \
               AND p.is_active = TRUE \
               AND m.name ILIKE $1 \
             ORDER BY m.id ASC",
        )
        .bind(pattern)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, MedicineSearchRow>(
            "SELECT m.id, m.public_id, m.name, m.strength, m.form, \
                    m.unit_price, m.quantity, m.out_of_stock, m.requires_prescription, \
                    p.public_id AS pharmacy_public_id, p.name AS pharmacy_name, \
                    p.city AS pharmacy_city, p.latitude, p.longitude, \
                    p.delivery_available, p.rating \
             FROM medicines m \
             JOIN pharmacies p ON p.id = m.pharmacy_id \
             WHERE m.quantity > 0 \
               AND m.out_of_stock = FALSE \
               AND p.is_active = TRUE \
             ORDER BY m.id ASC",
        )
        .fetch_all(pool)
        .await?
    };

    Ok(rows)
}

/// Retrieve the most-stocked in-stock entries, highest quantity first.
///
/// Shares the availability filter with [`search_in_stock`] but none of the
/// distance machinery; `id ASC` breaks quantity ties.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_popular(pool: &PgPool, limit: i64) -> Result<Vec<MedicineSearchRow>, DbError> {
    let rows = sqlx::query_as::<_, MedicineSearchRow>(
        "SELECT m.id, m.public_id, m.name, m.strength, m.form, \
                m.unit_price, m.quantity, m.out_of_stock, m.requires_prescription, \
                p.public_id AS pharmacy_public_id, p.name AS pharmacy_name, \
                p.city AS pharmacy_city, p.latitude, p.longitude, \
                p.delivery_available, p.rating \
         FROM medicines m \
         JOIN pharmacies p ON p.id = m.pharmacy_id \
         WHERE m.quantity > 0 \
           AND m.out_of_stock = FALSE \
           AND p.is_active = TRUE \
         ORDER BY m.quantity DESC, m.id ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch a single medicine by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such medicine exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_medicine_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<MedicineRow, DbError> {
    sqlx::query_as::<_, MedicineRow>(
        "SELECT id, public_id, pharmacy_id, name, strength, form, unit_price, \
                quantity, out_of_stock, requires_prescription, created_at, updated_at \
         FROM medicines \
         WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert a new medicine for a pharmacy and return the stored row.
///
/// The out-of-stock flag is derived from the initial quantity so the two
/// always start in agreement.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including unique-constraint
/// violations on (pharmacy, name, strength).
pub async fn insert_medicine(
    pool: &PgPool,
    pharmacy_id: i64,
    medicine: &NewMedicine,
) -> Result<MedicineRow, DbError> {
    let row = sqlx::query_as::<_, MedicineRow>(
        "INSERT INTO medicines \
             (pharmacy_id, name, strength, form, unit_price, quantity, \
              out_of_stock, requires_prescription) \
         VALUES ($1, $2, $3, $4, $5, $6, $6 = 0, $7) \
         RETURNING id, public_id, pharmacy_id, name, strength, form, unit_price, \
                   quantity, out_of_stock, requires_prescription, created_at, updated_at",
    )
    .bind(pharmacy_id)
    .bind(&medicine.name)
    .bind(&medicine.strength)
    .bind(medicine.form.as_str())
    .bind(medicine.unit_price)
    .bind(medicine.quantity)
    .bind(medicine.requires_prescription)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Apply a partial update to a medicine and return the updated row.
///
/// Runs as read-modify-write inside one transaction with the row locked, so
/// concurrent updates cannot interleave. Quantity is not touched here; stock
/// changes go through [`restock_medicine`] to keep the flag in agreement.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such medicine exists, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn update_medicine(
    pool: &PgPool,
    public_id: Uuid,
    update: &MedicineUpdate,
) -> Result<MedicineRow, DbError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, MedicineRow>(
        "SELECT id, public_id, pharmacy_id, name, strength, form, unit_price, \
                quantity, out_of_stock, requires_prescription, created_at, updated_at \
         FROM medicines \
         WHERE public_id = $1 \
         FOR UPDATE",
    )
    .bind(public_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let name = update.name.clone().unwrap_or(current.name);
    let strength = match &update.strength {
        Some(value) => value.clone(),
        None => current.strength,
    };
    let form = update
        .form
        .map_or(current.form, |f| f.as_str().to_owned());
    let unit_price = update.unit_price.unwrap_or(current.unit_price);
    let requires_prescription = update
        .requires_prescription
        .unwrap_or(current.requires_prescription);

    let row = sqlx::query_as::<_, MedicineRow>(
        "UPDATE medicines \
         SET name = $2, strength = $3, form = $4, unit_price = $5, \
             requires_prescription = $6, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, public_id, pharmacy_id, name, strength, form, unit_price, \
                   quantity, out_of_stock, requires_prescription, created_at, updated_at",
    )
    .bind(current.id)
    .bind(&name)
    .bind(&strength)
    .bind(&form)
    .bind(unit_price)
    .bind(requires_prescription)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Set a medicine's remaining quantity, syncing the out-of-stock flag in the
/// same statement: restocking to a positive quantity clears the flag, setting
/// zero raises it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such medicine exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn restock_medicine(
    pool: &PgPool,
    public_id: Uuid,
    quantity: i32,
) -> Result<MedicineRow, DbError> {
    sqlx::query_as::<_, MedicineRow>(
        "UPDATE medicines \
         SET quantity = $2, out_of_stock = ($2 = 0), updated_at = NOW() \
         WHERE public_id = $1 \
         RETURNING id, public_id, pharmacy_id, name, strength, form, unit_price, \
                   quantity, out_of_stock, requires_prescription, created_at, updated_at",
    )
    .bind(public_id)
    .bind(quantity)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Escape LIKE/ILIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_passes_plain_text_through() {
        assert_eq!(escape_like("Amoxicillin"), "Amoxicillin");
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%_pure"), "100\\%\\_pure");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
