use sqlx::PgPool;

use medfinder_core::catalog::PharmacyFixture;

use crate::DbError;

/// Upsert pharmacies and their catalogs from seed fixtures.
///
/// Returns the number of pharmacies processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails the
/// entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Fixture`] if a fixture carries a partial coordinate
/// pair, or [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, pharmacies: &[PharmacyFixture]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for pharmacy in pharmacies {
        let point = pharmacy.point()?;
        let (latitude, longitude) = match point {
            Some(point) => (Some(point.latitude), Some(point.longitude)),
            None => (None, None),
        };

        let pharmacy_id: i64 = sqlx::query_scalar(
            "INSERT INTO pharmacies \
                 (name, city, latitude, longitude, delivery_available, rating, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
             ON CONFLICT (name, city) DO UPDATE SET \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 delivery_available = EXCLUDED.delivery_available, \
                 rating = EXCLUDED.rating, \
                 is_active = TRUE, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&pharmacy.name)
        .bind(&pharmacy.city)
        .bind(latitude)
        .bind(longitude)
        .bind(pharmacy.delivery_available)
        .bind(pharmacy.rating)
        .fetch_one(&mut *tx)
        .await?;

        for medicine in &pharmacy.medicines {
            sqlx::query(
                "INSERT INTO medicines \
                     (pharmacy_id, name, strength, form, unit_price, quantity, \
                      out_of_stock, requires_prescription) \
                 VALUES ($1, $2, $3, $4, $5, $6, $6 = 0, $7) \
                 ON CONFLICT (pharmacy_id, name, strength) DO UPDATE SET \
                     form = EXCLUDED.form, \
                     unit_price = EXCLUDED.unit_price, \
                     quantity = EXCLUDED.quantity, \
                     out_of_stock = EXCLUDED.out_of_stock, \
                     requires_prescription = EXCLUDED.requires_prescription, \
                     updated_at = NOW()",
            )
            .bind(pharmacy_id)
            .bind(&medicine.name)
            .bind(&medicine.strength)
            .bind(medicine.form.as_str())
            .bind(medicine.unit_price)
            .bind(medicine.quantity)
            .bind(medicine.requires_prescription)
            .execute(&mut *tx)
            .await?;
        }

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
