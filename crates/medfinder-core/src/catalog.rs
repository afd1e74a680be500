//! Catalog domain types and the seed fixtures file.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::{ConfigError, CoreError};

/// Dosage form of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicineForm {
    Tablet,
    Syrup,
    Injection,
}

impl MedicineForm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MedicineForm::Tablet => "tablet",
            MedicineForm::Syrup => "syrup",
            MedicineForm::Injection => "injection",
        }
    }

    /// Parse the lowercase wire/database representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownForm`] for any other value.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "tablet" => Ok(MedicineForm::Tablet),
            "syrup" => Ok(MedicineForm::Syrup),
            "injection" => Ok(MedicineForm::Injection),
            other => Err(CoreError::UnknownForm(other.to_owned())),
        }
    }
}

impl std::fmt::Display for MedicineForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry in the seed fixtures.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicineFixture {
    pub name: String,
    pub strength: Option<String>,
    pub form: MedicineForm,
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub requires_prescription: bool,
}

/// One pharmacy in the seed fixtures, with its catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct PharmacyFixture {
    pub name: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub delivery_available: bool,
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub medicines: Vec<MedicineFixture>,
}

impl PharmacyFixture {
    /// The fixture's geographic point, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartialPoint`] when exactly one coordinate is
    /// given, or [`CoreError::CoordinateOutOfRange`] for invalid values.
    pub fn point(&self) -> Result<Option<GeoPoint>, CoreError> {
        GeoPoint::from_parts(self.longitude, self.latitude)
    }
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub pharmacies: Vec<PharmacyFixture>,
}

/// Load and validate seed fixtures from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_seed(path: &Path) -> Result<SeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let seed: SeedFile = serde_yaml::from_str(&content)?;
    validate_seed(&seed)?;

    Ok(seed)
}

fn validate_seed(seed: &SeedFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for pharmacy in &seed.pharmacies {
        if pharmacy.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pharmacy name must be non-empty".to_string(),
            ));
        }

        let key = (
            pharmacy.name.to_lowercase(),
            pharmacy.city.to_lowercase(),
        );
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate pharmacy: '{}' in {}",
                pharmacy.name, pharmacy.city
            )));
        }

        pharmacy.point().map_err(|e| {
            ConfigError::Validation(format!("pharmacy '{}': {e}", pharmacy.name))
        })?;

        if let Some(rating) = pharmacy.rating {
            if rating < Decimal::ZERO || rating > Decimal::from(5) {
                return Err(ConfigError::Validation(format!(
                    "pharmacy '{}' has rating {rating}; must be within 0–5",
                    pharmacy.name
                )));
            }
        }

        for medicine in &pharmacy.medicines {
            if medicine.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "pharmacy '{}' has a medicine with an empty name",
                    pharmacy.name
                )));
            }
            if medicine.unit_price <= Decimal::ZERO {
                return Err(ConfigError::Validation(format!(
                    "medicine '{}' has non-positive unit price {}",
                    medicine.name, medicine.unit_price
                )));
            }
            if medicine.quantity < 0 {
                return Err(ConfigError::Validation(format!(
                    "medicine '{}' has negative quantity {}",
                    medicine.name, medicine.quantity
                )));
            }
        }
    }

    Ok(())
}
