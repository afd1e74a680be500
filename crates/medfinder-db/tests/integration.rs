//! Offline unit tests for medfinder-db pool configuration and row types.
//! These tests do not require a live database connection.

use medfinder_core::search::{Locatable, Priced};
use medfinder_core::{AppConfig, Environment};
use medfinder_db::{MedicineSearchRow, PharmacyRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
        log_level: "info".to_string(),
        seed_path: PathBuf::from("./config/seed.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn sample_search_row() -> MedicineSearchRow {
    use uuid::Uuid;

    MedicineSearchRow {
        id: 1,
        public_id: Uuid::new_v4(),
        name: "Amoxicillin".to_string(),
        strength: Some("500mg".to_string()),
        form: "tablet".to_string(),
        unit_price: "120.00".parse().expect("price"),
        quantity: 12,
        out_of_stock: false,
        requires_prescription: true,
        pharmacy_public_id: Uuid::new_v4(),
        pharmacy_name: "Gishen Pharmacy".to_string(),
        pharmacy_city: "Addis Ababa".to_string(),
        latitude: Some(9.03),
        longitude: Some(38.74),
        delivery_available: true,
        rating: Some("4.5".parse().expect("rating")),
    }
}

#[test]
fn search_row_exposes_ranking_inputs() {
    let row = sample_search_row();

    assert!(row.available());
    assert!(row.delivery_available());
    assert_eq!(row.unit_price(), "120.00".parse().expect("price"));

    let location = Locatable::location(&row).expect("location");
    assert!((location.latitude - 9.03).abs() < f64::EPSILON);
    assert!((location.longitude - 38.74).abs() < f64::EPSILON);
}

#[test]
fn search_row_without_coordinates_has_no_location() {
    let mut row = sample_search_row();
    row.latitude = None;
    row.longitude = None;
    assert!(Locatable::location(&row).is_none());
}

#[test]
fn search_row_flagged_out_of_stock_is_unavailable() {
    let mut row = sample_search_row();
    row.out_of_stock = true;
    assert!(!row.available());

    let mut row = sample_search_row();
    row.quantity = 0;
    assert!(!row.available());
}

#[test]
fn pharmacy_row_partial_point_degrades_to_none() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = PharmacyRow {
        id: 5,
        public_id: Uuid::new_v4(),
        name: "Halfway Pharmacy".to_string(),
        city: "Adama".to_string(),
        latitude: Some(8.54),
        longitude: None,
        delivery_available: false,
        rating: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert!(row.location().is_none());
}
