//! In-memory ranking of catalog search results.
//!
//! The store applies the availability and name filters; everything here is
//! pure CPU over the retrieved rows: optional delivery filtering, distance
//! attachment against an observer position, and a total ordering. No I/O,
//! no shared state.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::geo::{haversine_km, GeoPoint};
use crate::CoreError;

/// Total ordering applied to a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    PriceAscending,
    PriceDescending,
    /// Ascending distance to the observer; unknown distances sort last.
    Nearest,
    /// Keep whatever order the store returned.
    RetrievalOrder,
}

impl SortMode {
    /// Resolve the effective mode from a request's `sort` parameter.
    ///
    /// An explicit price sort always wins, coordinates or not. With no
    /// explicit sort, an observer position implies nearest-first; with
    /// neither, the store's retrieval order stands.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSortMode`] for any value other than
    /// `price_asc` or `price_desc`.
    pub fn resolve(param: Option<&str>, has_observer: bool) -> Result<Self, CoreError> {
        match param {
            Some("price_asc") => Ok(Self::PriceAscending),
            Some("price_desc") => Ok(Self::PriceDescending),
            Some(other) => Err(CoreError::UnknownSortMode(other.to_owned())),
            None if has_observer => Ok(Self::Nearest),
            None => Ok(Self::RetrievalOrder),
        }
    }
}

/// Read access to the selling-location fields ranking needs.
pub trait Locatable {
    fn location(&self) -> Option<GeoPoint>;
    fn delivery_available(&self) -> bool;
}

/// Read access to the price ranking sorts by.
pub trait Priced {
    fn unit_price(&self) -> Decimal;
}

/// An item paired with its computed distance to the observer.
///
/// `distance_km` is `None` when either side lacks a position — "unknown",
/// deliberately distinct from a zero distance.
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    pub item: T,
    pub distance_km: Option<f64>,
}

/// Rank catalog entries: delivery filter, distance attachment, total order.
///
/// All sorts are stable, so equal keys keep the store's retrieval order.
pub fn rank<T>(
    items: Vec<T>,
    observer: Option<GeoPoint>,
    delivery_only: bool,
    sort: SortMode,
) -> Vec<Ranked<T>>
where
    T: Locatable + Priced,
{
    let mut ranked = attach_distances(items, observer, delivery_only);

    match sort {
        SortMode::PriceAscending => {
            ranked.sort_by(|a, b| a.item.unit_price().cmp(&b.item.unit_price()));
        }
        SortMode::PriceDescending => {
            ranked.sort_by(|a, b| b.item.unit_price().cmp(&a.item.unit_price()));
        }
        SortMode::Nearest => ranked.sort_by(|a, b| cmp_distance(a.distance_km, b.distance_km)),
        SortMode::RetrievalOrder => {}
    }

    ranked
}

/// Rank selling locations by distance alone (the nearby-pharmacy listing).
///
/// The observer is mandatory here; "nearby" is meaningless without one.
/// Locations with no known position trail the ranked ones.
pub fn rank_nearest<T: Locatable>(
    items: Vec<T>,
    observer: GeoPoint,
    delivery_only: bool,
) -> Vec<Ranked<T>> {
    let mut ranked = attach_distances(items, Some(observer), delivery_only);
    ranked.sort_by(|a, b| cmp_distance(a.distance_km, b.distance_km));
    ranked
}

fn attach_distances<T: Locatable>(
    items: Vec<T>,
    observer: Option<GeoPoint>,
    delivery_only: bool,
) -> Vec<Ranked<T>> {
    items
        .into_iter()
        .filter(|item| !delivery_only || item.delivery_available())
        .map(|item| {
            let distance_km = match (observer, item.location()) {
                (Some(from), Some(to)) => Some(haversine_km(from, to)),
                _ => None,
            };
            Ranked { item, distance_km }
        })
        .collect()
}

/// Compare optional distances: known before unknown, unknown ties equal.
///
/// Spelled out as a comparator rather than substituting a large sentinel,
/// so a legitimately huge real distance still sorts before "unknown".
fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Entry {
        tag: &'static str,
        price: Decimal,
        location: Option<GeoPoint>,
        delivery: bool,
    }

    impl Locatable for Entry {
        fn location(&self) -> Option<GeoPoint> {
            self.location
        }

        fn delivery_available(&self) -> bool {
            self.delivery
        }
    }

    impl Priced for Entry {
        fn unit_price(&self) -> Decimal {
            self.price
        }
    }

    fn entry(tag: &'static str, price: &str, location: Option<GeoPoint>, delivery: bool) -> Entry {
        Entry {
            tag,
            price: price.parse().expect("test price"),
            location,
            delivery,
        }
    }

    fn point(longitude: f64, latitude: f64) -> GeoPoint {
        GeoPoint::new(longitude, latitude).expect("test point")
    }

    fn tags(ranked: &[Ranked<Entry>]) -> Vec<&'static str> {
        ranked.iter().map(|r| r.item.tag).collect()
    }

    #[test]
    fn resolve_explicit_price_sorts() {
        assert_eq!(
            SortMode::resolve(Some("price_asc"), true).expect("asc"),
            SortMode::PriceAscending
        );
        assert_eq!(
            SortMode::resolve(Some("price_desc"), false).expect("desc"),
            SortMode::PriceDescending
        );
    }

    #[test]
    fn resolve_defaults_to_nearest_with_observer() {
        assert_eq!(
            SortMode::resolve(None, true).expect("nearest"),
            SortMode::Nearest
        );
    }

    #[test]
    fn resolve_defaults_to_retrieval_order_without_observer() {
        assert_eq!(
            SortMode::resolve(None, false).expect("retrieval"),
            SortMode::RetrievalOrder
        );
    }

    #[test]
    fn resolve_rejects_unknown_sort() {
        let result = SortMode::resolve(Some("cheapest"), false);
        assert!(matches!(result, Err(CoreError::UnknownSortMode(ref s)) if s == "cheapest"));
    }

    #[test]
    fn delivery_only_drops_non_delivering_entries() {
        let items = vec![
            entry("a", "10.00", None, true),
            entry("b", "5.00", None, false),
            entry("c", "7.50", None, true),
        ];
        let ranked = rank(items, None, true, SortMode::RetrievalOrder);
        assert_eq!(tags(&ranked), vec!["a", "c"]);
    }

    #[test]
    fn price_ascending_orders_adjacent_pairs() {
        let items = vec![
            entry("mid", "12.00", None, false),
            entry("high", "30.00", None, false),
            entry("low", "4.25", None, false),
        ];
        let ranked = rank(items, None, false, SortMode::PriceAscending);
        assert_eq!(tags(&ranked), vec!["low", "mid", "high"]);
        for pair in ranked.windows(2) {
            assert!(pair[0].item.price <= pair[1].item.price);
        }
    }

    #[test]
    fn price_descending_reverses() {
        let items = vec![
            entry("mid", "12.00", None, false),
            entry("high", "30.00", None, false),
            entry("low", "4.25", None, false),
        ];
        let ranked = rank(items, None, false, SortMode::PriceDescending);
        assert_eq!(tags(&ranked), vec!["high", "mid", "low"]);
    }

    #[test]
    fn price_ties_keep_retrieval_order() {
        let items = vec![
            entry("first", "9.99", None, false),
            entry("second", "9.99", None, false),
            entry("third", "9.99", None, false),
        ];
        let ranked = rank(items, None, false, SortMode::PriceAscending);
        assert_eq!(tags(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn nearest_orders_by_distance_with_unknown_last() {
        let observer = point(38.74, 9.03);
        let items = vec![
            entry("far", "1.00", Some(point(39.27, 8.54)), false),
            entry("unknown", "1.00", None, false),
            entry("near", "1.00", Some(point(38.75, 9.04)), false),
        ];
        let ranked = rank(items, Some(observer), false, SortMode::Nearest);
        assert_eq!(tags(&ranked), vec!["near", "far", "unknown"]);
        assert!(ranked[0].distance_km.expect("near") < ranked[1].distance_km.expect("far"));
        assert!(ranked[2].distance_km.is_none());
    }

    #[test]
    fn no_observer_leaves_every_distance_unknown() {
        let items = vec![
            entry("a", "1.00", Some(point(38.74, 9.03)), false),
            entry("b", "2.00", None, false),
        ];
        let ranked = rank(items, None, false, SortMode::RetrievalOrder);
        assert!(ranked.iter().all(|r| r.distance_km.is_none()));
    }

    #[test]
    fn explicit_price_sort_ignores_observer_distances() {
        let observer = point(38.74, 9.03);
        let items = vec![
            entry("near_pricey", "30.00", Some(point(38.75, 9.04)), false),
            entry("far_cheap", "2.00", Some(point(39.27, 8.54)), false),
        ];
        let ranked = rank(items, Some(observer), false, SortMode::PriceAscending);
        assert_eq!(tags(&ranked), vec!["far_cheap", "near_pricey"]);
        // Distances are still attached for display even under a price sort.
        assert!(ranked.iter().all(|r| r.distance_km.is_some()));
    }

    #[test]
    fn rank_nearest_sorts_locations() {
        let observer = point(38.74, 9.03);
        let items = vec![
            entry("no_point", "0.00", None, true),
            entry("close", "0.00", Some(point(38.76, 9.02)), true),
            entry("distant", "0.00", Some(point(39.27, 8.54)), true),
        ];
        let ranked = rank_nearest(items, observer, false);
        assert_eq!(tags(&ranked), vec!["close", "distant", "no_point"]);
    }

    #[test]
    fn rank_nearest_honors_delivery_filter() {
        let observer = point(38.74, 9.03);
        let items = vec![
            entry("delivers", "0.00", Some(point(38.76, 9.02)), true),
            entry("pickup_only", "0.00", Some(point(38.75, 9.03)), false),
        ];
        let ranked = rank_nearest(items, observer, true);
        assert_eq!(tags(&ranked), vec!["delivers"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let ranked = rank(Vec::<Entry>::new(), None, false, SortMode::Nearest);
        assert!(ranked.is_empty());
    }
}
