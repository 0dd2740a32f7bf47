//! Overpass POI search.
//!
//! Builds a single bounded-radius query over a fixed set of tag predicates,
//! executes it against an Overpass interpreter, and normalizes the returned
//! elements into the shared POI shape.

use std::collections::HashMap;

use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;

use crate::poi::{MAX_POIS, Poi, categorize, display_name, kind};
use crate::routing::providers::{ProviderError, classify_status};

pub const DEFAULT_URL: &str = "https://overpass-api.de/api/interpreter";

pub const MIN_RADIUS_M: f64 = 100.0;
pub const MAX_RADIUS_M: f64 = 50_000.0;
pub const DEFAULT_RADIUS_M: f64 = 3_000.0;

pub struct OverpassClient {
    client: Client,
    url: String,
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize, Clone, Copy)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassClient {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }

    pub async fn search(&self, lat: f64, lon: f64, radius: f64) -> Result<Vec<Poi>, ProviderError> {
        let query = build_query(lat, lon, radius);

        tracing::debug!(lat, lon, radius, "querying Overpass");
        let response = self.client.post(&self.url).body(query).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: OverpassResponse = serde_json::from_str(&text)?;
        Ok(normalize_elements(parsed.elements))
    }
}

/// One query covering the fixed predicate set: dessert-oriented food spots,
/// historic sites, attractions, museums, restaurants, cafes, and parks, as
/// both nodes and ways. `out center` makes way centroids available.
fn build_query(lat: f64, lon: f64, radius: f64) -> String {
    let around = format!("(around:{radius},{lat},{lon})");
    let predicates = [
        r#"["amenity"="ice_cream"]"#,
        r#"["shop"~"bakery|confectionery|ice_cream|pastry"]"#,
        r#"["cuisine"~"ice_cream|dessert|cake|crepe|waffle"]"#,
        r#"["historic"]"#,
        r#"["tourism"="attraction"]"#,
        r#"["tourism"="museum"]"#,
        r#"["amenity"~"restaurant|cafe"]"#,
        r#"["leisure"="park"]"#,
    ];

    let mut body = String::new();
    for predicate in predicates {
        body.push_str(&format!("node{predicate}{around};way{predicate}{around};"));
    }

    format!("[out:json][timeout:25];({body});out center;")
}

/// Resolves coordinates, drops unlocatable elements, derives category, name,
/// and kind, deduplicates by id, and caps the result.
fn normalize_elements(elements: Vec<OverpassElement>) -> Vec<Poi> {
    elements
        .into_iter()
        .filter_map(|element| {
            let (lat, lon) = resolve_coordinate(&element)?;
            Some(Poi {
                id: format!("overpass:{}/{}", element.element_type, element.id),
                name: display_name(&element.tags),
                lat,
                lon,
                category: categorize(&element.tags),
                kind: kind(&element.tags),
            })
        })
        .unique_by(|poi| poi.id.clone())
        .take(MAX_POIS)
        .collect()
}

/// Point coordinate for nodes, centroid for ways; `None` when neither is
/// present or the values are not finite and in range.
fn resolve_coordinate(element: &OverpassElement) -> Option<(f64, f64)> {
    let (lat, lon) = match (element.lat, element.lon, element.center) {
        (Some(lat), Some(lon), _) => (lat, lon),
        (_, _, Some(center)) => (center.lat, center.lon),
        _ => return None,
    };

    let in_range =
        lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
    in_range.then_some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64, tags: &[(&str, &str)]) -> OverpassElement {
        OverpassElement {
            element_type: "node".to_string(),
            id,
            lat: Some(lat),
            lon: Some(lon),
            center: None,
            tags: tags
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn query_contains_radius_and_predicates() {
        let query = build_query(41.02, 28.97, 2500.0);
        assert!(query.starts_with("[out:json]"));
        assert!(query.contains("(around:2500,41.02,28.97)"));
        assert!(query.contains(r#"["historic"]"#));
        assert!(query.contains(r#"["amenity"="ice_cream"]"#));
        assert!(query.ends_with("out center;"));
    }

    #[test]
    fn way_center_is_used_when_node_coordinates_absent() {
        let element = OverpassElement {
            element_type: "way".to_string(),
            id: 7,
            lat: None,
            lon: None,
            center: Some(OverpassCenter {
                lat: 41.01,
                lon: 28.95,
            }),
            tags: HashMap::new(),
        };
        assert_eq!(resolve_coordinate(&element), Some((41.01, 28.95)));
    }

    #[test]
    fn unlocatable_elements_are_dropped() {
        let element = OverpassElement {
            element_type: "way".to_string(),
            id: 8,
            lat: None,
            lon: None,
            center: None,
            tags: HashMap::new(),
        };
        assert!(normalize_elements(vec![element]).is_empty());
    }

    #[test]
    fn out_of_range_coordinates_are_dropped() {
        let pois = normalize_elements(vec![node(1, 95.0, 28.9, &[])]);
        assert!(pois.is_empty());
    }

    #[test]
    fn elements_are_normalized_with_qualified_ids() {
        let pois = normalize_elements(vec![node(
            42,
            41.02,
            28.97,
            &[("name", "Gelato Corner"), ("amenity", "ice_cream")],
        )]);
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].id, "overpass:node/42");
        assert_eq!(pois[0].name, "Gelato Corner");
        assert_eq!(pois[0].category, crate::poi::Category::Food);
        assert_eq!(pois[0].kind, "ice_cream");
    }

    #[test]
    fn duplicate_ids_are_removed() {
        let pois = normalize_elements(vec![
            node(1, 41.0, 29.0, &[("name", "First")]),
            node(1, 41.0, 29.0, &[("name", "Duplicate")]),
        ]);
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].name, "First");
    }

    #[test]
    fn result_list_is_capped() {
        let elements: Vec<OverpassElement> = (0..80)
            .map(|i| node(i, 41.0 + i as f64 * 1e-4, 29.0, &[("amenity", "cafe")]))
            .collect();
        assert_eq!(normalize_elements(elements).len(), MAX_POIS);
    }

    #[test]
    fn parses_overpass_response_shape() {
        let json = r#"{
            "elements": [
                {"type": "node", "id": 1, "lat": 41.0, "lon": 28.9,
                 "tags": {"historic": "castle"}},
                {"type": "way", "id": 2, "center": {"lat": 41.1, "lon": 28.8},
                 "tags": {"leisure": "park", "name": "Gülhane"}}
            ]
        }"#;
        let parsed: OverpassResponse = serde_json::from_str(json).expect("should parse");
        let pois = normalize_elements(parsed.elements);
        assert_eq!(pois.len(), 2);
        assert_eq!(pois[0].name, "Historic castle");
        assert_eq!(pois[1].id, "overpass:way/2");
    }
}
