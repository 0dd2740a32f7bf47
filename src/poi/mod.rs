use std::collections::HashMap;

use serde::Serialize;

pub mod overpass;

/// Hard cap on emitted POIs per request, regardless of upstream.
pub const MAX_POIS: usize = 50;

/// A normalized point of interest. Every emitted POI has finite, in-range
/// coordinates; unnamed entities carry the placeholder name.
#[derive(Clone, Debug, Serialize)]
pub struct Poi {
    /// Provider-qualified identity, e.g. `overpass:node/123`.
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub category: Category,
    /// Raw tag value the category was derived from, or `unknown`.
    pub kind: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Historic,
    Tourism,
    Amenity,
    Shop,
    Leisure,
    Other,
}

/// Derives the coarse category from raw OSM-style tags.
///
/// Precedence is fixed: food-indicating tags win over everything, then
/// historic, tourism, generic amenity, shop, leisure, and finally `other`.
pub fn categorize(tags: &HashMap<String, String>) -> Category {
    if is_food(tags) {
        Category::Food
    } else if tags.contains_key("historic") {
        Category::Historic
    } else if tags.contains_key("tourism") {
        Category::Tourism
    } else if tags.contains_key("amenity") {
        Category::Amenity
    } else if tags.contains_key("shop") {
        Category::Shop
    } else if tags.contains_key("leisure") {
        Category::Leisure
    } else {
        Category::Other
    }
}

fn is_food(tags: &HashMap<String, String>) -> bool {
    tags.get("amenity").is_some_and(|a| a == "ice_cream")
        || tags.get("shop").is_some_and(|s| {
            matches!(s.as_str(), "bakery" | "confectionery" | "ice_cream" | "pastry")
        })
        || tags.get("cuisine").is_some_and(|c| {
            c.split(';').any(|part| {
                matches!(
                    part.trim(),
                    "ice_cream" | "dessert" | "cake" | "crepe" | "waffle"
                )
            })
        })
}

/// Display name with the documented fallback chain: explicit name, shop
/// type, amenity type, "Historic {type}", tourism type, placeholder.
pub fn display_name(tags: &HashMap<String, String>) -> String {
    if let Some(name) = tags.get("name") {
        return name.clone();
    }
    if let Some(shop) = tags.get("shop") {
        return shop.clone();
    }
    if let Some(amenity) = tags.get("amenity") {
        return amenity.clone();
    }
    if let Some(historic) = tags.get("historic") {
        return format!("Historic {historic}");
    }
    if let Some(tourism) = tags.get("tourism") {
        return tourism.clone();
    }
    "Unnamed POI".to_string()
}

/// First present raw tag value among shop/amenity/historic/tourism/leisure.
pub fn kind(tags: &HashMap<String, String>) -> String {
    ["shop", "amenity", "historic", "tourism", "leisure"]
        .iter()
        .find_map(|key| tags.get(*key))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn food_wins_over_tourism() {
        let t = tags(&[("amenity", "ice_cream"), ("tourism", "attraction")]);
        assert_eq!(categorize(&t), Category::Food);
    }

    #[test]
    fn dessert_cuisine_counts_as_food() {
        let t = tags(&[("amenity", "cafe"), ("cuisine", "coffee;dessert")]);
        assert_eq!(categorize(&t), Category::Food);
    }

    #[test]
    fn bakery_shop_counts_as_food() {
        let t = tags(&[("shop", "bakery")]);
        assert_eq!(categorize(&t), Category::Food);
    }

    #[test]
    fn category_precedence_order() {
        assert_eq!(
            categorize(&tags(&[("historic", "castle"), ("tourism", "attraction")])),
            Category::Historic
        );
        assert_eq!(
            categorize(&tags(&[("tourism", "museum"), ("amenity", "toilets")])),
            Category::Tourism
        );
        assert_eq!(
            categorize(&tags(&[("amenity", "restaurant"), ("shop", "gift")])),
            Category::Amenity
        );
        assert_eq!(categorize(&tags(&[("shop", "gift")])), Category::Shop);
        assert_eq!(categorize(&tags(&[("leisure", "park")])), Category::Leisure);
        assert_eq!(categorize(&tags(&[("natural", "tree")])), Category::Other);
    }

    #[test]
    fn name_fallback_chain() {
        assert_eq!(display_name(&tags(&[("name", "Topkapı")])), "Topkapı");
        assert_eq!(display_name(&tags(&[("shop", "bakery")])), "bakery");
        assert_eq!(display_name(&tags(&[("amenity", "cafe")])), "cafe");
        assert_eq!(
            display_name(&tags(&[("historic", "castle")])),
            "Historic castle"
        );
        assert_eq!(display_name(&tags(&[("tourism", "museum")])), "museum");
        assert_eq!(display_name(&tags(&[])), "Unnamed POI");
    }

    #[test]
    fn kind_picks_first_present_tag() {
        assert_eq!(kind(&tags(&[("shop", "bakery"), ("amenity", "cafe")])), "bakery");
        assert_eq!(kind(&tags(&[("leisure", "park")])), "park");
        assert_eq!(kind(&tags(&[])), "unknown");
    }
}
