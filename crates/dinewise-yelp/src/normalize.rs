//! Converts raw Yelp payloads into [`dinewise_core`] records.

use dinewise_core::{Coordinates, ExternalReview, RestaurantDetail, RestaurantSummary, ReviewAuthor};

use crate::types::{RawBusiness, RawCoordinates, RawLocation, RawReview};

pub(crate) fn summary_from_raw(raw: RawBusiness) -> RestaurantSummary {
    RestaurantSummary {
        address: raw.location.as_ref().and_then(format_address),
        coordinates: raw.coordinates.and_then(coordinates_from_raw),
        categories: raw.categories.into_iter().map(|c| c.title).collect(),
        id: raw.id,
        name: raw.name,
        rating: raw.rating.unwrap_or(0.0),
        review_count: raw.review_count.unwrap_or(0).max(0),
        price: non_empty(raw.price),
        image_url: non_empty(raw.image_url),
        distance: raw.distance,
        is_open: !raw.is_closed.unwrap_or(false),
        phone: non_empty(raw.display_phone),
        yelp_url: non_empty(raw.url),
    }
}

/// Hours come from `hours` when present, otherwise `business_hours`; only
/// the first (regular) schedule is kept.
pub(crate) fn detail_from_raw(raw: RawBusiness) -> RestaurantDetail {
    let hours = raw
        .hours
        .first()
        .or_else(|| raw.business_hours.first())
        .cloned();

    RestaurantDetail {
        address: raw.location.as_ref().and_then(format_address),
        coordinates: raw.coordinates.and_then(coordinates_from_raw),
        categories: raw.categories.into_iter().map(|c| c.title).collect(),
        id: raw.id,
        name: raw.name,
        rating: raw.rating.unwrap_or(0.0),
        review_count: raw.review_count.unwrap_or(0).max(0),
        price: non_empty(raw.price),
        image_url: non_empty(raw.image_url),
        photos: raw.photos,
        is_open: !raw.is_closed.unwrap_or(false),
        phone: non_empty(raw.display_phone),
        yelp_url: non_empty(raw.url),
        hours,
        transactions: raw.transactions,
    }
}

pub(crate) fn review_from_raw(raw: RawReview) -> ExternalReview {
    let user = raw.user.map_or_else(
        || ReviewAuthor {
            id: None,
            name: String::new(),
            profile_url: None,
            image_url: None,
        },
        |u| ReviewAuthor {
            id: u.id,
            name: u.name.unwrap_or_default(),
            profile_url: non_empty(u.profile_url),
            image_url: non_empty(u.image_url),
        },
    );

    ExternalReview {
        id: raw.id,
        rating: raw.rating,
        text: raw.text,
        time_created: raw.time_created,
        user,
        url: non_empty(raw.url),
    }
}

fn format_address(location: &RawLocation) -> Option<String> {
    let parts: Vec<&str> = [&location.address1, &location.city, &location.state]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn coordinates_from_raw(raw: RawCoordinates) -> Option<Coordinates> {
    match (raw.latitude, raw.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: serde_json::Value) -> RawBusiness {
        serde_json::from_value(value).expect("raw business")
    }

    #[test]
    fn summary_uses_category_titles_and_joined_address() {
        let summary = summary_from_raw(raw(serde_json::json!({
            "id": "katz-delicatessen-new-york",
            "name": "Katz's Delicatessen",
            "rating": 4.0,
            "review_count": 14000,
            "price": "$$",
            "categories": [{"alias": "delis", "title": "Delis"}],
            "is_closed": false,
            "location": {"address1": "205 E Houston St", "address2": "", "city": "New York", "state": "NY"},
            "display_phone": "(212) 254-2246",
            "coordinates": {"latitude": 40.7223, "longitude": -73.9874}
        })));

        assert_eq!(summary.categories, vec!["Delis"]);
        assert_eq!(
            summary.address.as_deref(),
            Some("205 E Houston St, New York, NY")
        );
        assert!(summary.is_open);
        assert_eq!(summary.phone.as_deref(), Some("(212) 254-2246"));
        assert!(summary.coordinates.is_some());
    }

    #[test]
    fn summary_defaults_missing_fields() {
        let summary = summary_from_raw(raw(serde_json::json!({
            "id": "bare",
            "name": "Bare",
            "display_phone": "",
            "image_url": ""
        })));

        assert_eq!(summary.review_count, 0);
        assert!(summary.price.is_none());
        assert!(summary.address.is_none());
        assert!(summary.phone.is_none());
        assert!(summary.image_url.is_none());
        assert!(summary.distance.is_none());
        assert!(summary.coordinates.is_none());
        assert!(summary.is_open);
    }

    #[test]
    fn explicit_nulls_become_neutral_defaults() {
        let business = raw(serde_json::json!({
            "id": "nulls",
            "name": "Nulls",
            "categories": null,
            "photos": null,
            "hours": null,
            "business_hours": null,
            "transactions": null,
            "location": null,
            "coordinates": null,
            "is_closed": null
        }));

        let summary = summary_from_raw(business.clone());
        assert!(summary.categories.is_empty());
        assert!(summary.is_open);

        let detail = detail_from_raw(business);
        assert!(detail.photos.is_empty());
        assert!(detail.hours.is_none());
        assert!(detail.transactions.is_empty());
    }

    #[test]
    fn null_review_fields_default() {
        let review: RawReview = serde_json::from_value(serde_json::json!({
            "id": "r2",
            "rating": null,
            "text": null,
            "time_created": null,
            "user": null
        }))
        .expect("raw review");
        let review = review_from_raw(review);
        assert_eq!(review.text, "");
    }

    #[test]
    fn closed_business_is_not_open() {
        let summary = summary_from_raw(raw(serde_json::json!({
            "id": "gone",
            "name": "Gone",
            "is_closed": true
        })));
        assert!(!summary.is_open);
    }

    #[test]
    fn detail_prefers_hours_over_business_hours() {
        let detail = detail_from_raw(raw(serde_json::json!({
            "id": "h",
            "name": "H",
            "hours": [{"open": [{"day": 0, "start": "1100", "end": "2200", "is_overnight": false}], "hours_type": "REGULAR", "is_open_now": true}],
            "business_hours": [{"open": [], "hours_type": "LEGACY"}],
            "photos": ["https://img.example.com/1.jpg"],
            "transactions": ["pickup", "delivery"]
        })));

        let hours = detail.hours.expect("hours");
        assert_eq!(hours.hours_type.as_deref(), Some("REGULAR"));
        assert_eq!(hours.open.len(), 1);
        assert_eq!(detail.photos.len(), 1);
        assert_eq!(detail.transactions, vec!["pickup", "delivery"]);
    }

    #[test]
    fn detail_falls_back_to_business_hours() {
        let detail = detail_from_raw(raw(serde_json::json!({
            "id": "h",
            "name": "H",
            "business_hours": [{"open": [], "hours_type": "REGULAR"}]
        })));
        assert!(detail.hours.is_some());
    }

    #[test]
    fn review_without_user_gets_anonymous_author() {
        let review: RawReview = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "rating": 5,
            "text": "Great pastrami",
            "time_created": "2024-03-01 12:00:00"
        }))
        .expect("raw review");
        let review = review_from_raw(review);
        assert_eq!(review.user.name, "");
        assert!((review.rating - 5.0).abs() < f64::EPSILON);
    }
}
