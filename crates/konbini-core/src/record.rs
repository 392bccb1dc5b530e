use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validate::{self, ValidationError};

/// Provenance of a crawled entity.
///
/// `(source_site, external_id)` is the identity key: it designates one
/// real-world entity across repeated crawls and is the upsert/lookup key in
/// every persisted collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOrigin {
    /// Name of the crawl job that produced the record, e.g. `"gs25web"`.
    pub source_site: String,
    /// The site's own identifier for the entity, opaque to the pipeline.
    pub external_id: String,
    /// Page the record was extracted from.
    pub source_url: String,
}

impl CrawlOrigin {
    /// The `(source_site, external_id)` identity pair.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.source_site, &self.external_id)
    }
}

/// A product price at crawl time.
///
/// `amount` is the list price; `discounted_amount`, when present, is the
/// promotional price and never exceeds `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Decimal,
    /// Currency table id (see [`crate::codes`]); e.g. KRW = 1.
    pub currency_code: i32,
    pub discounted_amount: Option<Decimal>,
}

/// Pixel dimensions of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Images attached to a record.
///
/// `dimensions` is keyed by role (`"primary"`, `"additional[i]"`) and is
/// filled in by the image uploader after the crawl; an empty map means the
/// upload is still pending, which is a valid state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSet {
    pub primary_url: Option<String>,
    #[serde(default)]
    pub additional_urls: Vec<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, Dimensions>,
}

/// Reference to a promotion a product participates in, e.g. "1+1 at GS25".
///
/// A pure value: identity is the `(brand_id, event_type_id)` pair itself,
/// so a product's events form a set, never a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventRef {
    pub brand_id: i32,
    pub event_type_id: i32,
}

/// A convenience-store product as observed by one crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub origin: CrawlOrigin,
    pub name: String,
    pub price: Price,
    pub image: ImageSet,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub events: BTreeSet<EventRef>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Set once when the identity is first committed; immutable afterwards.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from its required fields, stamping both timestamps
    /// with the current time. Optional fields start empty.
    #[must_use]
    pub fn new(origin: CrawlOrigin, name: String, price: Price, image: ImageSet) -> Self {
        let now = Utc::now();
        Self {
            origin,
            name,
            price,
            image,
            category_id: None,
            events: BTreeSet::new(),
            description: None,
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A promotional campaign page (distinct from the [`EventRef`] promotions a
/// product participates in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandEvent {
    pub origin: CrawlOrigin,
    pub name: String,
    pub description: Option<String>,
    pub image: ImageSet,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// When the site says the campaign was published.
    pub written_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandEvent {
    /// Build a campaign from its required fields, stamping both timestamps
    /// with the current time.
    #[must_use]
    pub fn new(origin: CrawlOrigin, name: String, image: ImageSet) -> Self {
        let now = Utc::now();
        Self {
            origin,
            name,
            description: None,
            image,
            start_at: None,
            end_at: None,
            written_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The closed set of collections the pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Products,
    Events,
}

impl Collection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Events => "events",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistable crawl record.
///
/// Closed tagged variant: each kind carries its collection name and schema as
/// compile-time metadata, so downstream code matches on the variant instead
/// of probing capabilities at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Product(Product),
    BrandEvent(BrandEvent),
}

impl Record {
    /// Collection this record is persisted to.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Record::Product(_) => Collection::Products,
            Record::BrandEvent(_) => Collection::Events,
        }
    }

    #[must_use]
    pub fn origin(&self) -> &CrawlOrigin {
        match self {
            Record::Product(p) => &p.origin,
            Record::BrandEvent(e) => &e.origin,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Record::Product(p) => &p.name,
            Record::BrandEvent(e) => &e.name,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Record::Product(p) => p.created_at,
            Record::BrandEvent(e) => e.created_at,
        }
    }

    pub fn set_created_at(&mut self, at: DateTime<Utc>) {
        match self {
            Record::Product(p) => p.created_at = at,
            Record::BrandEvent(e) => e.created_at = at,
        }
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Record::Product(p) => p.updated_at,
            Record::BrandEvent(e) => e.updated_at,
        }
    }

    /// Mark the record as written at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        match self {
            Record::Product(p) => p.updated_at = now,
            Record::BrandEvent(e) => e.updated_at = now,
        }
    }

    /// Schema check for the whole record.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every offending field if any
    /// required field is missing/empty, a URL is malformed, the currency is
    /// unsupported, or a price/date invariant is violated.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_record(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> CrawlOrigin {
        CrawlOrigin {
            source_site: "gs25web".to_string(),
            external_id: "8801234567890".to_string(),
            source_url: "http://gs25.gsretail.com/products/1".to_string(),
        }
    }

    #[test]
    fn product_new_stamps_matching_timestamps() {
        let p = Product::new(
            origin(),
            "Test Drink".to_string(),
            Price {
                amount: Decimal::new(1500, 0),
                currency_code: 1,
                discounted_amount: None,
            },
            ImageSet::default(),
        );
        assert_eq!(p.created_at, p.updated_at);
        assert!(p.events.is_empty());
        assert!(p.category_id.is_none());
    }

    #[test]
    fn record_collection_is_static_per_kind() {
        let product = Record::Product(Product::new(
            origin(),
            "Test Drink".to_string(),
            Price {
                amount: Decimal::new(1500, 0),
                currency_code: 1,
                discounted_amount: None,
            },
            ImageSet::default(),
        ));
        let event = Record::BrandEvent(BrandEvent::new(
            origin(),
            "Spring Promo".to_string(),
            ImageSet::default(),
        ));
        assert_eq!(product.collection(), Collection::Products);
        assert_eq!(event.collection(), Collection::Events);
        assert_eq!(Collection::Products.as_str(), "products");
        assert_eq!(Collection::Events.as_str(), "events");
    }

    #[test]
    fn event_refs_collapse_duplicates_in_a_set() {
        let mut events = BTreeSet::new();
        events.insert(EventRef {
            brand_id: 1,
            event_type_id: 1,
        });
        events.insert(EventRef {
            brand_id: 1,
            event_type_id: 1,
        });
        events.insert(EventRef {
            brand_id: 1,
            event_type_id: 2,
        });
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn record_serde_round_trips_with_kind_tag() {
        let rec = Record::BrandEvent(BrandEvent::new(
            origin(),
            "Spring Promo".to_string(),
            ImageSet::default(),
        ));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "brand_event");
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
