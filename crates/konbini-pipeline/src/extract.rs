//! The extraction boundary.
//!
//! Site-specific scraping lives outside this system; each crawl job reaches
//! its extraction collaborator through an HTTP feed of wire records. This
//! module owns the feed client, the wire shapes, and their conversion into
//! canonical [`Record`]s (resolving human-readable codes to table ids).

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use konbini_core::{
    codes, BrandEvent, CrawlOrigin, EventRef, ImageSet, Price, Product, Record,
};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {url}: {source}")]
    Deserialize {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A wire record carried a code the tables don't know.
///
/// Treated as a per-item extraction error: the item is dropped and counted,
/// the job continues.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unknown currency {0:?}")]
    UnknownCurrency(String),
    #[error("unknown brand {0:?}")]
    UnknownBrand(String),
    #[error("unknown event type {0:?}")]
    UnknownEventType(String),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

/// HTTP client for a job's extraction feed.
///
/// One instance per job run; no retry policy here — transient-failure
/// handling (403 cookie resets and the like) is the extraction side's own
/// business, and a feed that cannot be fetched fails the job.
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Creates a `FeedClient` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches the full wire-record feed for a job.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UnexpectedStatus`] on any non-2xx response and
    /// [`FeedError::Deserialize`] if the body is not a JSON array of wire
    /// records.
    pub async fn fetch(&self, feed_url: &str) -> Result<Vec<RawRecord>, FeedError> {
        let response = self.client.get(feed_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: feed_url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
            url: feed_url.to_string(),
            source: e,
        })
    }
}

/// A record as the extraction side serves it: human codes, string prices,
/// RFC 3339 datetimes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Product(RawProduct),
    BrandEvent(RawBrandEvent),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    pub id: String,
    pub url: String,
    pub name: String,
    pub price: RawPrice,
    #[serde(default)]
    pub image: RawImage,
    pub category: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEventRef>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPrice {
    /// Decimal string, exactly as the site renders it (e.g. `"1500"`).
    pub value: Decimal,
    /// Currency code, e.g. `"KRW"`.
    pub currency: String,
    pub discounted: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub thumb: Option<String>,
    #[serde(default)]
    pub others: Vec<String>,
}

/// A promotion reference by human names, e.g. `{"brand": "GS25", "event": "1+1"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEventRef {
    pub brand: String,
    pub event: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBrandEvent {
    pub id: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub image: RawImage,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub written_at: Option<DateTime<Utc>>,
}

impl RawRecord {
    /// The site-local id, for log context before conversion.
    #[must_use]
    pub fn external_id(&self) -> &str {
        match self {
            RawRecord::Product(p) => &p.id,
            RawRecord::BrandEvent(e) => &e.id,
        }
    }

    /// Convert a wire record into a canonical [`Record`] owned by `site`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] if any embedded code (currency, brand,
    /// event type, category) is unknown to the tables.
    pub fn into_record(self, site: &str) -> Result<Record, ConvertError> {
        match self {
            RawRecord::Product(raw) => raw.into_record(site).map(Record::Product),
            RawRecord::BrandEvent(raw) => Ok(Record::BrandEvent(raw.into_record(site))),
        }
    }
}

impl RawImage {
    fn into_image_set(self) -> ImageSet {
        ImageSet {
            primary_url: self.thumb,
            additional_urls: self.others,
            dimensions: std::collections::BTreeMap::new(),
        }
    }
}

impl RawProduct {
    fn into_record(self, site: &str) -> Result<Product, ConvertError> {
        let currency_code = codes::currency_id(&self.price.currency)
            .ok_or_else(|| ConvertError::UnknownCurrency(self.price.currency.clone()))?;

        let category_id = self
            .category
            .as_deref()
            .map(|c| codes::category_id(c).ok_or_else(|| ConvertError::UnknownCategory(c.to_string())))
            .transpose()?;

        let mut events = BTreeSet::new();
        for raw in &self.events {
            let brand_id = codes::brand_id(&raw.brand)
                .ok_or_else(|| ConvertError::UnknownBrand(raw.brand.clone()))?;
            let event_type_id = codes::event_type_id(&raw.event)
                .ok_or_else(|| ConvertError::UnknownEventType(raw.event.clone()))?;
            events.insert(EventRef {
                brand_id,
                event_type_id,
            });
        }

        let mut product = Product::new(
            CrawlOrigin {
                source_site: site.to_string(),
                external_id: self.id,
                source_url: self.url,
            },
            self.name,
            Price {
                amount: self.price.value,
                currency_code,
                discounted_amount: self.price.discounted,
            },
            self.image.into_image_set(),
        );
        product.category_id = category_id;
        product.events = events;
        product.description = self.description;
        product.tags = self.tags.into_iter().collect();
        Ok(product)
    }
}

impl RawBrandEvent {
    fn into_record(self, site: &str) -> BrandEvent {
        let mut event = BrandEvent::new(
            CrawlOrigin {
                source_site: site.to_string(),
                external_id: self.id,
                source_url: self.url,
            },
            self.name,
            self.image.into_image_set(),
        );
        event.description = self.description;
        event.start_at = self.start_at;
        event.end_at = self.end_at;
        event.written_at = self.written_at;
        event
    }
}
