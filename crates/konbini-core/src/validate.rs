use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use crate::codes;
use crate::record::{BrandEvent, CrawlOrigin, ImageSet, Price, Product, Record};

/// A record failed its schema check.
///
/// `fields` names every offending field, not just the first, so one log line
/// shows the full extent of the damage.
#[derive(Debug, Error)]
#[error("invalid record fields: {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

/// Schemes accepted for URL fields: the web plus the object-storage scheme
/// image uploads rewrite to.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "s3"];

fn is_well_formed_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => ALLOWED_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

pub(crate) fn validate_record(record: &Record) -> Result<(), ValidationError> {
    let mut fields = Vec::new();
    match record {
        Record::Product(p) => check_product(p, &mut fields),
        Record::BrandEvent(e) => check_brand_event(e, &mut fields),
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { fields })
    }
}

fn check_origin(origin: &CrawlOrigin, fields: &mut Vec<String>) {
    if origin.source_site.trim().is_empty() {
        fields.push("origin.source_site".to_string());
    }
    if origin.external_id.trim().is_empty() {
        fields.push("origin.external_id".to_string());
    }
    if !is_well_formed_url(&origin.source_url) {
        fields.push("origin.source_url".to_string());
    }
}

fn check_price(price: &Price, fields: &mut Vec<String>) {
    if price.amount < Decimal::ZERO {
        fields.push("price.amount".to_string());
    }
    if !codes::is_supported_currency(price.currency_code) {
        fields.push("price.currency_code".to_string());
    }
    if let Some(discounted) = price.discounted_amount {
        if discounted > price.amount {
            fields.push("price.discounted_amount".to_string());
        }
    }
}

fn check_image(image: &ImageSet, fields: &mut Vec<String>) {
    if let Some(url) = &image.primary_url {
        if !is_well_formed_url(url) {
            fields.push("image.primary_url".to_string());
        }
    }
    for (i, url) in image.additional_urls.iter().enumerate() {
        if !is_well_formed_url(url) {
            fields.push(format!("image.additional_urls[{i}]"));
        }
    }
}

fn check_product(product: &Product, fields: &mut Vec<String>) {
    check_origin(&product.origin, fields);
    if product.name.trim().is_empty() {
        fields.push("name".to_string());
    }
    check_price(&product.price, fields);
    check_image(&product.image, fields);
}

fn check_brand_event(event: &BrandEvent, fields: &mut Vec<String>) {
    check_origin(&event.origin, fields);
    if event.name.trim().is_empty() {
        fields.push("name".to_string());
    }
    check_image(&event.image, fields);
    if let (Some(start), Some(end)) = (event.start_at, event.end_at) {
        if start > end {
            fields.push("start_at".to_string());
        }
    }
}
