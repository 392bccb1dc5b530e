//! Per-item commit pipeline: convert → validate → reconcile → upsert.
//!
//! Failures are recovered at item granularity: the offending record is
//! dropped, logged at error level, and counted; the job moves on to the next
//! item. Only a broken store connection at job setup fails the whole job,
//! and that happens before this pipeline runs.

use chrono::Utc;

use konbini_db::Store;

use crate::extract::RawRecord;
use crate::reconcile::reconcile;

/// Counters a job reports in its end-of-run stats block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Items that made it through the full pipeline.
    pub collected: u64,
    /// Error-level events: dropped items and failed commits.
    pub errors: u64,
}

/// The reconcile-and-commit pipeline for one job.
pub struct ItemPipeline {
    store: Store,
}

impl ItemPipeline {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Run one wire record through the pipeline, updating `stats`.
    ///
    /// Never returns an error: every failure class is logged, counted, and
    /// swallowed so the caller's loop continues.
    pub async fn process(&self, raw: RawRecord, site: &str, stats: &mut JobStats) {
        let external_id = raw.external_id().to_string();

        let record = match raw.into_record(site) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(site, id = %external_id, error = %e, "item dropped: conversion failed");
                stats.errors += 1;
                return;
            }
        };

        if let Err(e) = record.validate() {
            tracing::error!(site, id = %external_id, error = %e, "item dropped: schema check failed");
            stats.errors += 1;
            return;
        }

        let (origin_site, origin_id) = record.origin().identity();
        let prev = match self
            .store
            .find_by_identity(record.collection(), origin_site, origin_id)
            .await
        {
            Ok(prev) => prev,
            Err(e) => {
                tracing::error!(site, id = %external_id, error = %e, "item dropped: prior-state lookup failed");
                stats.errors += 1;
                return;
            }
        };

        let merged = reconcile(record, prev.as_ref(), Utc::now());

        match self.store.upsert(&merged).await {
            Ok(_) => stats.collected += 1,
            Err(e) => {
                tracing::error!(site, id = %external_id, error = %e, "item dropped: commit failed");
                stats.errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::extract::{RawImage, RawPrice, RawProduct};

    use super::*;

    fn raw_product(id: &str, currency: &str) -> RawRecord {
        RawRecord::Product(RawProduct {
            id: id.to_string(),
            url: format!("https://cu.bgfretail.com/product/{id}"),
            name: "Triangle Kimbap".to_string(),
            price: RawPrice {
                value: Decimal::new(1200, 0),
                currency: currency.to_string(),
                discounted: None,
            },
            image: RawImage::default(),
            category: None,
            events: vec![],
            description: None,
            tags: vec![],
        })
    }

    #[tokio::test]
    async fn valid_item_counts_as_collected() {
        let pipeline = ItemPipeline::new(Store::dry_run());
        let mut stats = JobStats::default();
        pipeline.process(raw_product("1", "KRW"), "cuweb", &mut stats).await;
        assert_eq!(stats, JobStats { collected: 1, errors: 0 });
    }

    #[tokio::test]
    async fn unknown_code_is_dropped_and_counted() {
        let pipeline = ItemPipeline::new(Store::dry_run());
        let mut stats = JobStats::default();
        pipeline.process(raw_product("1", "USD"), "cuweb", &mut stats).await;
        assert_eq!(stats, JobStats { collected: 0, errors: 1 });
    }

    #[tokio::test]
    async fn invalid_record_is_dropped_and_the_loop_continues() {
        let pipeline = ItemPipeline::new(Store::dry_run());
        let mut stats = JobStats::default();

        // Malformed source URL fails the schema check.
        let bad = RawRecord::Product(RawProduct {
            id: "2".to_string(),
            url: "not-a-url".to_string(),
            name: "Broken".to_string(),
            price: RawPrice {
                value: Decimal::new(1000, 0),
                currency: "KRW".to_string(),
                discounted: None,
            },
            image: RawImage::default(),
            category: None,
            events: vec![],
            description: None,
            tags: vec![],
        });
        pipeline.process(bad, "cuweb", &mut stats).await;
        pipeline.process(raw_product("3", "KRW"), "cuweb", &mut stats).await;

        assert_eq!(stats, JobStats { collected: 1, errors: 1 });
    }
}
