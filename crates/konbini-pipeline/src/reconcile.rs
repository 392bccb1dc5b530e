//! Merge a freshly extracted record with the previously stored state for the
//! same identity.
//!
//! The rules give re-crawls monotonic-accumulation semantics: a field the
//! site stopped rendering never erases data observed earlier, promotions
//! accumulate across visits, and an identity's first-seen time is permanent.
//! Fields that *are* present in the fresh crawl always win — freshness is
//! preferred whenever available.

use chrono::{DateTime, Utc};

use konbini_core::{Product, Record};

/// Produce the record to commit for `cur`, given the stored state `prev`
/// for the same identity (if any).
///
/// Pure: the caller supplies `now` so a reconcile-and-commit step carries
/// one consistent write time.
#[must_use]
pub fn reconcile(mut cur: Record, prev: Option<&Record>, now: DateTime<Utc>) -> Record {
    let Some(prev) = prev else {
        // First-seen: commit as-is.
        cur.touch(now);
        return cur;
    };

    match (&mut cur, prev) {
        (Record::Product(cur_product), Record::Product(prev_product)) => {
            merge_product(cur_product, prev_product);
        }
        (Record::BrandEvent(_), Record::BrandEvent(_)) => {
            // Non-product collections: the fresh observation replaces the
            // stored one wholesale; only created_at survives (below).
        }
        (fresh, stored) => {
            // Same identity, different kind. Not expected from any real
            // feed; keep the fresh record but preserve the identity's
            // original creation time.
            tracing::warn!(
                site = %fresh.origin().source_site,
                id = %fresh.origin().external_id,
                stored_kind = stored.collection().as_str(),
                fresh_kind = fresh.collection().as_str(),
                "record kind changed across crawls"
            );
        }
    }

    // The identity's creation time is immutable after the first commit.
    cur.set_created_at(prev.created_at());
    cur.touch(now);
    cur
}

/// Field-level fallback plus event-set union.
///
/// A null/empty field on the fresh side never overwrites a known value;
/// promotions are unioned because a visit that doesn't surface one (e.g. the
/// promotion page wasn't re-crawled that run) says nothing about its end.
fn merge_product(cur: &mut Product, prev: &Product) {
    if cur.description.is_none() {
        cur.description = prev.description.clone();
    }
    if cur.category_id.is_none() {
        cur.category_id = prev.category_id;
    }
    if cur.price.discounted_amount.is_none() {
        cur.price.discounted_amount = prev.price.discounted_amount;
    }
    if cur.image.primary_url.is_none() {
        cur.image.primary_url = prev.image.primary_url.clone();
    }
    if cur.image.additional_urls.is_empty() {
        cur.image.additional_urls = prev.image.additional_urls.clone();
    }
    if cur.image.dimensions.is_empty() {
        cur.image.dimensions = prev.image.dimensions.clone();
    }
    if cur.tags.is_empty() {
        cur.tags = prev.tags.clone();
    }

    cur.events.extend(prev.events.iter().copied());
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use konbini_core::{
        BrandEvent, CrawlOrigin, Dimensions, EventRef, ImageSet, Price, Product, Record,
    };

    use super::*;

    fn origin() -> CrawlOrigin {
        CrawlOrigin {
            source_site: "gs25web".to_string(),
            external_id: "8801".to_string(),
            source_url: "https://gs25.gsretail.com/products/8801".to_string(),
        }
    }

    fn base_product() -> Product {
        let mut p = Product::new(
            origin(),
            "Banana Milk".to_string(),
            Price {
                amount: Decimal::new(1800, 0),
                currency_code: 1,
                discounted_amount: None,
            },
            ImageSet::default(),
        );
        p.created_at = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        p.updated_at = p.created_at;
        p
    }

    fn event_ref(event_type_id: i32) -> EventRef {
        EventRef {
            brand_id: 1,
            event_type_id,
        }
    }

    #[test]
    fn first_seen_commits_as_is() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let cur = Record::Product(base_product());
        let merged = reconcile(cur.clone(), None, now);
        assert_eq!(merged.created_at(), cur.created_at());
        assert_eq!(merged.updated_at(), now);
    }

    #[test]
    fn null_fields_never_overwrite_known_data() {
        let now = Utc::now();
        let mut prev = base_product();
        prev.description = Some("A beloved classic".to_string());
        prev.category_id = Some(1);
        prev.price.discounted_amount = Some(Decimal::new(1500, 0));
        prev.image.primary_url = Some("s3://konbini-image/products/a.webp".to_string());
        prev.image.dimensions.insert(
            "primary".to_string(),
            Dimensions {
                width: 360,
                height: 360,
            },
        );
        prev.tags.insert("pb".to_string());
        let prev = Record::Product(prev);

        let cur = Record::Product(base_product());
        let Record::Product(merged) = reconcile(cur, Some(&prev), now) else {
            panic!("expected product");
        };
        assert_eq!(merged.description.as_deref(), Some("A beloved classic"));
        assert_eq!(merged.category_id, Some(1));
        assert_eq!(merged.price.discounted_amount, Some(Decimal::new(1500, 0)));
        assert_eq!(
            merged.image.primary_url.as_deref(),
            Some("s3://konbini-image/products/a.webp")
        );
        assert_eq!(merged.image.dimensions.len(), 1);
        assert!(merged.tags.contains("pb"));
    }

    #[test]
    fn present_fields_always_win() {
        let now = Utc::now();
        let mut prev = base_product();
        prev.description = Some("Old copy".to_string());
        prev.price.discounted_amount = Some(Decimal::new(1500, 0));
        let prev = Record::Product(prev);

        let mut cur = base_product();
        cur.description = Some("New copy".to_string());
        cur.price.discounted_amount = Some(Decimal::new(1200, 0));
        let Record::Product(merged) = reconcile(Record::Product(cur), Some(&prev), now) else {
            panic!("expected product");
        };
        assert_eq!(merged.description.as_deref(), Some("New copy"));
        assert_eq!(merged.price.discounted_amount, Some(Decimal::new(1200, 0)));
    }

    #[test]
    fn event_union_is_a_superset_of_both_sides() {
        let now = Utc::now();
        let mut prev = base_product();
        prev.events = BTreeSet::from([event_ref(1), event_ref(3)]);
        let prev = Record::Product(prev);

        let mut cur = base_product();
        cur.events = BTreeSet::from([event_ref(1), event_ref(2)]);
        let Record::Product(merged) = reconcile(Record::Product(cur), Some(&prev), now) else {
            panic!("expected product");
        };

        let expected = BTreeSet::from([event_ref(1), event_ref(2), event_ref(3)]);
        assert_eq!(merged.events, expected);
    }

    #[test]
    fn created_at_never_changes_after_first_commit() {
        let first_commit = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut stored = reconcile(Record::Product(base_product()), None, first_commit);
        assert_eq!(stored.created_at(), first_commit);

        for day in 2..5 {
            let now = Utc.with_ymd_and_hms(2026, 8, day, 0, 0, 0).unwrap();
            let fresh = Record::Product(base_product());
            let merged = reconcile(fresh, Some(&stored), now);
            assert_eq!(merged.created_at(), stored.created_at());
            assert_eq!(merged.updated_at(), now);
            stored = merged;
        }
    }

    #[test]
    fn reconcile_is_idempotent_against_its_own_output() {
        let now1 = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let now2 = Utc.with_ymd_and_hms(2026, 8, 1, 0, 5, 0).unwrap();

        let mut extracted = base_product();
        extracted.events = BTreeSet::from([event_ref(1)]);
        extracted.description = Some("desc".to_string());

        let pass1 = reconcile(Record::Product(extracted.clone()), None, now1);
        let pass2 = reconcile(Record::Product(extracted), Some(&pass1), now2);

        assert_eq!(pass1.created_at(), pass2.created_at());
        let (Record::Product(a), Record::Product(b)) = (&pass1, &pass2) else {
            panic!("expected products");
        };
        assert_eq!(a.events, b.events);
        assert_eq!(a.description, b.description);
    }

    #[test]
    fn brand_events_replace_except_created_at() {
        let now = Utc::now();
        let mut prev = BrandEvent::new(origin(), "Old Title".to_string(), ImageSet::default());
        prev.description = Some("old".to_string());
        prev.created_at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let prev = Record::BrandEvent(prev);

        let mut cur = BrandEvent::new(origin(), "New Title".to_string(), ImageSet::default());
        cur.description = None;
        let Record::BrandEvent(merged) = reconcile(Record::BrandEvent(cur), Some(&prev), now)
        else {
            panic!("expected brand event");
        };

        // No field fallback for non-product collections.
        assert_eq!(merged.name, "New Title");
        assert!(merged.description.is_none());
        assert_eq!(
            merged.created_at,
            Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(merged.updated_at, now);
    }

    #[test]
    fn kind_change_keeps_fresh_record_and_original_created_at() {
        let now = Utc::now();
        let mut prev = BrandEvent::new(origin(), "Was An Event".to_string(), ImageSet::default());
        prev.created_at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let prev = Record::BrandEvent(prev);

        let merged = reconcile(Record::Product(base_product()), Some(&prev), now);
        assert!(matches!(merged, Record::Product(_)));
        assert_eq!(
            merged.created_at(),
            Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
        );
    }
}
