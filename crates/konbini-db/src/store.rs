use sqlx::PgPool;

use konbini_core::{Collection, Record};

use crate::DbError;

/// Result of an identity-keyed upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No prior row for the identity; the record was inserted.
    Created,
    /// A prior row existed and its document changed.
    Updated,
    /// A prior row existed with an identical document (ignoring
    /// `updated_at`); nothing was written.
    Unchanged,
    /// Dry-run mode: acknowledged without touching storage.
    Skipped,
}

/// Identity-keyed gateway to the crawled collections.
///
/// Constructed once per run and passed explicitly to everything that needs
/// it; the binary owns the pool's lifecycle. A dry-run store carries no pool
/// at all, so a misrouted write is structurally impossible.
#[derive(Clone)]
pub struct Store {
    pool: Option<PgPool>,
}

impl Store {
    /// A store that commits writes durably through `pool`.
    #[must_use]
    pub fn durable(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// A store that acknowledges every write without touching storage.
    ///
    /// Reads return no prior state, so every record reconciles as
    /// first-seen — the same behavior the pipeline has on a fresh database.
    #[must_use]
    pub fn dry_run() -> Self {
        Self { pool: None }
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.pool.is_none()
    }

    /// Point lookup of the stored record for `(site, id)` in `collection`.
    ///
    /// The read may be served by a replica; callers must tolerate a stale
    /// answer (reconciliation re-reads nothing and the upsert itself is the
    /// consistency point).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] on query failure, or
    /// [`DbError::CorruptDocument`] if the stored document no longer
    /// deserializes as a [`Record`].
    pub async fn find_by_identity(
        &self,
        collection: Collection,
        site: &str,
        id: &str,
    ) -> Result<Option<Record>, DbError> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };

        let query = match collection {
            Collection::Products => {
                "SELECT doc FROM products WHERE source_site = $1 AND external_id = $2"
            }
            Collection::Events => {
                "SELECT doc FROM events WHERE source_site = $1 AND external_id = $2"
            }
        };

        let doc: Option<serde_json::Value> = sqlx::query_scalar(query)
            .bind(site)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        match doc {
            None => Ok(None),
            Some(doc) => {
                let record =
                    serde_json::from_value(doc).map_err(|e| DbError::CorruptDocument {
                        collection: collection.as_str(),
                        site: site.to_string(),
                        id: id.to_string(),
                        source: e,
                    })?;
                Ok(Some(record))
            }
        }
    }

    /// Idempotent upsert keyed on `(origin.source_site, origin.external_id)`.
    ///
    /// A single `INSERT .. ON CONFLICT .. DO UPDATE` statement, so concurrent
    /// writers on different identities each land exactly one row and a
    /// re-commit of an identical document is a no-op. Success means the
    /// statement committed; anything less surfaces as an error and the
    /// caller drops the item.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the write fails.
    pub async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, DbError> {
        let Some(pool) = &self.pool else {
            tracing::debug!(
                site = %record.origin().source_site,
                id = %record.origin().external_id,
                "dry run - item not saved"
            );
            return Ok(UpsertOutcome::Skipped);
        };

        let (site, id) = record.origin().identity();
        let site = site.to_string();
        let id = id.to_string();
        let doc = serde_json::to_value(record).map_err(|e| DbError::CorruptDocument {
            collection: record.collection().as_str(),
            site: site.clone(),
            id: id.clone(),
            source: e,
        })?;

        // `updated_at` is stripped from both sides of the change check so a
        // re-crawl that observed nothing new reports Unchanged instead of
        // churning the row.
        let query = match record.collection() {
            Collection::Products => {
                "INSERT INTO products (source_site, external_id, doc, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (source_site, external_id) DO UPDATE \
                 SET doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at \
                 WHERE products.doc - 'updated_at' IS DISTINCT FROM EXCLUDED.doc - 'updated_at' \
                 RETURNING (xmax = 0) AS created"
            }
            Collection::Events => {
                "INSERT INTO events (source_site, external_id, doc, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (source_site, external_id) DO UPDATE \
                 SET doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at \
                 WHERE events.doc - 'updated_at' IS DISTINCT FROM EXCLUDED.doc - 'updated_at' \
                 RETURNING (xmax = 0) AS created"
            }
        };

        let created: Option<bool> = sqlx::query_scalar(query)
            .bind(&site)
            .bind(&id)
            .bind(&doc)
            .bind(record.created_at())
            .bind(record.updated_at())
            .fetch_optional(pool)
            .await?;

        let outcome = match created {
            Some(true) => {
                tracing::info!(site = %site, id = %id, "new item saved");
                UpsertOutcome::Created
            }
            Some(false) => {
                tracing::info!(site = %site, id = %id, "item updated");
                UpsertOutcome::Updated
            }
            None => {
                tracing::info!(site = %site, id = %id, "item already exists");
                UpsertOutcome::Unchanged
            }
        };

        Ok(outcome)
    }

    /// Administrative wipe of every pipeline collection, used only ahead of a
    /// full re-ingest.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DryRunWrite`] in dry-run mode, or the underlying
    /// statement error.
    pub async fn clear_all(&self) -> Result<(), DbError> {
        let Some(pool) = &self.pool else {
            return Err(DbError::DryRunWrite);
        };

        sqlx::query("TRUNCATE products, events").execute(pool).await?;
        tracing::info!("cleared all collections");
        Ok(())
    }

    /// Count of rows in a collection. Intended for tests and operator
    /// spot-checks, not the hot path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] on query failure; 0 in dry-run mode.
    pub async fn count(&self, collection: Collection) -> Result<i64, DbError> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };
        let query = match collection {
            Collection::Products => "SELECT COUNT(*) FROM products",
            Collection::Events => "SELECT COUNT(*) FROM events",
        };
        Ok(sqlx::query_scalar(query).fetch_one(pool).await?)
    }
}
