//! Per-item crawl pipeline: feed extraction boundary, reconciliation against
//! stored state, and the commit loop with item-granular error recovery.
//!
//! One job drives this crate end to end: fetch the site feed, then for each
//! wire record convert → validate → reconcile → upsert. A bad item is
//! dropped, logged, and counted; it never aborts the job.

mod commit;
mod extract;
mod reconcile;

pub use commit::{ItemPipeline, JobStats};
pub use extract::{
    ConvertError, FeedClient, FeedError, RawBrandEvent, RawEventRef, RawImage, RawPrice,
    RawProduct, RawRecord,
};
pub use reconcile::reconcile;
