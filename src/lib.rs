//! Aggregates delimited sales-record files from object storage into a
//! per-store / per-product summary report.
//!
//! The aggregation core (`record` -> `aggregate` -> `batch` -> `summary`)
//! is synchronous and pure; storage and queue access sit behind the
//! `ObjectStore` and `NotificationQueue` traits so the same core serves
//! both entry points: the long-running polling worker (`bin/worker`) and
//! the one-shot storage-event handler (`bin/handler`). A small uploader
//! (`bin/upload`) feeds the pipeline from the client side.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod event;
pub mod queue;
pub mod record;
pub mod storage;
pub mod summary;
pub mod worker;

pub use aggregate::AggregateState;
pub use batch::{BatchDriver, BatchReport, BatchStats};
pub use config::{Config, ConfigError};
pub use queue::{Notification, NotificationQueue, SqsQueue};
pub use record::{parse_record, SalesRecord, EVENT_SEPARATORS, UPLOAD_SEPARATORS};
pub use storage::{FileRef, FsObjectStore, ObjectStore, S3ObjectStore};
pub use worker::{Clock, PollWorker, ShutdownFlag, SystemClock};

/// One-time tracing setup for the binaries. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
