use crate::batch::BatchDriver;
use crate::queue;
use crate::record::EVENT_SEPARATORS;
use crate::storage::ObjectStore;
use crate::summary;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

/// Storage-event payload: the subset of the bucket notification shape the
/// handler actually reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

/// Processes one storage event synchronously: each record triggers a full
/// batch for the date carried in the uploaded object's key, written to the
/// output store under the handler's current date. Errors propagate - an
/// invocation handles exactly one event and has no next item to fall back
/// to. Nothing survives between invocations.
pub fn process_event<S, O>(
    event: &StorageEvent,
    source_for: impl Fn(&str) -> S,
    output: &O,
    today: NaiveDate,
) -> Result<String, anyhow::Error>
where
    S: ObjectStore,
    O: ObjectStore,
{
    for record in &event.records {
        let key = &record.s3.object.key;
        let date = queue::date_from_key(key)?;
        let tag = queue::date_tag(date);
        info!(bucket = %record.s3.bucket.name, key = %key, date = %tag, "Handling storage event");

        let source = source_for(&record.s3.bucket.name);
        let report = BatchDriver::new(&source, EVENT_SEPARATORS).run(&tag)?;
        output.put(&summary::summary_key(&queue::date_tag(today)), &report.summary)?;
    }
    Ok("Event processing complete.".to_owned())
}
