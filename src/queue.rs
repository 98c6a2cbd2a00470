use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Date format used everywhere a date crosses a boundary: in notification
/// bodies, in object keys, and in the summary file name.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// One queue message: the opaque body and the token needed to delete it
/// after successful processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub body: String,
    pub receipt: String,
}

/// Queue failures are typed so callers can tell "nothing to do" (an empty
/// receive) from "the receive itself failed".
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue receive failure: {0}")]
    Receive(String),
    #[error("Queue delete failure: {0}")]
    Delete(String),
    #[error("Queue send failure: {0}")]
    Send(String),
}

/// The queue collaborator the polling worker consumes.
pub trait NotificationQueue {
    fn receive(&self, max: usize, wait: Duration) -> Result<Vec<Notification>, QueueError>;
    fn delete(&self, receipt: &str) -> Result<(), QueueError>;
}

/// A notification or object key whose date cannot be extracted. On the
/// polling path these are skipped; the event path propagates them, since a
/// handler invocation has no next item to fall back to.
#[derive(Error, Debug, PartialEq)]
pub enum NotificationError {
    #[error("No date marker in {0:?}")]
    MissingMarker(String),
    #[error("Bad process date {value:?}")]
    BadDate {
        value: String,
        #[source]
        source: chrono::format::ParseError,
    },
}

/// Extracts the processing date from a notification body. The convention is
/// that the date sits between the first `": "` and the last `'-'`, e.g.
/// `"new sales files for: 13-05-2024 - region south"`. A body whose date is
/// not followed by another dash fails here, because the last dash then lands
/// inside the date itself.
pub fn date_from_body(body: &str) -> Result<NaiveDate, NotificationError> {
    let start = body
        .find(": ")
        .ok_or_else(|| NotificationError::MissingMarker(body.to_owned()))?
        + 2;
    let end = body
        .rfind('-')
        .ok_or_else(|| NotificationError::MissingMarker(body.to_owned()))?;
    if end <= start {
        return Err(NotificationError::MissingMarker(body.to_owned()));
    }
    parse_date(body[start..end].trim())
}

/// Extracts the processing date from an object key following the upload
/// naming convention, where the key starts with `dd-MM-yyyy`.
pub fn date_from_key(key: &str) -> Result<NaiveDate, NotificationError> {
    let prefix = key
        .get(..10)
        .ok_or_else(|| NotificationError::MissingMarker(key.to_owned()))?;
    parse_date(prefix)
}

/// Formats a date back into the tag matched against object keys.
pub fn date_tag(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, NotificationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| NotificationError::BadDate {
        value: value.to_owned(),
        source,
    })
}

/// One SQS queue seen through the synchronous `NotificationQueue` trait,
/// blocking on the binary's runtime handle like the S3 adapter does.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    handle: tokio::runtime::Handle,
}

impl SqsQueue {
    pub fn new(
        client: aws_sdk_sqs::Client,
        queue_url: impl Into<String>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            handle,
        }
    }

    /// Enqueues a notification body. Only the uploader side uses this; the
    /// worker consumes the queue through the trait.
    pub fn send(&self, body: &str) -> Result<(), QueueError> {
        self.handle.block_on(async {
            self.client
                .send_message()
                .queue_url(&self.queue_url)
                .message_body(body)
                .send()
                .await
                .map_err(|e| QueueError::Send(e.to_string()))?;
            Ok(())
        })
    }
}

impl NotificationQueue for SqsQueue {
    fn receive(&self, max: usize, wait: Duration) -> Result<Vec<Notification>, QueueError> {
        self.handle.block_on(async {
            let resp = self
                .client
                .receive_message()
                .queue_url(&self.queue_url)
                .max_number_of_messages(max as i32)
                .wait_time_seconds(wait.as_secs() as i32)
                .send()
                .await
                .map_err(|e| QueueError::Receive(e.to_string()))?;

            let mut notifications = Vec::new();
            for message in resp.messages() {
                match (message.body(), message.receipt_handle()) {
                    (Some(body), Some(receipt)) => notifications.push(Notification {
                        body: body.to_owned(),
                        receipt: receipt.to_owned(),
                    }),
                    _ => warn!(id = ?message.message_id(), "Dropping message without body or receipt"),
                }
            }
            Ok(notifications)
        })
    }

    fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        self.handle.block_on(async {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt)
                .send()
                .await
                .map_err(|e| QueueError::Delete(e.to_string()))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_between_marker_and_last_dash() {
        let date = date_from_body("new sales files for: 13-05-2024 - region south").unwrap();
        assert_eq!(date_tag(date), "13-05-2024");
    }

    #[test]
    fn body_without_trailing_dash_fails() {
        // The last dash falls inside the date, truncating it.
        assert!(matches!(
            date_from_body("new sales files for: 13-05-2024"),
            Err(NotificationError::BadDate { .. })
        ));
    }

    #[test]
    fn body_without_marker_fails() {
        assert_eq!(
            date_from_body("no marker here"),
            Err(NotificationError::MissingMarker("no marker here".to_owned()))
        );
        assert!(matches!(
            date_from_body("colon but: nodash"),
            Err(NotificationError::MissingMarker(_))
        ));
    }

    #[test]
    fn nonsense_date_fails() {
        assert!(matches!(
            date_from_body("for: 99-99-2024 - x"),
            Err(NotificationError::BadDate { .. })
        ));
    }

    #[test]
    fn date_from_key_prefix() {
        let date = date_from_key("13-05-2024-store-nice.csv").unwrap();
        assert_eq!(date_tag(date), "13-05-2024");
        assert!(matches!(
            date_from_key("sales-export-latest.csv"),
            Err(NotificationError::BadDate { .. })
        ));
        assert!(matches!(
            date_from_key("x.csv"),
            Err(NotificationError::MissingMarker(_))
        ));
    }

    #[test]
    fn tag_round_trips_through_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_tag(date), "01-01-2024");
    }
}
