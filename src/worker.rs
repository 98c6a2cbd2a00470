use crate::batch::BatchDriver;
use crate::config::Config;
use crate::queue::{self, Notification, NotificationQueue};
use crate::record::UPLOAD_SEPARATORS;
use crate::storage::ObjectStore;
use crate::summary;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Injectable sleep so tests can drive the loop without waiting.
pub trait Clock {
    fn sleep(&self, period: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, period: Duration) {
        std::thread::sleep(period);
    }
}

/// Cooperative stop signal for the polling loop. Cloned into whatever
/// context notices the shutdown (a ctrl-c task in the binary, the fake
/// clock in tests).
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The long-running polling entry point: receive a bounded batch of
/// notifications, process each one fully and synchronously, sleep, repeat.
/// One notification at a time; the fold stays single-threaded by
/// construction. A notification is deleted from the queue only once its
/// summary has been stored, so any failure leads to redelivery rather than
/// data loss.
pub struct PollWorker<'a, Q, S, O, C> {
    queue: &'a Q,
    source: &'a S,
    output: &'a O,
    clock: &'a C,
    config: &'a Config,
}

impl<'a, Q, S, O, C> PollWorker<'a, Q, S, O, C>
where
    Q: NotificationQueue,
    S: ObjectStore,
    O: ObjectStore,
    C: Clock,
{
    pub fn new(queue: &'a Q, source: &'a S, output: &'a O, clock: &'a C, config: &'a Config) -> Self {
        Self {
            queue,
            source,
            output,
            clock,
            config,
        }
    }

    pub fn run(&self, shutdown: &ShutdownFlag) {
        info!("Starting to poll for notifications");
        while !shutdown.is_triggered() {
            self.poll_once();
            self.clock.sleep(self.config.idle_sleep);
        }
        info!("Shutdown requested, stopping poll loop");
    }

    /// One loop iteration, callable on its own so tests drive the worker
    /// deterministically. Returns how many notifications were fully
    /// processed (batch run, summary stored, message deleted).
    pub fn poll_once(&self) -> usize {
        let notifications = match self.queue.receive(self.config.max_batch, self.config.wait) {
            Ok(notifications) => notifications,
            Err(err) => {
                // A failed receive is not "queue empty"; log it and let the
                // next iteration retry.
                warn!(error = %err, "Receive failed, retrying next iteration");
                return 0;
            }
        };
        if notifications.is_empty() {
            info!("No new notifications in the queue");
            return 0;
        }

        info!(count = notifications.len(), "Received notifications");
        notifications
            .iter()
            .filter(|n| self.process_notification(n))
            .count()
    }

    fn process_notification(&self, notification: &Notification) -> bool {
        let date = match queue::date_from_body(&notification.body) {
            Ok(date) => date,
            Err(err) => {
                warn!(body = %notification.body, error = %err, "Skipping malformed notification");
                return false;
            }
        };
        let tag = queue::date_tag(date);
        info!(date = %tag, "Processing batch");

        let report = match BatchDriver::new(self.source, UPLOAD_SEPARATORS).run(&tag) {
            Ok(report) => report,
            Err(err) => {
                error!(date = %tag, error = %err, "Batch failed, notification left for redelivery");
                return false;
            }
        };

        let key = summary::summary_key(&tag);
        if let Err(err) = self.output.put(&key, &report.summary) {
            error!(key = %key, error = %err, "Failed to store summary, notification left for redelivery");
            return false;
        }

        if let Err(err) = self.queue.delete(&notification.receipt) {
            warn!(error = %err, "Summary stored but delete failed, notification will redeliver");
            return false;
        }

        info!(key = %key, "Notification processed and deleted");
        true
    }
}
