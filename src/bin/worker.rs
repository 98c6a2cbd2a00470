use sales_summary::config::Config;
use sales_summary::queue::SqsQueue;
use sales_summary::storage::S3ObjectStore;
use sales_summary::worker::{PollWorker, ShutdownFlag, SystemClock};

/// Long-running polling entry point: block on the notification queue,
/// aggregate one batch per notification, repeat until ctrl-c.
fn main() -> Result<(), anyhow::Error> {
    sales_summary::init_tracing();
    let config = Config::from_env()?;
    let source_bucket = config.source_bucket()?.to_owned();
    let queue_url = config.queue_url()?.to_owned();

    let runtime = tokio::runtime::Runtime::new()?;
    let aws = runtime.block_on(aws_config::load_defaults(
        aws_config::BehaviorVersion::latest(),
    ));
    let s3 = aws_sdk_s3::Client::new(&aws);
    let sqs = aws_sdk_sqs::Client::new(&aws);

    let source = S3ObjectStore::new(s3.clone(), source_bucket, runtime.handle().clone());
    let output = S3ObjectStore::new(s3, &config.output_bucket, runtime.handle().clone());
    let queue = SqsQueue::new(sqs, queue_url, runtime.handle().clone());

    let shutdown = ShutdownFlag::new();
    {
        let shutdown = shutdown.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.trigger();
            }
        });
    }

    PollWorker::new(&queue, &source, &output, &SystemClock, &config).run(&shutdown);
    Ok(())
}
