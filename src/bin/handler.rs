use anyhow::Context;
use chrono::Local;
use sales_summary::config::Config;
use sales_summary::event::{self, StorageEvent};
use sales_summary::storage::S3ObjectStore;
use std::io::Read;

/// One-shot storage-event entry point: reads the event payload from the
/// file named on the command line (or stdin), runs the aggregation once,
/// and prints the completion message.
fn main() -> Result<(), anyhow::Error> {
    sales_summary::init_tracing();
    let config = Config::from_env()?;

    let payload = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Reading event payload from {path}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let event: StorageEvent =
        serde_json::from_str(&payload).context("Malformed storage event payload")?;

    let runtime = tokio::runtime::Runtime::new()?;
    let aws = runtime.block_on(aws_config::load_defaults(
        aws_config::BehaviorVersion::latest(),
    ));
    let s3 = aws_sdk_s3::Client::new(&aws);
    let handle = runtime.handle().clone();

    let output = S3ObjectStore::new(s3.clone(), &config.output_bucket, handle.clone());
    let completion = event::process_event(
        &event,
        |bucket| S3ObjectStore::new(s3.clone(), bucket, handle.clone()),
        &output,
        Local::now().date_naive(),
    )?;
    println!("{completion}");
    Ok(())
}
