use anyhow::bail;
use sales_summary::config::Config;
use sales_summary::queue::{self, SqsQueue};
use sales_summary::storage::{ObjectStore, S3ObjectStore};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

const DEFAULT_DIR: &str = "~/sales-data/";

/// Client-side uploader: prompts for a sales file, pushes it to the source
/// bucket, and wakes the worker when the file name carries a process date.
fn main() -> Result<(), anyhow::Error> {
    sales_summary::init_tracing();
    let config = Config::from_env()?;
    let bucket = config.source_bucket()?.to_owned();

    let file_name = prompt("Enter the filename to upload: ")?;
    if !file_name.to_lowercase().ends_with(".csv") {
        bail!("Only CSV files are allowed");
    }

    let input_path = prompt("Enter the file path (leave blank for default): ")?;
    let path = if input_path.is_empty() {
        resolve_home(&format!("{DEFAULT_DIR}{file_name}"))
    } else {
        resolve_home(&input_path)
    };
    if !path.exists() {
        bail!("File does not exist at path: {}", path.display());
    }
    let bytes = std::fs::read(&path)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let aws = runtime.block_on(aws_config::load_defaults(
        aws_config::BehaviorVersion::latest(),
    ));
    let s3 = aws_sdk_s3::Client::new(&aws);
    let store = S3ObjectStore::new(s3, &bucket, runtime.handle().clone());
    store.put(&file_name, &bytes)?;
    info!(bucket = %bucket, key = %file_name, "File uploaded");

    // Wake the worker when the key starts with a process date and a queue
    // is configured. The body shape matches what the worker parses: the
    // date sits between ": " and the trailing dash.
    if let (Ok(date), Ok(queue_url)) = (queue::date_from_key(&file_name), config.queue_url()) {
        let sqs = aws_sdk_sqs::Client::new(&aws);
        let notifier = SqsQueue::new(sqs, queue_url, runtime.handle().clone());
        let tag = queue::date_tag(date);
        notifier.send(&format!("New sales files for: {tag} - uploaded"))?;
        info!(date = %tag, "Notification sent");
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String, anyhow::Error> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn resolve_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
