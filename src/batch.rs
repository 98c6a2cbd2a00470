use crate::aggregate::AggregateState;
use crate::record::{self, RecordError};
use crate::storage::{FileRef, ObjectStore, StorageError};
use crate::summary;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

/// Counters for one batch run. Logged at the end of the run; the summary
/// artifact itself never encodes whether files were skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_accepted: usize,
    pub records_rejected: usize,
}

/// The rendered summary plus the run counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub summary: Vec<u8>,
    pub stats: BatchStats,
}

/// Drives one aggregation batch: select candidate files by date tag, stream
/// each one through the parser into a single shared `AggregateState`, then
/// render the summary. Per-file and per-line failures are logged and
/// skipped; only a failed listing aborts the run, since without a listing
/// there is no batch.
pub struct BatchDriver<'a, S: ObjectStore> {
    store: &'a S,
    separators: &'a [char],
}

impl<'a, S: ObjectStore> BatchDriver<'a, S> {
    pub fn new(store: &'a S, separators: &'a [char]) -> Self {
        Self { store, separators }
    }

    pub fn run(&self, date_tag: &str) -> Result<BatchReport, anyhow::Error> {
        let (state, stats) = self.aggregate(date_tag)?;
        let summary = summary::render(&state)?;
        Ok(BatchReport { summary, stats })
    }

    /// The fold half of `run`, exposed separately so tests can look at the
    /// raw totals.
    pub fn aggregate(&self, date_tag: &str) -> Result<(AggregateState, BatchStats), StorageError> {
        let candidates = self.store.list()?;

        let mut state = AggregateState::new();
        let mut stats = BatchStats::default();
        for file in candidates.iter().filter(|f| f.key.contains(date_tag)) {
            info!(key = %file.key, "Processing file");
            match self.process_file(file, &mut state, &mut stats) {
                Ok(()) => stats.files_processed += 1,
                Err(err) => {
                    warn!(key = %file.key, error = %err, "Skipping file");
                    stats.files_failed += 1;
                }
            }
        }

        info!(
            files = stats.files_processed,
            failed = stats.files_failed,
            accepted = stats.records_accepted,
            rejected = stats.records_rejected,
            "Batch complete"
        );
        Ok((state, stats))
    }

    fn process_file(
        &self,
        file: &FileRef,
        state: &mut AggregateState,
        stats: &mut BatchStats,
    ) -> Result<(), StorageError> {
        let reader = BufReader::new(self.store.open_read(file)?);
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if number == 0 {
                // Every file starts with a header row.
                continue;
            }
            match record::parse_record(&line, self.separators) {
                Ok(record) => {
                    state.fold(&record);
                    stats.records_accepted += 1;
                }
                Err(err @ RecordError::FieldCount(_)) => {
                    warn!(line = %line, error = %err, "Unexpected format, skipping line");
                    stats.records_rejected += 1;
                }
                Err(err) => {
                    warn!(line = %line, error = %err, "Rejecting record");
                    stats.records_rejected += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EVENT_SEPARATORS;
    use std::io::{self, Read};

    /// In-memory store where each object either streams its contents or
    /// fails on open, for exercising failure isolation.
    #[derive(Default)]
    struct MemoryStore {
        objects: Vec<(String, Result<String, ()>)>,
    }

    impl MemoryStore {
        fn with(objects: &[(&str, Result<&str, ()>)]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(key, contents)| ((*key).to_owned(), (*contents).map(str::to_owned)))
                    .collect(),
            }
        }
    }

    impl ObjectStore for MemoryStore {
        fn list(&self) -> Result<Vec<FileRef>, StorageError> {
            Ok(self
                .objects
                .iter()
                .map(|(key, _)| FileRef::new(key.clone()))
                .collect())
        }

        fn open_read(&self, file: &FileRef) -> Result<Box<dyn Read>, StorageError> {
            match self.objects.iter().find(|(key, _)| *key == file.key) {
                Some((_, Ok(contents))) => Ok(Box::new(io::Cursor::new(contents.clone()))),
                Some((_, Err(()))) => Err(StorageError::Backend("connection reset".to_owned())),
                None => Err(StorageError::NotFound(file.key.clone())),
            }
        }

        fn put(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Ok(())
        }
    }

    const HEADER: &str = "Date;Store;Product;Quantity;UnitPrice;UnitCost;ProfitRate;Misc";

    #[test]
    fn selects_only_files_containing_the_tag() {
        let store = MemoryStore::with(&[
            (
                "01-01-2024-nice.csv",
                Ok(&format!("{HEADER}\n01-01-2024;Nice;Widget;5;10.0;1.0;2.0;0")),
            ),
            (
                "02-01-2024-nice.csv",
                Ok(&format!("{HEADER}\n02-01-2024;Nice;Widget;50;10.0;1.0;2.0;0")),
            ),
        ]);
        let (state, stats) = BatchDriver::new(&store, EVENT_SEPARATORS)
            .aggregate("01-01-2024")
            .unwrap();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(state.quantity_by_product["Widget"], 5);
    }

    #[test]
    fn failing_file_is_skipped_and_batch_completes() {
        let store = MemoryStore::with(&[
            (
                "01-01-2024-a.csv",
                Ok(&format!("{HEADER}\n01-01-2024;Nice;Widget;5;10.0;1.0;2.0;0")),
            ),
            ("01-01-2024-b.csv", Err(())),
            (
                "01-01-2024-c.csv",
                Ok(&format!("{HEADER}\n01-01-2024;Lyon;Widget;2;10.0;1.0;2.0;0")),
            ),
        ]);
        let (state, stats) = BatchDriver::new(&store, EVENT_SEPARATORS)
            .aggregate("01-01-2024")
            .unwrap();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(state.quantity_by_product["Widget"], 7);
        assert_eq!(state.profit_by_store["Nice"], 10.0);
        assert_eq!(state.profit_by_store["Lyon"], 4.0);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let contents = format!(
            "{HEADER}\n\
             01-01-2024;Nice;Widget;5;10.0;1.0;2.0;0\n\
             this line is garbage\n\
             01-01-2024;Nice;Widget;five;10.0;1.0;2.0;0\n\
             01-01-2024;Lyon;Widget;1;10.0;1.0;2.0;0"
        );
        let store = MemoryStore::with(&[("01-01-2024-a.csv", Ok(&contents))]);
        let (state, stats) = BatchDriver::new(&store, EVENT_SEPARATORS)
            .aggregate("01-01-2024")
            .unwrap();
        assert_eq!(stats.records_accepted, 2);
        assert_eq!(stats.records_rejected, 2);
        assert_eq!(state.quantity_by_product["Widget"], 6);
    }

    #[test]
    fn empty_batch_renders_headers_only() {
        let store = MemoryStore::with(&[]);
        let report = BatchDriver::new(&store, EVENT_SEPARATORS)
            .run("01-01-2024")
            .unwrap();
        assert_eq!(report.stats, BatchStats::default());
        assert_eq!(
            String::from_utf8(report.summary).unwrap(),
            "By Store\n\
             Store Name;Total Profit\n\
             \n\
             By Product\n\
             Product Name;Total Profit;Total Quantity;Total Sold\n"
        );
    }

    #[test]
    fn totals_span_all_matching_files() {
        let file = |store: &str| {
            format!(
                "{HEADER}\n\
                 01-01-2024;{store};Widget;5;10.0;1.0;2.0;0\n\
                 01-01-2024;{store};Gadget;1;4.0;1.0;0.5;0"
            )
        };
        let store = MemoryStore::with(&[
            ("01-01-2024-nice.csv", Ok(&file("Nice"))),
            ("01-01-2024-lyon.csv", Ok(&file("Lyon"))),
        ]);
        let report = BatchDriver::new(&store, EVENT_SEPARATORS)
            .run("01-01-2024")
            .unwrap();
        let out = String::from_utf8(report.summary).unwrap();
        // 2 files x 5 Widgets: profit 2.0 * 10, revenue 10.0 * 10.
        assert!(out.contains("Widget;20.0;10;100.0\n"));
        assert!(out.contains("Gadget;1.0;2;8.0\n"));
        assert!(out.contains("Nice;10.5\n"));
        assert!(out.contains("Lyon;10.5\n"));
    }
}
