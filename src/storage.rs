use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;

use aws_sdk_s3::primitives::ByteStream;

/// Identifier of one candidate object in the store. The batch driver only
/// ever matches on the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub key: String,
}

impl FileRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// The storage collaborator the aggregation core consumes: list candidate
/// objects, stream one object's bytes, write the finished summary. Both the
/// batch driver and the tests talk to storage only through this trait.
pub trait ObjectStore {
    fn list(&self) -> Result<Vec<FileRef>, StorageError>;
    fn open_read(&self, file: &FileRef) -> Result<Box<dyn Read>, StorageError>;
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// A directory acting as a bucket. Used by local runs and tests; the keys
/// are plain file names, nested paths are ignored.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for FsObjectStore {
    fn list(&self) -> Result<Vec<FileRef>, StorageError> {
        let mut refs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                refs.push(FileRef::new(entry.file_name().to_string_lossy().into_owned()));
            }
        }
        refs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(refs)
    }

    fn open_read(&self, file: &FileRef) -> Result<Box<dyn Read>, StorageError> {
        match fs::File::open(self.root.join(&file.key)) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(file.key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(key), bytes)?;
        Ok(())
    }
}

/// One S3 bucket seen through the synchronous `ObjectStore` trait. The SDK
/// is async, so every call blocks on the runtime handle the binary owns;
/// the aggregation core stays single-threaded and never sees a future.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    handle: tokio::runtime::Handle,
}

impl S3ObjectStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            handle,
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn list(&self) -> Result<Vec<FileRef>, StorageError> {
        self.handle.block_on(async {
            let mut refs = Vec::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| StorageError::Backend(e.to_string()))?;
                for object in page.contents() {
                    if let Some(key) = object.key() {
                        refs.push(FileRef::new(key));
                    }
                }
            }
            Ok(refs)
        })
    }

    fn open_read(&self, file: &FileRef) -> Result<Box<dyn Read>, StorageError> {
        let bytes = self.handle.block_on(async {
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&file.key)
                .send()
                .await
                .map_err(|e| {
                    let service = e.into_service_error();
                    if service.is_no_such_key() {
                        StorageError::NotFound(file.key.clone())
                    } else {
                        StorageError::Backend(service.to_string())
                    }
                })?;
            resp.body
                .collect()
                .await
                .map(|data| data.into_bytes())
                .map_err(|e| StorageError::Backend(e.to_string()))
        })?;
        Ok(Box::new(io::Cursor::new(bytes)))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.handle.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(bytes.to_vec()))
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
    }
}
