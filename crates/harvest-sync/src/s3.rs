//! S3 buckets through the `object_store` crate.
//!
//! Region and credentials come from these environment variables:
//!
//! | Variable                | Used for                 |
//! |-------------------------|--------------------------|
//! | `AWS_DEFAULT_REGION`    | region                   |
//! | `AWS_ACCESS_ID`         | access key id            |
//! | `AWS_SECRET_ACCESS_KEY` | secret access key        |
//!
//! `AWS_ACCESS_KEY_ID` is accepted when `AWS_ACCESS_ID` is unset. Anything
//! left unset falls through to the default AWS provider chain.

use std::fmt;
use std::io::Write as _;
use std::path::Path;

use futures::TryStreamExt as _;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore as _, PutPayload};
use tracing::debug;

use crate::error::SyncError;
use crate::store::{ObjectStore, io_error, replace_file};

/// Connection settings for an S3 bucket.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// AWS region, e.g. `eu-west-2`.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
    /// Access key id.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Settings for `bucket` with region and credentials from the process
    /// environment.
    pub fn from_env(bucket: impl Into<String>) -> Self {
        Self::from_lookup(bucket, |name| std::env::var(name).ok())
    }

    /// Settings for `bucket` with region and credentials from a variable
    /// lookup.
    pub fn from_lookup<F>(bucket: impl Into<String>, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bucket: bucket.into(),
            region: var("AWS_DEFAULT_REGION"),
            endpoint: None,
            access_key_id: var("AWS_ACCESS_ID").or_else(|| var("AWS_ACCESS_KEY_ID")),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
        }
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// An S3 bucket.
#[derive(Debug)]
pub struct S3Bucket {
    client: AmazonS3,
    name: String,
}

impl S3Bucket {
    /// Build a client for the bucket in `config`. No request is made.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] if the settings are rejected.
    pub fn connect(config: &S3Config) -> Result<Self, SyncError> {
        let name = format!("s3://{}", config.bucket);
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(key) = &config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        let client = builder.build().map_err(|source| remote(&name, source))?;
        Ok(Self { client, name })
    }

    fn remote(&self, source: object_store::Error) -> SyncError {
        remote(&self.name, source)
    }
}

impl ObjectStore for S3Bucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_keys(&self) -> Result<Vec<String>, SyncError> {
        let mut keys: Vec<String> = self
            .client
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|source| self.remote(source))?;
        keys.sort();
        Ok(keys)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), SyncError> {
        let location = object_path(key)?;
        let body = match self.client.get(&location).await {
            Ok(object) => object.bytes().await.map_err(|source| self.remote(source))?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SyncError::NotFound(key.to_owned()));
            }
            Err(source) => return Err(self.remote(source)),
        };
        replace_file(dest, |file| file.write_all(&body))?;
        debug!(bucket = %self.name, key, dest = %dest.display(), bytes = body.len(), "downloaded object");
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), SyncError> {
        let location = object_path(key)?;
        let body = std::fs::read(src).map_err(|source| io_error(src, source))?;
        let bytes = body.len();
        self.client
            .put(&location, PutPayload::from(body))
            .await
            .map_err(|source| self.remote(source))?;
        debug!(bucket = %self.name, key, src = %src.display(), bytes, "uploaded object");
        Ok(())
    }
}

/// Object location for `key`; empty keys and empty path segments are
/// rejected.
fn object_path(key: &str) -> Result<ObjectPath, SyncError> {
    ObjectPath::parse(key)
        .ok()
        .filter(|_| !key.is_empty())
        .ok_or_else(|| SyncError::InvalidKey(key.to_owned()))
}

fn remote(bucket: &str, source: object_store::Error) -> SyncError {
    SyncError::Remote {
        bucket: bucket.to_owned(),
        source: Box::new(source),
    }
}
