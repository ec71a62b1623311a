//! S3 document store for application documents.
//!
//! Each application is one JSON object at `{prefix}/{applicationId}.json`, so
//! at most one document can exist per application uuid. Supports both AWS S3
//! and MinIO for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};
use uuid::Uuid;

use super::DocumentStore;
use crate::config::S3Config;
use crate::error::{AppError, AppResult};
use crate::models::ApplicationDocument;

const JSON_CONTENT_TYPE: &str = "application/json";

/// S3 client wrapper storing application documents.
#[derive(Clone)]
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3DocumentStore {
    /// Create a new document store from configuration.
    pub async fn new(config: &S3Config) -> AppResult<Self> {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "portal");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let store = Self {
            client,
            bucket: config.bucket.clone(),
            prefix: config.document_prefix.trim_end_matches('/').to_string(),
        };

        store.ensure_bucket_exists().await?;

        info!(
            "S3 document store initialized: bucket={}, prefix={}",
            store.bucket, store.prefix
        );

        Ok(store)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Object key of an application's document.
    ///
    /// # Returns
    /// S3 key in format: {prefix}/{uuid}.json
    pub fn document_key(prefix: &str, uuid: Uuid) -> String {
        format!("{}/{}.json", prefix, uuid)
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn find(&self, uuid: Uuid) -> AppResult<Option<ApplicationDocument>> {
        let key = Self::document_key(&self.prefix, uuid);
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(AppError::Storage(format!(
                    "Failed to get document {}: {}",
                    key, service_error
                )));
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes();

        let document = serde_json::from_slice(&data)
            .map_err(|e| AppError::Storage(format!("Document {} is not valid JSON: {}", key, e)))?;

        Ok(Some(document))
    }

    async fn put(&self, uuid: Uuid, document: &ApplicationDocument) -> AppResult<()> {
        let key = Self::document_key(&self.prefix, uuid);
        let body = serde_json::to_vec(document)
            .map_err(|e| AppError::Storage(format!("Failed to serialize document: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(JSON_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload document to S3: {}", e)))?;

        debug!("Stored application document {}", key);
        Ok(())
    }
}
