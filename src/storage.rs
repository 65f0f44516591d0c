//! Durable storage for finished images.

use crate::config::{ResolvedStorage, StorageConfig};
use crate::error::{Result, StudioError};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Region, SharedCredentialsProvider};
use aws_sdk_s3::primitives::ByteStream;

/// Folder for the four quadrants of a generation.
pub const GENERATED_FOLDER: &str = "generated";
/// Folder for upscaled single images.
pub const UPSCALED_FOLDER: &str = "upscaled";

/// Persists image bytes and returns the public URL they can be fetched from.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, folder: &str, filename: &str) -> Result<String>;
}

/// An [`ArtifactStore`] writing to an S3 bucket.
///
/// Configuration is checked on every upload, so a server can start without
/// storage credentials and report the missing variable on first use.
#[derive(Debug, Clone)]
pub struct S3Storage {
    config: StorageConfig,
}

impl S3Storage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(StorageConfig::from_env())
    }

    /// The URL an object is served from once uploaded.
    pub fn public_url(settings: &ResolvedStorage, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            settings.bucket, settings.region, key
        )
    }

    async fn client(settings: &ResolvedStorage) -> aws_sdk_s3::Client {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "StudioStorageConfig",
        );

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if let Some(endpoint_url) = &settings.endpoint_url {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        aws_sdk_s3::Client::from_conf(s3_config_builder.build())
    }
}

#[async_trait]
impl ArtifactStore for S3Storage {
    async fn upload(&self, bytes: Vec<u8>, folder: &str, filename: &str) -> Result<String> {
        let settings = self.config.resolve()?;
        let key = format!("{}/{}", folder, filename);
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        let size = bytes.len();

        Self::client(&settings)
            .await
            .put_object()
            .bucket(settings.bucket.clone())
            .key(key.clone())
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                StudioError::Storage(format!(
                    "S3 upload of {} failed: {}",
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        tracing::info!(bucket = %settings.bucket, key = %key, bytes = size, "stored image");
        Ok(Self::public_url(&settings, &key))
    }
}
