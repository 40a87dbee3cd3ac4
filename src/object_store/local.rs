use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use ring::hmac;

use super::{ObjectStore, ObjectStoreError};

/// Local filesystem object store for development and testing.
///
/// Signed URLs point back at this service's `/blob/*key` route and carry an
/// HMAC over the key and expiry, so the bearer of a URL can read exactly one
/// object until the expiry passes. The signing key is per-instance unless a
/// secret is supplied, so links do not survive a restart by default.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: String,
    signing_key: hmac::Key,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(
        base_path: P,
        public_base_url: &str,
        secret: Option<&str>,
    ) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;

        let signing_key = match secret {
            Some(s) => hmac::Key::new(hmac::HMAC_SHA256, s.as_bytes()),
            None => {
                let rng = ring::rand::SystemRandom::new();
                hmac::Key::generate(hmac::HMAC_SHA256, &rng).map_err(|_| {
                    std::io::Error::other("failed to generate blob signing key")
                })?
            }
        };

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_key,
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let message = format!("{key}\n{expires}");
        let tag = hmac::sign(&self.signing_key, message.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag.as_ref())
    }

    /// Open an object for streaming, for the `/blob/*key` serving route.
    pub async fn open_reader(&self, key: &str) -> Result<tokio::fs::File, ObjectStoreError> {
        let path = self.object_path(key);
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        Ok(tokio::fs::File::open(path).await?)
    }

    /// Validate a capability URL's expiry and signature for `key`.
    pub fn verify_blob_token(&self, key: &str, expires: i64, sig: &str) -> bool {
        if chrono::Utc::now().timestamp() >= expires {
            return false;
        }
        let message = format!("{key}\n{expires}");
        let Ok(provided) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(sig) else {
            return false;
        };
        hmac::verify(&self.signing_key, message.as_bytes(), &provided).is_ok()
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key);
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        let src_path = self.object_path(src);
        if !src_path.exists() {
            return Err(ObjectStoreError::NotFound(src.to_string()));
        }
        let dst_path = self.object_path(dst);
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&src_path, &dst_path).await?;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        for key in keys {
            let path = self.object_path(key);
            if path.exists() {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        let path = self.object_path(key);
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        let sig = self.signature(key, expires);
        Ok(format!(
            "{}/blob/{key}?expires={expires}&sig={sig}",
            self.public_base_url
        ))
    }
}
