use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub share: ShareConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Base URL local-backend capability URLs point at (this service)
    pub public_base_url: String,
    /// HMAC secret for local-backend capability URLs; a random per-process
    /// key is used when unset, so links die on restart.
    pub blob_signing_secret: Option<String>,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// TTL of signed URLs cached on public-link grants (seconds)
    pub public_link_ttl_secs: u64,
    /// TTL of fresh URLs minted for authenticated open/download (seconds)
    pub access_link_ttl_secs: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            public_link_ttl_secs: 24 * 60 * 60,
            access_link_ttl_secs: 10 * 60,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./objects".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            blob_signing_secret: None,
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./objects".to_string());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let blob_signing_secret = std::env::var("BLOB_SIGNING_SECRET").ok();
        let gcs_bucket = std::env::var("GCS_BUCKET").ok();
        let gcs_credentials_file = std::env::var("GCS_CREDENTIALS_FILE").ok();

        let public_link_ttl_secs = std::env::var("PUBLIC_LINK_TTL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24 * 60 * 60);

        let access_link_ttl_secs = std::env::var("ACCESS_LINK_TTL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 60);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                public_base_url,
                blob_signing_secret,
                gcs_bucket,
                gcs_credentials_file,
            },
            share: ShareConfig {
                public_link_ttl_secs,
                access_link_ttl_secs,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.storage.backend, StorageBackend::Gcs) && self.storage.gcs_bucket.is_none()
        {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        if self.share.public_link_ttl_secs == 0 || self.share.access_link_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "share link TTLs must be greater than zero".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::Gcs)
            && self.storage.gcs_credentials_file.is_none()
        {
            tracing::warn!(
                "No GCS_CREDENTIALS_FILE set; signed URLs are unavailable on \
                 metadata-server credentials, so sharing and lifecycle probes will fail."
            );
        }

        Ok(())
    }
}
