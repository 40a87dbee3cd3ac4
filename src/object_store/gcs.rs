use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use super::{ObjectStore, ObjectStoreError};

/// Google Cloud Storage object store backend.
pub struct GcsStore {
    bucket: String,
    client: Client,
    access_token: tokio::sync::RwLock<String>,
    credentials_file: Option<String>,
    /// Parsed service account key, kept for V4 URL signing. Absent when
    /// running on metadata-server credentials, which cannot sign URLs.
    signing_key: Option<ServiceAccountKey>,
}

#[derive(Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct RewriteResponse {
    done: bool,
    #[serde(rename = "rewriteToken")]
    rewrite_token: Option<String>,
}

impl GcsStore {
    pub async fn new(bucket: &str, credentials_file: Option<&str>) -> Result<Self, anyhow::Error> {
        // Bounded per-call timeout: a hung adapter call after a storage
        // mutation must resolve into the same path as a failed one.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let signing_key = match credentials_file {
            Some(path) => {
                let key_json = tokio::fs::read_to_string(path).await?;
                Some(serde_json::from_str::<ServiceAccountKey>(&key_json)?)
            }
            None => None,
        };

        let store = Self {
            bucket: bucket.to_string(),
            client,
            access_token: tokio::sync::RwLock::new(String::new()),
            credentials_file: credentials_file.map(|s| s.to_string()),
            signing_key,
        };

        store.refresh_token().await?;
        Ok(store)
    }

    async fn refresh_token(&self) -> Result<(), anyhow::Error> {
        let token = if self.credentials_file.is_some() {
            self.token_from_service_account().await?
        } else {
            self.token_from_metadata_server().await?
        };

        let mut lock = self.access_token.write().await;
        *lock = token;
        Ok(())
    }

    async fn token_from_service_account(&self) -> Result<String, anyhow::Error> {
        let key = self
            .signing_key
            .as_ref()
            .expect("credentials file implies a parsed key");

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/devstorage.read_write",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        // Build JWT (header.claims.signature)
        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");

        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp: TokenResponse = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    async fn token_from_metadata_server(&self) -> Result<String, anyhow::Error> {
        let resp: TokenResponse = self
            .client
            .get("http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token")
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            encode_object(key)
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}?alt=media",
            self.bucket,
            encode_object(key)
        )
    }

    fn metadata_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket,
            encode_object(key)
        )
    }

    fn rewrite_url(&self, src: &str, dst: &str, rewrite_token: Option<&str>) -> String {
        let mut url = format!(
            "https://storage.googleapis.com/storage/v1/b/{b}/o/{}/rewriteTo/b/{b}/o/{}",
            encode_object(src),
            encode_object(dst),
            b = self.bucket,
        );
        if let Some(token) = rewrite_token {
            url.push_str("?rewriteToken=");
            url.push_str(token);
        }
        url
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let token = self.access_token.read().await.clone();

        let resp = self
            .client
            .get(self.metadata_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let token = self.access_token.read().await.clone();

        let resp = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&token)
            .header("Content-Type", content_type.to_string())
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let token = self.access_token.read().await.clone();

        let resp = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download failed ({status}): {body}"
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(data)
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        let token = self.access_token.read().await.clone();

        // rewriteTo may require multiple calls for large objects; loop until
        // the service reports completion.
        let mut rewrite_token: Option<String> = None;
        loop {
            let resp = self
                .client
                .post(self.rewrite_url(src, dst, rewrite_token.as_deref()))
                .bearer_auth(&token)
                .header("Content-Length", "0")
                .send()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(ObjectStoreError::NotFound(src.to_string()));
            }

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ObjectStoreError::Backend(format!(
                    "GCS copy failed ({status}): {body}"
                )));
            }

            let rewrite: RewriteResponse = resp
                .json()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

            if rewrite.done {
                return Ok(());
            }
            rewrite_token = rewrite.rewrite_token;
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        let token = self.access_token.read().await.clone();

        for key in keys {
            let resp = self
                .client
                .delete(self.metadata_url(key))
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

            // 404 is fine -- object already gone
            if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ObjectStoreError::Backend(format!(
                    "GCS delete failed ({status}): {body}"
                )));
            }
        }

        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError> {
        let signing_key = self.signing_key.as_ref().ok_or_else(|| {
            ObjectStoreError::Backend(
                "signed URLs require a service account key (GCS_CREDENTIALS_FILE)".to_string(),
            )
        })?;

        if !self.exists(key).await? {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        // V4 query-string signing, scoped to a single GET of this object.
        let now = chrono::Utc::now();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = now.format("%Y%m%d").to_string();
        let scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{}/{scope}", signing_key.client_email);

        let canonical_uri = format!(
            "/{}/{}",
            self.bucket,
            key.split('/')
                .map(percent_encode)
                .collect::<Vec<_>>()
                .join("/")
        );

        let canonical_query = format!(
            "X-Goog-Algorithm=GOOG4-RSA-SHA256\
             &X-Goog-Credential={}\
             &X-Goog-Date={timestamp}\
             &X-Goog-Expires={}\
             &X-Goog-SignedHeaders=host",
            percent_encode(&credential),
            ttl.as_secs(),
        );

        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\nhost:storage.googleapis.com\n\nhost\nUNSIGNED-PAYLOAD"
        );

        let request_hash = hex_encode(
            ring::digest::digest(&ring::digest::SHA256, canonical_request.as_bytes()).as_ref(),
        );

        let string_to_sign =
            format!("GOOG4-RSA-SHA256\n{timestamp}\n{scope}\n{request_hash}");

        let signature = sign_rs256(string_to_sign.as_bytes(), &signing_key.private_key)
            .map_err(|e| ObjectStoreError::Backend(format!("URL signing failed: {e}")))?;

        Ok(format!(
            "https://storage.googleapis.com{canonical_uri}?{canonical_query}&X-Goog-Signature={}",
            hex_encode(&signature)
        ))
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Percent-encode everything outside the unreserved set.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Percent-encode an object key for use in a JSON API URL path segment
/// (slashes included -- object names are single path segments there).
fn encode_object(key: &str) -> String {
    percent_encode(key)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // Strip PEM headers and decode base64
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    // Use ring for RSA signing
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}
