use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{ObjectStore, ObjectStoreError, StoredObject};

const API_BASE: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are renewed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Google Cloud Storage object store backend.
pub struct GcsStore {
    bucket: String,
    client: Client,
    access_token: tokio::sync::RwLock<AccessToken>,
    credentials_file: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn from_response(resp: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: resp.access_token,
            expires_at: now + Duration::seconds(resp.expires_in),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Subset of the JSON API object resource returned by an upload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    media_link: String,
}

impl GcsStore {
    pub async fn new(
        bucket: &str,
        credentials_file: Option<&str>,
    ) -> Result<Self, ObjectStoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ObjectStoreError::Config(e.to_string()))?;

        let credentials_file = credentials_file.map(|s| s.to_string());
        let token = fetch_token(&client, credentials_file.as_deref())
            .await
            .map_err(|e| ObjectStoreError::Config(format!("GCS credentials: {e}")))?;

        Ok(Self {
            bucket: bucket.to_string(),
            client,
            access_token: tokio::sync::RwLock::new(token),
            credentials_file,
        })
    }

    /// Current bearer token, renewed first when it is close to expiry.
    async fn bearer_token(&self) -> Result<String, ObjectStoreError> {
        {
            let token = self.access_token.read().await;
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut token = self.access_token.write().await;
        // Another request may have renewed it while we waited for the lock
        if !token.is_fresh(Utc::now()) {
            *token = fetch_token(&self.client, self.credentials_file.as_deref())
                .await
                .map_err(|e| ObjectStoreError::Backend(format!("GCS token refresh failed: {e}")))?;
            tracing::debug!(expires_at = %token.expires_at, "Refreshed GCS access token");
        }
        Ok(token.value.clone())
    }
}

async fn fetch_token(
    client: &Client,
    credentials_file: Option<&str>,
) -> Result<AccessToken, anyhow::Error> {
    let now = Utc::now();
    let resp = match credentials_file {
        Some(path) => token_from_service_account(client, path).await?,
        None => token_from_metadata_server(client).await?,
    };
    Ok(AccessToken::from_response(resp, now))
}

async fn token_from_service_account(
    client: &Client,
    path: &str,
) -> Result<TokenResponse, anyhow::Error> {
    let key_json = tokio::fs::read_to_string(path).await?;
    let key: ServiceAccountKey = serde_json::from_str(&key_json)?;

    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "iss": key.client_email,
        "scope": "https://www.googleapis.com/auth/devstorage.read_write",
        "aud": key.token_uri,
        "iat": now,
        "exp": now + 3600,
    });

    // header.claims.signature
    let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
        "alg": "RS256",
        "typ": "JWT"
    }))?);
    let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
    let unsigned = format!("{header}.{payload}");

    let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
    let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

    let resp = client
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &jwt),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(resp)
}

async fn token_from_metadata_server(client: &Client) -> Result<TokenResponse, anyhow::Error> {
    let resp = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(resp)
}

/// Upload URL for a new object. `ifGenerationMatch=0` makes GCS refuse to
/// replace an object that already exists under `name`.
fn upload_url(bucket: &str, name: &str) -> Result<Url, ObjectStoreError> {
    let mut url = Url::parse(&format!("{API_BASE}/upload/storage/v1/b/{bucket}/o"))
        .map_err(|e| ObjectStoreError::Config(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("uploadType", "media")
        .append_pair("ifGenerationMatch", "0")
        .append_pair("name", name);
    Ok(url)
}

fn download_url(bucket: &str, name: &str) -> Result<Url, ObjectStoreError> {
    let mut url = Url::parse(&format!("{API_BASE}/storage/v1/b/{bucket}/o"))
        .map_err(|e| ObjectStoreError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ObjectStoreError::Config("GCS API URL cannot be a base".to_string()))?
        .push(name);
    url.query_pairs_mut().append_pair("alt", "media");
    Ok(url)
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn create(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let token = self.bearer_token().await?;

        let resp = self
            .client
            .post(upload_url(&self.bucket, name)?)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
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

        let object: ObjectResource = resp
            .json()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("Invalid GCS upload response: {e}")))?;

        Ok(StoredObject {
            name: object.name,
            media_link: object.media_link,
        })
    }

    async fn get(&self, name: &str) -> Result<Bytes, ObjectStoreError> {
        let token = self.bearer_token().await?;

        let resp = self
            .client
            .get(download_url(&self.bucket, name)?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(name.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // PEM -> DER
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

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
