//! HubSpot client module
//!
//! Provides [`HubSpotClient`] for the two calls the file import needs: a
//! file-manager upload and a NOTE engagement that attaches the uploaded
//! file to a CRM record.

use eyre::{Context, Result, eyre};
use reqwest::{Client, Response, multipart};
use serde_json::{Value, json};
use std::path::Path;
use url::Url;

/// Default API base URL
pub const DEFAULT_HUBSPOT_URL: &str = "https://api.hubapi.com";

// Relative to the base URL, so a path prefix in it is kept
const FILES_PATH: &str = "files/v3/files";
const ENGAGEMENTS_PATH: &str = "engagements/v1/engagements";

/// Upload and attach operations of the file import
///
/// [`HubSpotClient`] talks to the API; tests and dry runs can provide their
/// own implementation.
#[allow(async_fn_in_trait)]
pub trait FileAttacher {
    /// Upload a file, returning its file-manager id
    async fn upload_file(&self, path: &Path, folder_path: &str) -> Result<String>;

    /// Attach an uploaded file to a record through a NOTE engagement
    async fn attach_file(
        &self,
        association_key: &str,
        object_id: &str,
        file_id: &str,
        original_filename: &str,
    ) -> Result<()>;
}

/// HubSpot API client authenticated with a private app token
///
/// # Example
/// ```no_run
/// use crm_migrator::client::{FileAttacher, HubSpotClient};
/// use std::path::Path;
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("https://api.hubapi.com")?;
/// let client = HubSpotClient::try_new(url, "pat-na1-...")?;
///
/// let file_id = client
///     .upload_file(Path::new("../Attachments/00P1 -- Contract.pdf"), "/salesforce_import")
///     .await?;
/// client.attach_file("contactIds", "301", &file_id, "Contract.pdf").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HubSpotClient {
    client: Client,
    url: Url,
}

impl HubSpotClient {
    /// Create a client sending `Authorization: Bearer {api_key}`
    ///
    /// A base URL with a path (a proxy prefix) keeps it in every endpoint.
    ///
    /// # Errors
    /// Returns an error if the key is not a valid header value or the HTTP
    /// client cannot be built
    pub fn try_new(mut url: Url, api_key: &str) -> Result<Self> {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse()
                .context("HubSpot API key is not a valid header value")?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.url
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))
    }

    async fn check(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(eyre!("{} failed with {}: {}", action, status, body))
    }
}

impl FileAttacher for HubSpotClient {
    async fn upload_file(&self, path: &Path, folder_path: &str) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let options = json!({
            "access": "PRIVATE",
            "folderPath": folder_path,
            "overwrite": false,
        });
        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name.clone()))
            .text("options", options.to_string());

        log::trace!("Uploading {}", file_name);
        let response = self
            .client
            .post(self.endpoint(FILES_PATH)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request: {}", e))?;
        let body: Value = Self::check(response, "File upload")
            .await?
            .json()
            .await
            .context("Failed to parse upload response")?;

        match body.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(eyre!("Upload response for {} carries no file id", file_name)),
        }
    }

    async fn attach_file(
        &self,
        association_key: &str,
        object_id: &str,
        file_id: &str,
        original_filename: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(ENGAGEMENTS_PATH)?)
            .json(&note_engagement(
                association_key,
                object_id,
                file_id,
                original_filename,
            ))
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request: {}", e))?;
        Self::check(response, "Attaching file").await?;
        Ok(())
    }
}

/// Body of the NOTE engagement attaching `file_id` to one record
pub fn note_engagement(
    association_key: &str,
    object_id: &str,
    file_id: &str,
    original_filename: &str,
) -> Value {
    json!({
        "engagement": { "active": true, "type": "NOTE" },
        "associations": { association_key: [object_id] },
        "attachments": [{ "id": file_id }],
        "metadata": {
            "body": format!("Attached file migrated from Salesforce: {}", original_filename)
        }
    })
}

impl std::fmt::Display for HubSpotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
