use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::common::errors::{Result, UpdropError};
use crate::services::{error_from_response, ServiceAdapter, UploadOutcome};
use crate::upload::UploadJob;

const FILE_ENDPOINT: &str = "https://pixeldrain.com/api/file/";

/// Pixeldrain wants Basic auth with an empty username and the API key
/// as the password. The file goes up as a raw PUT body.
pub struct Pixeldrain {
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct PixeldrainResponse {
    id: String,
}

impl Pixeldrain {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    fn upload_url(&self, file_name: &str) -> Result<Url> {
        let mut url = Url::parse(FILE_ENDPOINT).map_err(|e| UpdropError::ServiceError {
            service: "pixeldrain",
            message: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| UpdropError::ServiceError {
                service: "pixeldrain",
                message: "endpoint cannot be a base URL".to_string(),
            })?
            .push(file_name);
        Ok(url)
    }
}

/// `Basic` credential pair with an empty username, base64-encoded.
fn basic_auth_value(api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!(":{api_key}")))
}

pub fn download_link(file_id: &str) -> String {
    format!("https://pixeldrain.com/u/{file_id}")
}

#[async_trait]
impl ServiceAdapter for Pixeldrain {
    fn name(&self) -> &'static str {
        "pixeldrain"
    }

    async fn upload(&self, job: &UploadJob) -> Result<UploadOutcome> {
        let url = self.upload_url(&job.file_name)?;
        let res = self
            .client
            .put(url)
            .header(AUTHORIZATION, basic_auth_value(&self.api_key))
            .header(CONTENT_LENGTH, job.file_size)
            .body(job.body().await?)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(error_from_response("pixeldrain", res).await);
        }

        let parsed: PixeldrainResponse = res.json().await?;
        let link = download_link(&parsed.id);
        Ok(UploadOutcome {
            file_id: parsed.id,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_has_empty_username() {
        // ":secret" base64-encoded
        assert_eq!(basic_auth_value("secret"), "Basic OnNlY3JldA==");
    }

    #[test]
    fn upload_url_encodes_awkward_names() {
        let adapter = Pixeldrain::new(Client::new(), "k".into());
        let url = adapter.upload_url("my report (final).pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "https://pixeldrain.com/api/file/my%20report%20(final).pdf"
        );
    }

    #[test]
    fn response_maps_to_view_link() {
        let parsed: PixeldrainResponse = serde_json::from_str(r#"{"id":"abc123"}"#).unwrap();
        assert_eq!(download_link(&parsed.id), "https://pixeldrain.com/u/abc123");
    }
}
