use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;

use crate::common::errors::{Result, UpdropError};
use crate::services::{error_from_response, ServiceAdapter, UploadOutcome};
use crate::upload::UploadJob;

const UPLOAD_ENDPOINT: &str = "https://upload.gofile.io/uploadfile";

/// Gofile takes a multipart form. A Bearer token attributes the upload
/// to an account; without one the upload is anonymous.
pub struct Gofile {
    client: Client,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct GofileResponse {
    status: String,
    #[serde(default)]
    data: Option<GofileData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GofileData {
    #[serde(default, alias = "id")]
    file_id: Option<String>,
    #[serde(default)]
    download_page: Option<String>,
}

impl GofileResponse {
    fn into_outcome(self) -> Result<UploadOutcome> {
        if self.status != "ok" {
            return Err(UpdropError::ServiceError {
                service: "gofile",
                message: format!("status {}", self.status),
            });
        }
        let data = self.data.ok_or_else(|| UpdropError::ServiceError {
            service: "gofile",
            message: "response missing data".to_string(),
        })?;
        match (data.file_id, data.download_page) {
            (Some(file_id), Some(link)) => Ok(UploadOutcome { file_id, link }),
            _ => Err(UpdropError::ServiceError {
                service: "gofile",
                message: "response missing fileId/downloadPage".to_string(),
            }),
        }
    }
}

impl Gofile {
    pub fn new(client: Client, api_token: Option<String>) -> Self {
        Self { client, api_token }
    }
}

#[async_trait]
impl ServiceAdapter for Gofile {
    fn name(&self) -> &'static str {
        "gofile"
    }

    async fn upload(&self, job: &UploadJob) -> Result<UploadOutcome> {
        let part = multipart::Part::stream_with_length(job.body().await?, job.file_size)
            .file_name(job.file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part("file", part);

        let mut req = self.client.post(UPLOAD_ENDPOINT).multipart(form);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(error_from_response("gofile", res).await);
        }

        let parsed: GofileResponse = res.json().await?;
        parsed.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_maps_to_outcome() {
        let parsed: GofileResponse = serde_json::from_str(
            r#"{"status":"ok","data":{"fileId":"f1","fileName":"a.txt","downloadPage":"https://gofile.io/d/abc"}}"#,
        )
        .unwrap();
        let outcome = parsed.into_outcome().unwrap();
        assert_eq!(outcome.file_id, "f1");
        assert_eq!(outcome.link, "https://gofile.io/d/abc");
    }

    #[test]
    fn legacy_id_field_is_accepted() {
        let parsed: GofileResponse = serde_json::from_str(
            r#"{"status":"ok","data":{"id":"f2","downloadPage":"https://gofile.io/d/def"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_outcome().unwrap().file_id, "f2");
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let parsed: GofileResponse =
            serde_json::from_str(r#"{"status":"error-auth"}"#).unwrap();
        let err = parsed.into_outcome().unwrap_err();
        assert!(matches!(err, UpdropError::ServiceError { service: "gofile", .. }));
    }

    #[test]
    fn ok_without_fields_is_an_error() {
        let parsed: GofileResponse =
            serde_json::from_str(r#"{"status":"ok","data":{}}"#).unwrap();
        assert!(parsed.into_outcome().is_err());
    }
}
