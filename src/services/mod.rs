//! Service adapters: one per upload destination. Each adapter owns its
//! endpoint, auth header shape, and the mapping from that service's
//! response JSON to the common [`UploadOutcome`].

pub mod gdrive;
pub mod gofile;
pub mod pixeldrain;

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::common::config::ConfigStore;
use crate::common::errors::{Result, UpdropError};
use crate::upload::UploadJob;

/// The three supported destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    Pixeldrain,
    Gofile,
    /// Needs a one-time OAuth2 authorization in the browser.
    #[value(name = "gdrive")]
    GoogleDrive,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Pixeldrain, Service::Gofile, Service::GoogleDrive];
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Pixeldrain => "pixeldrain",
            Service::Gofile => "gofile",
            Service::GoogleDrive => "google-drive",
        };
        write!(f, "{name}")
    }
}

/// What every adapter normalizes its response down to.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub file_id: String,
    pub link: String,
}

#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stream the job's file to the service and map its response to an
    /// [`UploadOutcome`]. Implementations pull bytes through the job's
    /// counted stream so progress reporting keeps working.
    async fn upload(&self, job: &UploadJob) -> Result<UploadOutcome>;
}

/// Build an adapter for `service` from stored credentials. For Google
/// Drive this may run the interactive OAuth flow (first use only) and
/// persist the refresh token back into the config store.
pub async fn connect(service: Service, store: &ConfigStore) -> Result<Box<dyn ServiceAdapter>> {
    let client = reqwest::Client::new();
    let config = store.load()?;

    match service {
        Service::Pixeldrain => {
            let api_key = config.pixeldrain.api_key.ok_or(UpdropError::MissingCredentials {
                service: "pixeldrain",
                hint: "set an API key with `updrop config`",
            })?;
            Ok(Box::new(pixeldrain::Pixeldrain::new(client, api_key)))
        }
        Service::Gofile => {
            // No token is fine: Gofile accepts anonymous uploads.
            Ok(Box::new(gofile::Gofile::new(client, config.gofile.api_token)))
        }
        Service::GoogleDrive => {
            let adapter = gdrive::GoogleDrive::connect(client, store).await?;
            Ok(Box::new(adapter))
        }
    }
}

/// Turn a non-2xx response into a `ServiceError` carrying whatever the
/// service said in the body.
pub(crate) async fn error_from_response(
    service: &'static str,
    res: reqwest::Response,
) -> UpdropError {
    let status = res.status();
    let body: String = res
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(300)
        .collect();
    UpdropError::ServiceError {
        service,
        message: format!("{status}: {body}"),
    }
}
