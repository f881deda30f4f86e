//! Uploader backed by the link host's HTTP API.
//!
//! Markup is POSTed as `{"shapeId": .., "html": ..}` and the host answers
//! with `{"version": n}`.

use super::Uploader;
use crate::shape::ShapeId;
use crate::{Error, PreviewConfig, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    shape_id: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    version: u64,
}

pub struct HttpUploader {
    client: Client,
    endpoint: Url,
}

impl HttpUploader {
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let endpoint = config.upload_endpoint()?;
        let client = Client::builder()
            .timeout(config.upload_timeout())
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, id: &ShapeId, markup: &str) -> Result<u64> {
        debug!("uploading {} bytes for {} to {}", markup.len(), id, self.endpoint);
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&UploadRequest {
                shape_id: id.as_str(),
                html: markup,
            })
            .send()
            .await
            .map_err(|e| Error::UploadFailed(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::UploadFailed(format!("link host answered {}", status)));
        }

        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| Error::UploadFailed(format!("bad response body: {}", e)))?;
        Ok(body.version)
    }
}
