#![cfg(feature = "web")]

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::de::DeserializeOwned;

use crate::api::{ApiError, ChartApi};
use crate::render::{RenderRequest, RenderResponse};
use crate::settings::Settings;
use crate::upload::{FileBody, SelectedFile, UploadResponse};

pub const UPLOAD_PATH: &str = "/upload";
pub const GENERATE_PATH: &str = "/generate_graph";

/// [`ChartApi`] over HTTP.
///
/// Responses are decoded as JSON whatever their status code, since the
/// server reports its own failures in the body.
#[derive(Debug, Clone)]
pub struct HttpChartApi {
    http: Client,
    upload_url: String,
    generate_url: String,
}

impl HttpChartApi {
    /// Builds a client for the server at `settings.server_url`.
    ///
    /// # Arguments
    /// * `settings` - Supplies the base URL and the optional timeout
    ///
    /// # Returns
    /// * `Result<HttpChartApi, ApiError>` - The client, or the builder error
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpChartApi {
            http,
            upload_url: settings.endpoint(UPLOAD_PATH),
            generate_url: settings.endpoint(GENERATE_PATH),
        })
    }

    async fn file_part(file: &SelectedFile) -> Result<Part, ApiError> {
        let part = match &file.body {
            FileBody::Bytes(bytes) => Part::bytes(bytes.clone()),
            FileBody::Path(path) => {
                let handle = tokio::fs::File::open(path).await?;
                Part::stream_with_length(Body::from(handle), file.size)
            }
        };
        Ok(part.file_name(file.name.clone()))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| {
        log::debug!("undecodable {} body: {}", status, text);
        ApiError::Decode(format!("{} (HTTP {})", e, status))
    })
}

impl ChartApi for HttpChartApi {
    async fn upload(&self, file: &SelectedFile) -> Result<UploadResponse, ApiError> {
        let form = Form::new().part("file", Self::file_part(file).await?);

        log::debug!("POST {} ({} bytes)", self.upload_url, file.size);
        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        decode(response).await
    }

    async fn generate(&self, request: &RenderRequest) -> Result<RenderResponse, ApiError> {
        log::debug!("POST {} ({})", self.generate_url, request.graph_type);
        let response = self
            .http
            .post(&self.generate_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        decode(response).await
    }
}
