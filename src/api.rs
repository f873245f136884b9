use std::future::Future;
use thiserror::Error;

use crate::render::{RenderRequest, RenderResponse};
use crate::upload::{SelectedFile, UploadResponse};

/// Failure to get a JSON answer out of an endpoint.
///
/// Server-reported failures are not errors at this level; they arrive as a
/// response with `success: false`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The two endpoints the controller talks to.
///
/// Implemented over HTTP by [`crate::client::HttpChartApi`]; tests supply
/// in-memory versions.
pub trait ChartApi {
    /// Sends a file as multipart field `file`.
    fn upload(
        &self,
        file: &SelectedFile,
    ) -> impl Future<Output = Result<UploadResponse, ApiError>>;

    /// Posts a render request as JSON.
    fn generate(
        &self,
        request: &RenderRequest,
    ) -> impl Future<Output = Result<RenderResponse, ApiError>>;
}

impl<T: ChartApi> ChartApi for &T {
    fn upload(
        &self,
        file: &SelectedFile,
    ) -> impl Future<Output = Result<UploadResponse, ApiError>> {
        (**self).upload(file)
    }

    fn generate(
        &self,
        request: &RenderRequest,
    ) -> impl Future<Output = Result<RenderResponse, ApiError>> {
        (**self).generate(request)
    }
}
