use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use scene_logging::{scene_debug, scene_info};

use crate::persist::AtomicFileWriter;
use crate::{DownloadError, DownloadRequest, FailureKind, SavedFile};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted content types; an entry ending in `/` matches a whole family.
    pub allowed_content_types: Vec<String>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            redirect_limit: 5,
            max_bytes: 25 * 1024 * 1024,
            allowed_content_types: vec![
                "image/".to_string(),
                "application/octet-stream".to_string(),
            ],
        }
    }
}

/// Saves one generated output. Implementations report failures as values;
/// nothing here retries.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<SavedFile, DownloadError>;
}

/// Whether the host can fetch `url` itself. `blob:` and `data:` outputs live
/// inside the page and have to be saved by the browser.
pub fn fetchable_by_host(url: &str) -> bool {
    url::Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    settings: DownloadSettings,
    writer: AtomicFileWriter,
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(settings: DownloadSettings, writer: AtomicFileWriter) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| DownloadError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            writer,
            client,
        })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings.allowed_content_types.iter().any(|allowed| {
            if allowed.ends_with('/') {
                ct.get(..allowed.len())
                    .is_some_and(|family| family.eq_ignore_ascii_case(allowed))
            } else {
                allowed.eq_ignore_ascii_case(ct)
            }
        })
    }

    fn too_large(&self, actual: u64) -> DownloadError {
        DownloadError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<SavedFile, DownloadError> {
        let parsed = reqwest::Url::parse(&request.url)
            .map_err(|err| DownloadError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::new(
                FailureKind::InvalidUrl,
                format!("scheme {} is not fetchable", parsed.scheme()),
            ));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(DownloadError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            body.extend_from_slice(&chunk);
        }
        scene_debug!(
            "Fetched {} bytes for prompt {} image {}",
            body.len(),
            request.prompt_id,
            request.image_index
        );

        let path = self
            .writer
            .write(&request.filename, &body)
            .map_err(|err| DownloadError::new(FailureKind::Write, err.to_string()))?;
        scene_info!("Saved {:?}", path);

        Ok(SavedFile {
            path,
            byte_len: body.len() as u64,
            content_type,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        return DownloadError::new(FailureKind::Timeout, err.to_string());
    }
    DownloadError::new(FailureKind::Network, err.to_string())
}
