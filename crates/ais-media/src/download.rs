//! Source photograph download.
//!
//! The `/angle/` endpoint receives a URL; the photograph is fetched with a
//! plain GET and written into `{basepath}/initial_img/` for segmentation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// File name the downloaded photograph is stored under.
pub const DOWNLOADED_IMAGE_NAME: &str = "downloaded_image.jpg";

/// Build the HTTP client used for downloads.
pub fn build_http_client(timeout: Duration) -> MediaResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MediaError::internal(format!("HTTP client: {e}")))
}

/// Accept only absolute http(s) URLs.
pub fn validate_image_url(raw: &str) -> MediaResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| MediaError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(MediaError::InvalidUrl(format!(
            "unsupported scheme '{other}' in {raw}"
        ))),
    }
}

/// Download `url` into `dest_dir/downloaded_image.jpg`, creating `dest_dir` if needed.
pub async fn download_image(client: &Client, url: &str, dest_dir: &Path) -> MediaResult<PathBuf> {
    let url = validate_image_url(url)?;
    let start = Instant::now();

    tokio::fs::create_dir_all(dest_dir).await?;

    debug!("Downloading source image from {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("GET {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "GET {url} returned {status}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::download_failed(format!("reading body of {url}: {e}")))?;

    let path = dest_dir.join(DOWNLOADED_IMAGE_NAME);
    tokio::fs::write(&path, &bytes).await?;

    let elapsed = start.elapsed();
    metrics::record_download_duration(elapsed.as_secs_f64());
    info!(
        bytes = bytes.len(),
        duration_ms = elapsed.as_millis() as u64,
        "Downloaded source image to {}",
        path.display()
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("https://example.com/back.jpg").is_ok());
        assert!(validate_image_url("  http://example.com/a.png ").is_ok());
        assert!(matches!(
            validate_image_url("ftp://example.com/a.png"),
            Err(MediaError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_image_url("not a url"),
            Err(MediaError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/back.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("initial_img");
        let url = format!("{}/back.jpg", server.uri());

        let written = download_image(&client(), &url, &dest).await.unwrap();

        assert_eq!(written, dest.join(DOWNLOADED_IMAGE_NAME));
        assert_eq!(std::fs::read(&written).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_download_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/missing.jpg", server.uri());

        let err = download_image(&client(), &url, dir.path()).await.unwrap_err();
        assert!(err.is_upstream_error());
        assert!(!dir.path().join(DOWNLOADED_IMAGE_NAME).exists());
    }
}
