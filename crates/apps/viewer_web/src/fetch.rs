use gloo_net::http::{Request, Response};
use streaming::{AssetFetcher, FetchError, ProgressFn};

/// Browser `fetch` through gloo-net.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlooFetcher;

impl GlooFetcher {
    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let resp = Request::get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        if !resp.ok() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        Ok(resp)
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get(url).await?;
        resp.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl AssetFetcher for GlooFetcher {
    /// gloo-net buffers the whole body, so progress is reported once, when
    /// it has arrived.
    async fn fetch(&self, url: &str, on_progress: ProgressFn<'_>) -> Result<Vec<u8>, FetchError> {
        let resp = self.get(url).await?;
        let total = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        let bytes = resp.binary().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        on_progress(bytes.len() as u64, total);
        Ok(bytes)
    }
}
