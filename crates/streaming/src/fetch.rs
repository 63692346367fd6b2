use formats::{ModelAsset, ModelDocument, ModelError};

use crate::sources::resolve_relative;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Status { url: String, status: u16 },
    Network { url: String, message: String },
    Timeout { url: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status { url, status } => write!(f, "GET {url} returned HTTP {status}"),
            FetchError::Network { url, message } => write!(f, "GET {url} failed: {message}"),
            FetchError::Timeout { url } => write!(f, "GET {url} timed out"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Progress callback: `(bytes_loaded, total_bytes_if_known)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u64, Option<u64>);

/// Port to whatever can GET bytes (browser fetch, test fixtures).
///
/// Futures are not `Send`; the browser runs everything on one thread.
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    async fn fetch(&self, url: &str, on_progress: ProgressFn<'_>) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug)]
pub enum AttemptError {
    Fetch(FetchError),
    Model(ModelError),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Fetch(e) => write!(f, "{e}"),
            AttemptError::Model(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Fetch(e) => Some(e),
            AttemptError::Model(e) => Some(e),
        }
    }
}

impl From<FetchError> for AttemptError {
    fn from(e: FetchError) -> Self {
        AttemptError::Fetch(e)
    }
}

impl From<ModelError> for AttemptError {
    fn from(e: ModelError) -> Self {
        AttemptError::Model(e)
    }
}

/// One complete attempt: fetch the model, then any external buffers it
/// references (relative to `url`), then build the asset.
///
/// Progress reports only cover the model file itself.
pub async fn load_attempt<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    fetch_url: &str,
    on_progress: ProgressFn<'_>,
) -> Result<ModelAsset, AttemptError> {
    let bytes = fetcher.fetch(fetch_url, on_progress).await?;
    let doc = ModelDocument::parse(&bytes)?;

    let mut external = Vec::new();
    for buffer in doc.external_buffers() {
        let buffer_url = resolve_relative(url, &buffer.uri);
        tracing::debug!(url = %buffer_url, index = buffer.index, "fetching model buffer");
        let data = fetcher.fetch(&buffer_url, &mut |_, _| {}).await?;
        external.push((buffer.index, data));
    }

    Ok(doc.into_asset(external)?)
}

#[cfg(test)]
mod tests {
    use super::{AssetFetcher, AttemptError, FetchError, ProgressFn, load_attempt};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct FixtureFetcher {
        files: HashMap<String, Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl FixtureFetcher {
        fn new(entries: &[(&str, &str)]) -> Self {
            let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../formats/tests/fixtures");
            let files = entries
                .iter()
                .map(|(url, file)| {
                    let bytes = std::fs::read(dir.join(file)).expect("fixture");
                    (url.to_string(), bytes)
                })
                .collect();
            Self {
                files,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl AssetFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str, on_progress: ProgressFn<'_>) -> Result<Vec<u8>, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            let path = url.split('?').next().unwrap_or(url);
            match self.files.get(path) {
                Some(bytes) => {
                    on_progress(bytes.len() as u64, Some(bytes.len() as u64));
                    Ok(bytes.clone())
                }
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    #[test]
    fn loads_embedded_model_with_progress() {
        let fetcher = FixtureFetcher::new(&[("/public/tri.gltf", "triangle_embedded.gltf")]);
        let mut seen = Vec::new();
        let asset = pollster::block_on(load_attempt(
            &fetcher,
            "/public/tri.gltf",
            "/public/tri.gltf?t=5",
            &mut |loaded, total| seen.push((loaded, total)),
        ))
        .expect("asset");
        assert_eq!(asset.vertex_count(), 3);
        assert_eq!(seen.len(), 1);
        assert_eq!(*fetcher.requested.borrow(), vec!["/public/tri.gltf?t=5"]);
    }

    #[test]
    fn fetches_external_buffers_next_to_the_model() {
        let fetcher = FixtureFetcher::new(&[
            ("/public/floors/tri.gltf", "triangle_external.gltf"),
            ("/public/floors/triangle.bin", "triangle.bin"),
        ]);
        let asset = pollster::block_on(load_attempt(
            &fetcher,
            "/public/floors/tri.gltf",
            "/public/floors/tri.gltf",
            &mut |_, _| {},
        ))
        .expect("asset");
        assert_eq!(asset.bounds.max, [12.0, 4.0, 0.0]);
        assert_eq!(
            *fetcher.requested.borrow(),
            vec!["/public/floors/tri.gltf", "/public/floors/triangle.bin"]
        );
    }

    #[test]
    fn missing_buffer_fails_the_attempt() {
        let fetcher = FixtureFetcher::new(&[("/tri.gltf", "triangle_external.gltf")]);
        let err = pollster::block_on(load_attempt(&fetcher, "/tri.gltf", "/tri.gltf", &mut |_, _| {}))
            .unwrap_err();
        assert!(matches!(err, AttemptError::Fetch(FetchError::Status { status: 404, .. })));
        assert_eq!(err.to_string(), "GET /triangle.bin returned HTTP 404");
    }

    #[test]
    fn html_fallback_page_is_a_model_error() {
        let fetcher = FixtureFetcher::new(&[("/tri.gltf", "../../Cargo.toml")]);
        let err = pollster::block_on(load_attempt(&fetcher, "/tri.gltf", "/tri.gltf", &mut |_, _| {}))
            .unwrap_err();
        assert!(matches!(err, AttemptError::Model(_)));
    }
}
