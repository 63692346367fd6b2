use std::env;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use formats::FloorManifest;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MANIFEST_FILE: &str = "floors.json";

#[derive(Clone)]
struct AppState {
    tour_root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tour_root = PathBuf::from(env::var("TOUR_ROOT").unwrap_or_else(|_| "public".to_string()));
    let addr: SocketAddr = env::var("TOUR_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9200".to_string())
        .parse()
        .map_err(|e| format!("invalid TOUR_ADDR: {e}"))?;

    check_manifest(&tour_root).await;

    let app = router(AppState { tour_root });

    info!("asset server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/floors.json", get(get_manifest))
        .route("/public/*path", get(get_public))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Log what the manifest offers, or why the viewer will not be able to use it.
async fn check_manifest(root: &Path) {
    let path = root.join(MANIFEST_FILE);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(err) => {
            warn!("no floor manifest at {path:?}: {err}");
            return;
        }
    };
    match FloorManifest::from_json(&text) {
        Ok(manifest) => {
            for floor in &manifest.floors {
                info!(
                    floor = %floor.id,
                    model = %floor.model_src,
                    rooms = floor.positions.len(),
                    "floor available"
                );
            }
        }
        Err(err) => warn!("floor manifest {path:?} is invalid: {err}"),
    }
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_manifest(State(state): State<AppState>) -> Response {
    let path = state.tour_root.join(MANIFEST_FILE);
    serve_file(&path, "application/json").await
}

async fn get_public(State(state): State<AppState>, AxumPath(path): AxumPath<String>) -> Response {
    let Some(relative) = sanitize_relative(&path) else {
        warn!("rejected public path {path:?}");
        return (StatusCode::BAD_REQUEST, "bad path").into_response();
    };
    let full = state.tour_root.join(&relative);
    serve_file(&full, content_type_for(&relative)).await
}

/// `path` as a relative path made only of normal components.
fn sanitize_relative(path: &str) -> Option<PathBuf> {
    if path.contains('\\') || path.contains('\0') {
        return None;
    }
    let mut out = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("gltf") => "model/gltf+json",
        Some("glb") => "model/gltf-binary",
        Some("bin") => "application/octet-stream",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ktx2") => "image/ktx2",
        _ => "application/octet-stream",
    }
}

async fn serve_file(path: &Path, content_type: &'static str) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(content_type),
            );
            (StatusCode::OK, headers, Body::from(data)).into_response()
        }
        Err(err) => {
            error!("file read failed: {path:?} -> {err}");
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{content_type_for, sanitize_relative, serve_file};
    use axum::http::StatusCode;
    use std::path::{Path, PathBuf};

    #[test]
    fn rejects_traversal() {
        assert_eq!(sanitize_relative("../secret"), None);
        assert_eq!(sanitize_relative("models/../../etc/passwd"), None);
        assert_eq!(sanitize_relative("models\\..\\x"), None);
        assert_eq!(sanitize_relative(""), None);
        assert_eq!(sanitize_relative("./"), None);
    }

    #[test]
    fn keeps_normal_paths() {
        assert_eq!(
            sanitize_relative("models/Annex12F.gltf"),
            Some(PathBuf::from("models/Annex12F.gltf"))
        );
        assert_eq!(
            sanitize_relative("/anchors/./rooms.json"),
            Some(PathBuf::from("anchors/rooms.json"))
        );
    }

    #[test]
    fn content_types_cover_model_and_image_files() {
        assert_eq!(content_type_for(Path::new("a/Floor.GLTF")), "model/gltf+json");
        assert_eq!(content_type_for(Path::new("a.glb")), "model/gltf-binary");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("rooms.json")), "application/json");
        assert_eq!(content_type_for(Path::new("u1.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn serves_existing_file_and_404s_missing() {
        let dir = std::env::temp_dir().join(format!("asset_server_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let file = dir.join("floors.json");
        std::fs::write(&file, br#"{"floors": []}"#).expect("write");

        let ok = serve_file(&file, "application/json").await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(http::header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );

        let missing = serve_file(&dir.join("nope.glb"), "model/gltf-binary").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).ok();
    }
}
