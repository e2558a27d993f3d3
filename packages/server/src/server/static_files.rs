use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

// Landing page and public assets, embedded at compile time
#[derive(RustEmbed)]
#[folder = "public/"]
pub struct PublicAssets;

/// Serve embedded public assets; `/` maps to `index.html`.
pub async fn serve_public(uri: Uri) -> Response {
    serve_embedded::<PublicAssets>(uri.path())
}

fn serve_embedded<E: RustEmbed>(path: &str) -> Response {
    let path = path.trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    match E::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}
