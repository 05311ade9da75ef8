//! Mock conversion service and client construction

use std::path::Path;
use tempfile::TempDir;
use v2a_dl::{Client, Config, FileCollisionAction};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Three results as the service returns them (one with a float duration)
pub const THREE_RESULTS: &str = r#"[
    {"title": "Lofi Beats", "url": "https://www.youtube.com/watch?v=v1", "thumbnail": "https://i.ytimg.com/vi/v1/hq.jpg", "duration": 3600},
    {"title": "Rain Sounds", "url": "https://www.youtube.com/watch?v=v2", "thumbnail": "https://i.ytimg.com/vi/v2/hq.jpg", "duration": 185.0},
    {"title": "Jazz Cafe", "url": "https://www.youtube.com/watch?v=v3", "thumbnail": "https://i.ytimg.com/vi/v3/hq.jpg", "duration": null}
]"#;

/// `GET /formats` body
pub const FORMATS: &str = r#"{
    "formats": {
        "fast": {
            "formats": ["mp3", "aac", "ogg"],
            "description": "Quick processing using stream copy when possible",
            "recommended_for": "mp3, aac"
        },
        "quality": {
            "formats": ["mp3", "aac", "alac", "flac", "wav", "ogg"],
            "description": "High quality processing with re-encoding",
            "recommended_for": "flac, wav, alac"
        }
    },
    "bitrates": ["128", "192", "256", "320"],
    "methods": ["auto", "fast", "quality", "stream"]
}"#;

/// Client against `server`, saving into `dir`
pub fn client_for(server: &MockServer, dir: &Path) -> Client {
    let mut config = Config::default();
    config.server.base_url = server.uri();
    config.output.download_dir = dir.to_path_buf();
    config.output.file_collision = FileCollisionAction::Rename;
    Client::new(config).expect("valid test config")
}

/// Mock server plus a client saving into a fresh temp dir
pub async fn setup() -> (MockServer, Client, TempDir) {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("temp dir");
    let client = client_for(&server, dir.path());
    (server, client, dir)
}

/// Answer `GET /search?query={query}` with `status` and `body`
pub async fn mount_search(server: &MockServer, query: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("query", query))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Answer `GET /download?url={url}` with a response template
pub async fn mount_download(server: &MockServer, url: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/download"))
        .and(query_param("url", url))
        .respond_with(response)
        .mount(server)
        .await;
}
