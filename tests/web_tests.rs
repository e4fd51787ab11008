//! HTTP tests of the web API, driven through the router without a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use seq_kin::web::server::{api_routes, AppState, MAX_MULTIPART_FIELDS};
use seq_kin::{ClusterConfig, Database, SearchConfig};

const BOUNDARY: &str = "seqkinboundary";

fn random_bases(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b"ACGT"[rng.gen_range(0..4)]))
        .collect()
}

struct Server {
    dir: TempDir,
    app: Router,
    alpha: String,
}

impl Server {
    fn start() -> Self {
        let mut rng = StdRng::seed_from_u64(77);
        let alpha = random_bases(&mut rng, 250);
        let beta = random_bases(&mut rng, 250);

        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("refs.fasta"),
            format!(">alpha\n{alpha}\n>beta\n{beta}\n"),
        )
        .unwrap();

        let cluster_config = ClusterConfig {
            threshold: 400.0,
            ..ClusterConfig::default()
        };
        let search_config = SearchConfig::default();

        let database = Database::load_and_cluster(dir.path(), &cluster_config).unwrap();
        let state = Arc::new(AppState::new(database, cluster_config, search_config));

        Self {
            dir,
            app: api_routes(state),
            alpha,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

/// Build a multipart body from (name, optional filename, value) parts
fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, value) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(file) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/api/search")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_index_page() {
    let server = Server::start();
    let (status, body) = server.send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("/api/search"));
}

#[tokio::test]
async fn test_search_with_pasted_sequence() {
    let server = Server::start();
    let query = format!(">sample\n{}\n", server.alpha);

    let (status, json) = server
        .send_json(multipart(&[("sequence_text", None, &query)]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["query"]["name"], "sample");
    assert_eq!(json["matches"][0]["name"], "alpha");
    assert_eq!(json["matches"][0]["score"], 500.0);
    assert_eq!(json["best_family"], "Family_1");
    assert_eq!(json["processing_info"]["compared"], 2);
}

#[tokio::test]
async fn test_search_with_uploaded_file() {
    let server = Server::start();
    let query = format!(">uploaded\n{}\n", server.alpha);

    let (status, json) = server
        .send_json(multipart(&[
            ("file", Some("sample.fasta"), &query),
            ("sequence_text", None, "ignored when a file is sent"),
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"]["name"], "uploaded");
}

#[tokio::test]
async fn test_headerless_upload_named_after_file() {
    let server = Server::start();
    let bases = format!("{}\n", server.alpha);

    let (status, json) = server
        .send_json(multipart(&[("file", Some("patient 7.fa"), &bases)]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"]["name"], "patient 7");

    let (status, json) = server
        .send_json(multipart(&[("sequence_text", None, &bases)]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"]["name"], "query");
}

#[tokio::test]
async fn test_report_follows_search() {
    let server = Server::start();

    let (status, json) = server.send_json(get("/api/report")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error_type"], "no_report");

    let query = format!(">sample\n{}\n", server.alpha);
    let (status, _) = server
        .send(multipart(&[("sequence_text", None, &query)]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.send(get("/api/report")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("Closest Virus: alpha"));
    assert!(text.contains("Family Name: Family_1"));
}

#[tokio::test]
async fn test_no_match_is_not_found() {
    let server = Server::start();
    let query = format!(">sample\n{}\n", server.alpha);

    let (status, json) = server
        .send_json(multipart(&[
            ("sequence_text", None, &query),
            ("threshold", None, "100000"),
        ]))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error_type"], "no_match");
    assert!(json["details"].is_null());
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let server = Server::start();

    let (status, json) = server
        .send_json(multipart(&[("sequence_text", None, ">p\nMKVLATQE\n")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_query");

    let (status, json) = server.send_json(multipart(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "missing_input");
}

#[tokio::test]
async fn test_invalid_threshold_is_bad_request() {
    let server = Server::start();
    let (status, json) = server
        .send_json(multipart(&[
            ("sequence_text", None, "ACGT"),
            ("threshold", None, "high"),
        ]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_threshold");
}

#[tokio::test]
async fn test_path_traversal_filename_rejected() {
    let server = Server::start();
    let (status, json) = server
        .send_json(multipart(&[("file", Some("../../etc/passwd"), ">x\nACGT\n")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_filename");
}

#[tokio::test]
async fn test_too_many_fields_rejected() {
    let server = Server::start();
    let parts: Vec<(&str, Option<&str>, &str)> = (0..=MAX_MULTIPART_FIELDS)
        .map(|_| ("padding", None, "x"))
        .collect();

    let (status, json) = server.send_json(multipart(&parts)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "field_limit_exceeded");
}

#[tokio::test]
async fn test_families_listing() {
    let server = Server::start();
    let (status, json) = server.send_json(get("/api/families")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["reference_count"], 2);
    assert_eq!(json["families"][0]["family"], "Family_1");
    assert_eq!(json["families"][0]["members"][0]["name"], "alpha");
    assert_eq!(json["families"][0]["members"][0]["length"], 250);
}

#[tokio::test]
async fn test_reload_picks_up_new_files() {
    let server = Server::start();
    let mut rng = StdRng::seed_from_u64(5);
    std::fs::write(
        server.dir.path().join("extra.fa"),
        format!(">gamma\n{}\n", random_bases(&mut rng, 250)),
    )
    .unwrap();

    let reload = Request::builder()
        .method("POST")
        .uri("/api/reload")
        .body(Body::empty())
        .unwrap();
    let (status, json) = server.send_json(reload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reference_count"], 3);

    let (_, json) = server.send_json(get("/api/families")).await;
    assert_eq!(json["reference_count"], 3);
}

#[tokio::test]
async fn test_empty_database_unavailable() {
    let dir = TempDir::new().unwrap();
    let database = Database::load_and_cluster(dir.path(), &ClusterConfig::default()).unwrap();
    let state = Arc::new(AppState::new(
        database,
        ClusterConfig::default(),
        SearchConfig::default(),
    ));
    let app = api_routes(state);

    let response = app
        .oneshot(multipart(&[("sequence_text", None, "ACGTACGT")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
