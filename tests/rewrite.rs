//! Integration tests for the download-and-substitute utility.

use enrichfeed::feed::{FetchError, HttpClient};
use enrichfeed::rewrite::{download_and_rewrite, parse_pairs, RewriteError};
use flate2::write::GzEncoder;
use flate2::Compression;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PODCAST: &str = r#"<rss><channel><title>Show</title>
<item><enclosure url="http://cdn.example.org/ep1.mp3?tracking=1"/></item>
</channel></rss>"#;

fn client() -> HttpClient {
    HttpClient::new("enrichfeed-test/1.0", Duration::from_secs(5), None).unwrap()
}

#[tokio::test]
async fn test_download_applies_rules_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/podcast.xml"))
        .and(header("user-agent", "enrichfeed-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PODCAST))
        .mount(&server)
        .await;

    let rules = parse_pairs(&[r"\?tracking=\d+", "", "http://", "https://"]).unwrap();
    let out = download_and_rewrite(&client(), &format!("{}/podcast.xml", server.uri()), &rules)
        .await
        .unwrap();

    assert!(out.contains(r#"<enclosure url="https://cdn.example.org/ep1.mp3"/>"#));
    assert!(!out.contains("tracking"));
}

#[tokio::test]
async fn test_gzip_body_decoded_before_rewriting() {
    let server = MockServer::start().await;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"<html>Hello world!</html>").unwrap();
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(encoder.finish().unwrap()),
        )
        .mount(&server)
        .await;

    let rules = parse_pairs(&["world", "there"]).unwrap();
    let out = download_and_rewrite(&client(), &server.uri(), &rules)
        .await
        .unwrap();
    assert_eq!(out, "<html>Hello there!</html>");
}

#[tokio::test]
async fn test_not_modified_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let out = download_and_rewrite(&client(), &server.uri(), &[])
        .await
        .unwrap();
    assert_eq!(out, "");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = download_and_rewrite(&client(), &server.uri(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, RewriteError::Fetch(FetchError::HttpStatus(403))));
}
