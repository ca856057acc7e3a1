use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_matches::assert_matches;

use amazon_reviews_downloader::domain::{DatasetType, SplitRequest};
use amazon_reviews_downloader::error::ReviewsError;
use amazon_reviews_downloader::hub::{HubClient, HubHttpClient, cached_split_path};

/// Serves one canned HTTP response and returns the request head it received.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            head.extend_from_slice(&buf[..read]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&head).into_owned()
    });
    (endpoint, handle)
}

#[test]
fn missing_file_maps_to_hub_status() {
    let temp = tempfile::tempdir().unwrap();
    let (endpoint, server) = serve_once("404 Not Found", "Entry not found");
    let client = HubHttpClient::new().unwrap().with_endpoint(endpoint);
    let request = SplitRequest::new(DatasetType::Review, "Gift_Cards".parse().unwrap());

    let err = client.fetch_split(&request, temp.path()).unwrap_err();
    server.join().unwrap();
    assert_matches!(
        err,
        ReviewsError::HubStatus { status: 404, message } if message == "Entry not found"
    );

    let data_file = cached_split_path(temp.path(), &request);
    assert!(!data_file.exists());
    assert!(!data_file.with_extension("jsonl.incomplete").exists());
}

#[test]
fn successful_download_lands_in_cache() {
    let temp = tempfile::tempdir().unwrap();
    let body = "{\"rating\": 5.0}\n{\"rating\": 4.0}\n";
    let (endpoint, server) = serve_once("200 OK", body);
    let client = HubHttpClient::new().unwrap().with_endpoint(endpoint);
    let request = SplitRequest::new(DatasetType::Review, "Gift_Cards".parse().unwrap());

    let fetched = client.fetch_split(&request, temp.path()).unwrap();
    let head = server.join().unwrap();

    let data_file = cached_split_path(temp.path(), &request);
    assert_eq!(fetched.data_file, data_file);
    assert_eq!(std::fs::read_to_string(&data_file).unwrap(), body);
    assert!(!data_file.with_extension("jsonl.incomplete").exists());
    assert!(head.starts_with(
        "GET /datasets/McAuley-Lab/Amazon-Reviews-2023/resolve/main/raw/review_categories/Gift_Cards.jsonl "
    ));
}

#[test]
fn unreachable_endpoint_is_a_hub_error() {
    let temp = tempfile::tempdir().unwrap();
    let client = HubHttpClient::new()
        .unwrap()
        .with_endpoint("http://127.0.0.1:1/");
    let request = SplitRequest::new(DatasetType::Review, "Gift_Cards".parse().unwrap());

    let err = client.fetch_split(&request, temp.path()).unwrap_err();
    assert_matches!(err, ReviewsError::HubHttp(_));

    let data_file = cached_split_path(temp.path(), &request);
    assert!(!data_file.exists());
    assert!(!data_file.with_extension("jsonl.incomplete").exists());
}

#[test]
fn cached_split_is_reused_without_network() {
    let temp = tempfile::tempdir().unwrap();
    let client = HubHttpClient::new()
        .unwrap()
        .with_endpoint("http://127.0.0.1:1");
    let request = SplitRequest::new(DatasetType::Meta, "Gift_Cards".parse().unwrap());
    let data_file = cached_split_path(temp.path(), &request);
    std::fs::create_dir_all(data_file.parent().unwrap()).unwrap();
    std::fs::write(&data_file, b"{}\n").unwrap();

    let fetched = client.fetch_split(&request, temp.path()).unwrap();
    assert_eq!(fetched.data_file, data_file);
    assert_eq!(fetched.config_name, "raw_meta_Gift_Cards");
}

#[test]
#[ignore]
fn downloads_gift_cards_meta() {
    let temp = tempfile::tempdir().unwrap();
    let client = HubHttpClient::new().unwrap();
    let request = SplitRequest::new(DatasetType::Meta, "Gift_Cards".parse().unwrap());

    let fetched = client.fetch_split(&request, temp.path()).unwrap();
    let content = std::fs::read_to_string(&fetched.data_file).unwrap();
    assert!(content.lines().count() > 0);
}
