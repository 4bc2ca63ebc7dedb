//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `HalClient` through
//! the real `UreqTransport`. The server records every request it receives,
//! which lets the tests check index caching and the exact bytes of multipart
//! uploads as seen on the wire.

use std::io::Write;
use std::net::SocketAddr;

use hal_core::{ClientConfig, FormData, HalClient, HalError, Params, UreqTransport};
use mock_server::MockState;
use serde_json::json;

/// Start the mock server on its own runtime thread.
fn start_server() -> (SocketAddr, MockState) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let state = MockState::new();
    let server_state = state.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_state).await
        })
        .unwrap();
    });

    (addr, state)
}

fn params(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

fn client(addr: SocketAddr) -> HalClient {
    HalClient::new(&format!("http://{addr}/"))
}

#[test]
fn index_is_fetched_once() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let href = client.resolve("test", false).unwrap();
    assert_eq!(href, format!("http://{addr}/test/{{id}}"));
    client.resolve("test", false).unwrap();
    client.resolve("files", false).unwrap();
    assert_eq!(state.blocking_count("/"), 1);

    let err = client.resolve("missing", false).unwrap_err();
    assert!(matches!(err, HalError::UnknownRelation(_)));
    assert_eq!(state.blocking_count("/"), 1);
}

#[test]
fn public_index_is_cached_separately() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let data = client.query("test", &params(json!({"id": 5})), true).unwrap();
    let nav = data.as_navigator().unwrap();
    assert_eq!(nav.get("public"), Some(&json!(true)));

    client.query("test", &params(json!({"id": 6})), false).unwrap();
    client.query("test", &params(json!({"id": 7})), true).unwrap();
    assert_eq!(state.blocking_count("/public/"), 1);
    assert_eq!(state.blocking_count("/"), 1);
}

#[test]
fn query_classifies_by_content_type() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let data = client.query("test", &params(json!({"id": 12})), false).unwrap();
    assert_eq!(data.as_navigator().unwrap().get("id"), Some(&json!(12)));
    let last = state.blocking_requests().pop().unwrap();
    assert_eq!(last.method, "GET");
    assert_eq!(last.uri, "/test/12");

    let data = client.query("test", &Params::new(), false).unwrap();
    assert_eq!(data.as_json().unwrap()["name"], "john");

    let data = client.query("search", &params(json!({"q": "hal client", "page": 2})), false).unwrap();
    assert_eq!(data.as_json().unwrap(), &json!({"q": "hal client", "page": "2"}));
}

#[test]
fn get_file_returns_body_verbatim() {
    let (addr, _state) = start_server();
    let mut client = client(addr);

    let body = client.get_file("files", &params(json!({"name": "report.csv"}))).unwrap();
    assert_eq!(body, b"contents of report.csv");
}

#[test]
fn errors_surface_as_upstream_and_keep_cache() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let err = client.query("error", &Params::new(), false).unwrap_err();
    assert_eq!(err.status(), Some(400));
    let err = client.command("error", &Params::new(), &[]).unwrap_err();
    assert_eq!(err.status(), Some(400));

    assert!(client.relations(false).is_some());
    assert_eq!(state.blocking_count("/"), 1);
}

#[test]
fn json_command_omits_templated_params() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let data = client
        .command("test", &params(json!({"id": 3, "name": "Rupert"})), &[])
        .unwrap();
    let nav = data.as_navigator().unwrap();
    assert_eq!(nav.get("name"), Some(&json!("Rupert")));

    let last = state.blocking_requests().pop().unwrap();
    assert_eq!(last.method, "POST");
    assert_eq!(last.uri, "/test/3");
    assert_eq!(last.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&last.body).unwrap();
    assert_eq!(body, json!({"name": "Rupert"}));
}

#[test]
fn multipart_upload_round_trips_through_the_server() {
    let (addr, state) = start_server();
    let mut client = client(addr);

    let mut file = tempfile::Builder::new().prefix("myfile").suffix(".txt").tempfile().unwrap();
    file.write_all(b"uploaded\r\ncontent").unwrap();
    let filename = file.path().file_name().unwrap().to_string_lossy().into_owned();

    let data = client
        .command(
            "test",
            &params(json!({"id": 3, "name": "Rupert"})),
            &[("file", file.path())],
        )
        .unwrap();
    assert!(data.is_empty());

    let last = state.blocking_requests().pop().unwrap();
    assert_eq!(last.uri, "/test/3");
    assert!(last.header("content-type").unwrap().contains("multipart/form-data"));

    let form = FormData::parse(&last.body).unwrap();
    assert_eq!(form.fields["name"], "Rupert");
    assert!(!form.fields.contains_key("id"));
    let uploaded = &form.files["file"];
    assert_eq!(uploaded.filename, filename);
    assert_eq!(uploaded.content, b"uploaded\r\ncontent");
}

#[test]
fn unreachable_server_is_upstream_without_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(format!("http://{addr}/"));
    let mut client = HalClient::with_transport(config, UreqTransport::with_timeout(std::time::Duration::from_secs(5)));
    let err = client.resolve("test", false).unwrap_err();
    assert!(matches!(err, HalError::Upstream { status: None, .. }));
}
