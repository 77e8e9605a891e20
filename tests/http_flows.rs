use std::time::Duration;

use anyhow::Result;
use http::StatusCode;
use jenkins_client::{
    AbortKind, BuildLog, BuildRequest, Client, Error, LogStream, LogStreamOptions, PollOptions,
    QueueItemId,
};
use serde_json::json;
use wiremock::{
    Match, Mock, MockServer, Request, ResponseTemplate,
    matchers::{body_string_contains, header, method, path, query_param},
};

const NO_VALID_CRUMB: &str = "No valid crumb was included in the request";

#[derive(Clone, Copy)]
struct CrumbHeader(&'static str);

impl Match for CrumbHeader {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("Jenkins-Crumb")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == self.0)
    }
}

async fn mock_crumb(server: &MockServer, crumb: &'static str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "hudson.security.csrf.DefaultCrumbIssuer",
            "crumbRequestField": "Jenkins-Crumb",
            "crumb": crumb
        })))
        .expect(expected)
        .up_to_n_times(expected)
        .mount(server)
        .await;
}

async fn mock_get(server: &MockServer, endpoint: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(response)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> Result<Client> {
    Ok(Client::builder(server.uri())?
        .auth_basic("user", "token")
        .build()?)
}

fn fast_poll() -> PollOptions {
    PollOptions::default()
        .interval(Duration::from_millis(10))
        .timeout(Duration::from_secs(5))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_crumb_is_refreshed_and_request_replayed() -> Result<()> {
    let server = MockServer::start().await;

    mock_crumb(&server, "token-1", 1).await;
    mock_crumb(&server, "token-2", 1).await;

    Mock::given(method("POST"))
        .and(path("/job/demo/buildWithParameters"))
        .and(CrumbHeader("token-1"))
        .respond_with(ResponseTemplate::new(403).set_body_string(format!(
            "<html><body>{NO_VALID_CRUMB}</body></html>"
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/job/demo/buildWithParameters"))
        .and(header("Authorization", "Basic dXNlcjp0b2tlbg=="))
        .and(CrumbHeader("token-2"))
        .and(body_string_contains("foo=bar"))
        .respond_with(ResponseTemplate::new(201).append_header("Location", "/queue/item/2/"))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)?
        .jobs()
        .build("demo", BuildRequest::new().param("foo", "bar"))
        .await?;
    assert_eq!(id, QueueItemId::new(2));

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_crumb_issuer_sends_no_crumb() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/job/demo/1/term"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let builds = client(&server)?.builds();
    builds.abort("demo", 1u64, AbortKind::Term).await?;
    builds.abort("demo", 1u64, AbortKind::Term).await?;

    let received = server.received_requests().await.unwrap_or_default();
    assert!(
        received
            .iter()
            .all(|req| !req.headers.contains_key("Jenkins-Crumb"))
    );

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn build_waits_for_executor_and_completion() -> Result<()> {
    let server = MockServer::start().await;

    mock_crumb(&server, "token", 1).await;

    Mock::given(method("POST"))
        .and(path("/job/folder/job/app/build"))
        .and(query_param("token", "trigger"))
        .and(CrumbHeader("token"))
        .respond_with(
            ResponseTemplate::new(201)
                .append_header("Location", "http://ci.example.com/queue/item/7/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    mock_get(
        &server,
        "/queue/item/7/api/json",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "why": "Waiting for next available executor"
        })),
        2,
    )
    .await;
    mock_get(
        &server,
        "/queue/item/7/api/json",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "executable": { "number": 12, "url": "http://ci.example.com/job/folder/job/app/12/" }
        })),
        u64::MAX,
    )
    .await;

    mock_get(
        &server,
        "/job/folder/job/app/12/api/json",
        ResponseTemplate::new(404),
        1,
    )
    .await;
    mock_get(
        &server,
        "/job/folder/job/app/12/api/json",
        ResponseTemplate::new(200).set_body_json(json!({ "number": 12, "building": true })),
        2,
    )
    .await;
    mock_get(
        &server,
        "/job/folder/job/app/12/api/json",
        ResponseTemplate::new(200).set_body_json(json!({
            "number": 12,
            "building": false,
            "result": "SUCCESS"
        })),
        u64::MAX,
    )
    .await;

    let request = BuildRequest::new().token("trigger").wait().poll(fast_poll());
    let id = client(&server)?
        .jobs()
        .build("https://ci.example.com/job/folder/job/app/", request)
        .await?;
    assert_eq!(id.get(), 7);

    let received = server.received_requests().await.unwrap_or_default();
    let build_reads = received
        .iter()
        .filter(|req| req.url.path() == "/job/folder/job/app/12/api/json")
        .count();
    assert_eq!(build_reads, 4);

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parameterized_build_posts_form_body() -> Result<()> {
    let server = MockServer::start().await;

    mock_crumb(&server, "token", 1).await;

    Mock::given(method("POST"))
        .and(path("/job/folder/job/app/buildWithParameters"))
        .and(CrumbHeader("token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("param1=value1"))
        .and(body_string_contains("param2=two"))
        .respond_with(ResponseTemplate::new(201).append_header("Location", "/queue/item/11/"))
        .expect(1)
        .mount(&server)
        .await;

    let request = BuildRequest::new()
        .param("param1", "value1")
        .param("param2", "two");
    let id = client(&server)?
        .jobs()
        .build("folder/app", request)
        .await?;
    assert_eq!(id, QueueItemId::new(11));

    let received = server.received_requests().await.unwrap_or_default();
    assert!(
        received
            .iter()
            .all(|req| !req.url.path().starts_with("/queue/"))
    );

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn build_wait_for_start_stops_once_build_exists() -> Result<()> {
    let server = MockServer::start().await;

    mock_crumb(&server, "token", 1).await;

    Mock::given(method("POST"))
        .and(path("/job/app/build"))
        .respond_with(ResponseTemplate::new(201).append_header("Location", "/queue/item/21/"))
        .expect(1)
        .mount(&server)
        .await;

    mock_get(
        &server,
        "/queue/item/21/api/json",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 21,
            "executable": { "number": 4, "url": "http://ci.example.com/job/app/4/" }
        })),
        u64::MAX,
    )
    .await;

    mock_get(&server, "/job/app/4/api/json", ResponseTemplate::new(404), 1).await;
    mock_get(
        &server,
        "/job/app/4/api/json",
        ResponseTemplate::new(200).set_body_json(json!({ "number": 4, "building": true })),
        u64::MAX,
    )
    .await;

    let request = BuildRequest::new().wait_for_start().poll(fast_poll());
    let id = client(&server)?.jobs().build("app", request).await?;
    assert_eq!(id.get(), 21);

    // Still building, but the wait ends as soon as the build is visible.
    let received = server.received_requests().await.unwrap_or_default();
    let build_reads = received
        .iter()
        .filter(|req| req.url.path() == "/job/app/4/api/json")
        .count();
    assert_eq!(build_reads, 2);

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queue_wait_tolerates_missing_item() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(&server, "/queue/item/8/api/json", ResponseTemplate::new(404), 1).await;
    mock_get(
        &server,
        "/queue/item/8/api/json",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 8,
            "executable": { "number": 31, "url": "http://ci.example.com/job/app/31/" }
        })),
        u64::MAX,
    )
    .await;

    let item = client(&server)?
        .queue()
        .wait_for_executable(8u64, fast_poll())
        .await?;
    assert_eq!(item.executable.map(|run| run.number), Some(31));

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queue_wait_stops_on_auth_failure() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/queue/item/8/api/json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)?
        .queue()
        .wait_for_executable(8u64, fast_poll())
        .await
        .expect_err("expected auth error");
    assert!(err.is_auth_error());

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wait_for_start_tolerates_missing_build() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(&server, "/job/app/3/api/json", ResponseTemplate::new(404), 2).await;
    mock_get(
        &server,
        "/job/app/3/api/json",
        ResponseTemplate::new(200).set_body_json(json!({ "number": 3, "building": true })),
        u64::MAX,
    )
    .await;

    let build = client(&server)?
        .builds()
        .wait_for_start("app", 3u64, fast_poll())
        .await?;
    assert_eq!(build.number, 3);
    assert!(build.building);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wait_for_start_stops_on_auth_failure() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/app/3/api/json"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)?
        .builds()
        .wait_for_start("app", 3u64, fast_poll())
        .await
        .expect_err("expected auth error");
    assert!(err.is_auth_error());
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queue_wait_times_out() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(
        &server,
        "/queue/item/9/api/json",
        ResponseTemplate::new(200).set_body_json(json!({ "id": 9, "why": "blocked" })),
        u64::MAX,
    )
    .await;

    let err = client(&server)?
        .queue()
        .wait_for_executable(
            9u64,
            PollOptions::default()
                .interval(Duration::from_millis(20))
                .timeout(Duration::from_millis(200)),
        )
        .await
        .expect_err("expected timeout");

    assert!(err.is_timeout());
    assert_eq!(err.status(), Some(StatusCode::REQUEST_TIMEOUT));
    assert_eq!(
        err.to_string(),
        "request for url \"unknown\" failed with status \"408\" and error: \"Timeout\""
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_stream_follows_progressive_text() -> Result<()> {
    let server = MockServer::start().await;
    let endpoint = "/job/folder/job/app/5/logText/progressiveText";

    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("start", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("X-Text-Size", "22")
                .append_header("X-More-Data", "true")
                .set_body_string("Started by user admin\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("start", "22"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("X-Text-Size", "40")
                .set_body_string("Finished: SUCCESS\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut text = String::new();
    let offset = client(&server)?
        .builds()
        .log_stream(
            "folder/app",
            5u64,
            LogStreamOptions::default().interval(Duration::from_millis(10)),
        )
        .finish(|chunk| text.push_str(chunk))
        .await?;

    assert_eq!(offset, 40);
    assert_eq!(text, "Started by user admin\nFinished: SUCCESS\n");

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn html_log_follows_progressive_html() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/app/6/logText/progressiveHtml"))
        .and(query_param("start", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("X-Text-Size", "16")
                .set_body_string("<b>Finished</b>\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = BuildLog::new(client(&server)?, "app", 6).html(true);
    let mut stream = LogStream::new(
        source,
        LogStreamOptions::default().interval(Duration::from_millis(10)),
    );

    let chunk = stream.next_chunk().await.expect("expected a chunk")?;
    assert_eq!(chunk, "<b>Finished</b>\n");
    assert!(stream.next_chunk().await.is_none());
    assert_eq!(stream.offset(), 16);

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn log_stream_reports_failure_once_then_ends() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/app/5/logText/progressiveText"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = client(&server)?.builds().log_stream(
        "app",
        5u64,
        LogStreamOptions::default().interval(Duration::from_millis(10)),
    );

    let err = stream
        .next_chunk()
        .await
        .expect("expected an item")
        .expect_err("expected an error");
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(stream.next_chunk().await.is_none());
    assert_eq!(stream.offset(), 0);

    server.verify().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_error_carries_message_and_snippet() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(
        &server,
        "/queue/api/json",
        ResponseTemplate::new(404).set_body_json(json!({
            "message": "queue not found"
        })),
        1,
    )
    .await;

    let err = client(&server)?
        .queue()
        .list(None)
        .await
        .expect_err("expected HTTP error");

    match err {
        Error::NotFound(http) => {
            assert_eq!(http.status, StatusCode::NOT_FOUND);
            assert_eq!(http.message.as_deref(), Some("queue not found"));
            assert!(
                http.body_snippet
                    .as_deref()
                    .unwrap_or_default()
                    .contains("queue not found")
            );
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exists_maps_not_found_to_false() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(
        &server,
        "/job/present/api/json",
        ResponseTemplate::new(200).set_body_json(json!({ "name": "present" })),
        1,
    )
    .await;
    mock_get(&server, "/job/absent/api/json", ResponseTemplate::new(404), 1).await;

    let jobs = client(&server)?.jobs();
    assert!(jobs.exists("present").await?);
    assert!(!jobs.exists("/job/absent/").await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn version_comes_from_x_jenkins_header() -> Result<()> {
    let server = MockServer::start().await;

    mock_get(
        &server,
        "/api/json",
        ResponseTemplate::new(200)
            .append_header("X-Jenkins", "2.462.3")
            .set_body_json(json!({ "mode": "NORMAL" })),
        1,
    )
    .await;

    assert_eq!(
        client(&server)?.version().await?.as_deref(),
        Some("2.462.3")
    );
    Ok(())
}
