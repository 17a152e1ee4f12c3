//! Contract tests for the reqwest-backed transport and the adapters'
//! native wire shapes, against a local mock HTTP server.

use std::time::Duration;

use federated_search::transport::JSON_CONTENT_TYPE;
use federated_search::{
    Aggregator, HttpTransport, Provider, SearchConfig, SearchError, SearchRequest, SearchSession, Transport,
    TransportRequest,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SearchConfig {
    SearchConfig {
        primary_url: format!("{}/api/search-wrapper", server.uri()),
        secondary_url: format!("{}/secondary", server.uri()),
        timeout_seconds: 2,
        ..Default::default()
    }
}

// ── Transport ─────────────────────────────────────────────────────

#[tokio::test]
async fn posts_json_and_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("content-type", JSON_CONTENT_TYPE))
        .and(body_partial_json(json!({"query": "שלום"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).expect("transport");
    let request = TransportRequest::post_json(format!("{}/echo", server.uri()), json!({"query": "שלום"}).to_string());
    let value = transport.send(request).await.expect("send");
    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).expect("transport");
    let err = transport
        .send(TransportRequest::post_json(server.uri(), "{}".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).expect("transport");
    let err = transport
        .send(TransportRequest::post_json(server.uri(), "{}".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn per_request_timeout_applies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config_for(&server)).expect("transport");
    let request = TransportRequest::post_json(server.uri(), "{}".into()).with_timeout(Duration::from_millis(50));
    let err = transport.send(request).await.unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)), "got {err:?}");
}

// ── End to end over HTTP ──────────────────────────────────────────

#[tokio::test]
async fn federated_query_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/search-wrapper"))
        .and(body_partial_json(json!({"type": "text", "slop": 10, "source_proj": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"total": 1, "hits": [
                {"_id": "Berakhot 2a (William Davidson Edition [en])", "_score": 4.0,
                 "_source": {"ref": "Berakhot 2a", "categories": ["Talmud", "Bavli"], "comp_date": 500}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/secondary/search"))
        .and(body_partial_json(json!({"smallUnitsOnly": true, "limitedToBooks": false, "from": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "hits": [{"xmlId": "Tanakh.Torah.Genesis.1.1", "hebrewPath": "בראשית א:א", "pagerank": 0.9,
                      "highlight": [{"text": "<b>בראשית</b>"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/secondary/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"englishBookName": ["Tanakh", "Torah", "Genesis"], "count": 1}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let aggregator = Aggregator::new(HttpTransport::new(&config_for(&server)).expect("transport"), config_for(&server))
        .expect("aggregator");
    let mut session = SearchSession::new();
    let response = aggregator
        .execute(&mut session, &SearchRequest::text("בראשית", 10))
        .await
        .expect("execute")
        .expect("response");

    let result = response.as_text().expect("text result");
    assert_eq!(result.hits.total, 2);
    assert_eq!(result.hits.hits.len(), 2);
    let secondary = result
        .hits
        .hits
        .iter()
        .find(|h| h.came_from == Provider::Secondary)
        .expect("secondary hit");
    assert_eq!(secondary.source.reference, "Genesis 1:1");
    assert_eq!(secondary.source.localized_ref.as_deref(), Some("בראשית א:א"));

    let json = response.to_value().expect("json");
    assert_eq!(json["hits"]["total"], 2);
    assert!(json["hits"]["hits"][0].get("cameFrom").is_some());
}
