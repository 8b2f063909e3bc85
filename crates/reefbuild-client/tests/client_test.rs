use futures_util::StreamExt;
use reefbuild_client::{ClientError, ClientOptions, FleetClient, NewApplication};
use wiremock::matchers::{body_json_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// "admin:secret" in basic-auth form
const AUTH: &str = "Basic YWRtaW46c2VjcmV0";

async fn client_for(server: &MockServer) -> FleetClient {
    FleetClient::new(&server.uri(), "admin", "secret", ClientOptions::default()).unwrap()
}

#[tokio::test]
async fn labels_query_carries_filters_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/label/"))
        .and(query_param("name", "macos-builder"))
        .and(query_param("version", "last"))
        .and(header("authorization", AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "UID": "lbl-1",
                "name": "macos-builder",
                "version": 3,
                "definitions": [
                    {"driver": "vmx", "resources": {"cpu": 4, "ram": 8}}
                ]
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let labels = client.get_labels("macos-builder", Some("last")).await.unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].version, 3);
    assert_eq!(labels[0].definitions[0].driver, "vmx");
}

#[tokio::test]
async fn create_application_posts_label_reference() {
    let server = MockServer::start().await;
    let expected = serde_json::json!({
        "label_UID": "lbl-1",
        "metadata": {"team": "ci"}
    });
    Mock::given(method("POST"))
        .and(path("/api/v1/application/"))
        .and(header("authorization", AUTH))
        .and(body_json_string(expected.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "UID": "app-1",
            "label_UID": "lbl-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let app = client
        .create_application(&NewApplication {
            label_uid: "lbl-1".to_string(),
            metadata: [("team".to_string(), "ci".into())].into_iter().collect(),
        })
        .await
        .unwrap();
    assert_eq!(app.uid, "app-1");
}

#[tokio::test]
async fn missing_resource_and_access_are_not_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/application/app-1/resource"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/applicationresource/res-1/access"))
        .and(query_param("one_time", "false"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.get_application_resource("app-1").await.unwrap().is_none());
    assert!(client.get_resource_access("res-1").await.unwrap().is_none());
}

#[tokio::test]
async fn non_success_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/application/app-1/state"))
        .respond_with(ResponseTemplate::new(503).set_body_string("node draining"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_application_state("app-1").await.unwrap_err();
    match err {
        ClientError::Api { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "node draining");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_current_user().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn subscription_yields_newline_delimited_events() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"type":"application_state","data":{"status":"ALLOCATED"}}"#,
        "\n",
        r#"{"type":"application_task","data":{}}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/v1/subscribe"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let stream = client
        .subscribe(&["application_state", "application_task"])
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, "application_state");
    assert_eq!(events[1].kind, "application_task");
}

#[tokio::test]
async fn deallocate_hits_the_deallocate_endpoint_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/application/app-1/deallocate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.deallocate_application("app-1").await.unwrap();
}
