// tests/api_clients.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use airdev::api::{
    ApiAuth, EvaluateTemplateRequest, GetConfigRequest, HttpApiClient, ListConfigsRequest,
    OfflineApiClient, RemoteApi,
};
use airdev::errors::AirdevError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Serve a single HTTP response and hand back the raw request.
async fn serve_once(status: &str, body: &str) -> std::io::Result<(String, JoinHandle<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let host = format!("http://{}", listener.local_addr()?);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&raw).to_string()
    });

    Ok((host, handle))
}

#[test]
fn host_gets_a_scheme_and_loses_trailing_slashes() {
    let client = HttpApiClient::new("api.example.com/", ApiAuth::Token("t".into()));
    assert_eq!(client.host(), "https://api.example.com");

    let local = HttpApiClient::new("http://127.0.0.1:4000", ApiAuth::Token("t".into()));
    assert_eq!(local.host(), "http://127.0.0.1:4000");
}

#[tokio::test]
async fn evaluate_template_posts_with_token_auth() -> TestResult {
    init_tracing();
    let (host, server) = serve_once("200 OK", r#"{"value":{"greeting":"hi Ada"}}"#).await?;
    let client = HttpApiClient::new(host, ApiAuth::Token("tok123".into()))
        .with_tunnel_token(Some("dev-token".into()));

    let res = with_timeout(client.evaluate_template(EvaluateTemplateRequest {
        value: json!({"greeting": "hi {{params.name}}"}),
        run_id: "run1".into(),
        ..EvaluateTemplateRequest::default()
    }))
    .await?;
    assert_eq!(res.value, json!({"greeting": "hi Ada"}));

    let request = with_timeout(server).await?;
    let lower = request.to_lowercase();
    assert!(request.starts_with("POST /v0/templates/evaluate "), "{request}");
    assert!(lower.contains("x-airplane-token: tok123"));
    assert!(lower.contains("x-airplane-dev-token: dev-token"));
    assert!(request.contains(r#""runID":"run1""#));
    Ok(())
}

#[tokio::test]
async fn get_env_uses_api_key_auth() -> TestResult {
    let (host, server) = serve_once(
        "200 OK",
        r#"{"id":"env1","slug":"prod","name":"Production","default":false}"#,
    )
    .await?;
    let client = HttpApiClient::new(
        host,
        ApiAuth::ApiKey {
            key: "key1".into(),
            team_id: "team1".into(),
        },
    );

    let env = with_timeout(client.get_env("prod")).await?;
    assert_eq!(env.id, "env1");
    assert_eq!(env.name, "Production");

    let request = with_timeout(server).await?;
    let lower = request.to_lowercase();
    assert!(request.starts_with("GET /v0/envs/get?slug=prod "), "{request}");
    assert!(lower.contains("x-airplane-api-key: key1"));
    assert!(lower.contains("x-team-id: team1"));
    Ok(())
}

#[tokio::test]
async fn list_configs_posts_the_env_slug() -> TestResult {
    let (host, server) = serve_once(
        "200 OK",
        r#"{"configs":[{"configID":"cfg1","name":"api_key","tag":"","value":"k","isSecret":true}]}"#,
    )
    .await?;
    let client = HttpApiClient::new(host, ApiAuth::Token("t".into()));

    let res = with_timeout(client.list_configs(ListConfigsRequest {
        env_slug: Some("prod".into()),
        ..ListConfigsRequest::default()
    }))
    .await?;
    assert_eq!(res.configs.len(), 1);
    assert_eq!(res.configs[0].id, "cfg1");
    assert!(res.configs[0].is_secret);

    let request = with_timeout(server).await?;
    assert!(request.starts_with("POST /v0/configs/list "), "{request}");
    assert!(request.contains(r#""envSlug":"prod""#), "{request}");
    assert!(request.contains(r#""showSecrets":false"#), "{request}");
    assert!(!request.contains("names"), "{request}");
    Ok(())
}

#[tokio::test]
async fn error_bodies_become_api_errors() -> TestResult {
    let (host, _server) = serve_once("404 Not Found", r#"{"error":"config not found"}"#).await?;
    let client = HttpApiClient::new(host, ApiAuth::Token("t".into()));

    let result = with_timeout(client.get_config(GetConfigRequest {
        name: "missing".into(),
        ..GetConfigRequest::default()
    }))
    .await;

    match result {
        Err(AirdevError::ApiError { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "config not found");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn non_json_error_bodies_are_kept_verbatim() -> TestResult {
    let (host, _server) = serve_once("500 Internal Server Error", "upstream exploded").await?;
    let client = HttpApiClient::new(host, ApiAuth::Token("t".into()));

    match with_timeout(client.get_env("prod")).await {
        Err(AirdevError::ApiError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_host_is_an_http_error() -> TestResult {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").await?.local_addr()?.port();
    let client = HttpApiClient::new(format!("http://127.0.0.1:{port}"), ApiAuth::Token("t".into()));

    let result = with_timeout(client.get_env("prod")).await;
    assert!(matches!(result, Err(AirdevError::HttpError(_))), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn offline_client_passes_templates_through() -> TestResult {
    let client = OfflineApiClient;
    let value = json!({"a": "{{params.x}}", "b": [1, 2]});
    let res = client
        .evaluate_template(EvaluateTemplateRequest {
            value: value.clone(),
            ..EvaluateTemplateRequest::default()
        })
        .await?;
    assert_eq!(res.value, value);

    assert_eq!(client.get_env("studio").await?.slug, "studio");
    assert!(matches!(client.get_env("prod").await, Err(AirdevError::ResolutionError(_))));

    match client
        .get_config(GetConfigRequest {
            name: "db".into(),
            ..GetConfigRequest::default()
        })
        .await
    {
        Err(AirdevError::ResolutionError(msg)) => assert!(msg.contains("config db")),
        other => panic!("expected ResolutionError, got {other:?}"),
    }

    let listed = client.list_configs(ListConfigsRequest::default()).await?;
    assert!(listed.configs.is_empty());
    Ok(())
}
