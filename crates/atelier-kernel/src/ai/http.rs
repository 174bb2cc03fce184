//! HTTP backend: POSTs the request as JSON and reads the envelope back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::client::{CodeGenerator, GenerateError, GenerateRequest, GenerateResponse};
use crate::patch::CodePatch;

/// Generation service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Create a client for `endpoint`, optionally authenticating with a
    /// bearer token.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("atelier/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl CodeGenerator for HttpGenerator {
    #[tracing::instrument(skip(self, request), fields(endpoint = %self.endpoint, files = request.files.len()))]
    async fn generate(&self, request: &GenerateRequest) -> Result<CodePatch, GenerateError> {
        let mut call = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call
            .send()
            .await
            .map_err(|e| GenerateError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerateError::Transport(e.to_string()))?;
        debug!(%status, bytes = body.len(), "generation response");

        match serde_json::from_str::<GenerateResponse>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(GenerateError::Service(format!(
                "service returned {status}"
            ))),
            Err(e) => Err(GenerateError::Malformed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single request with `status` and `body`; yields the raw request.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/generate", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (url, handle)
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            prompt: "add a button".into(),
            files: vec![crate::vfs::File::new("src/App.tsx", "app")],
            active_file_path: Some("src/App.tsx".into()),
        }
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let body = serde_json::to_string(&GenerateResponse::ok(
            CodePatch::new("plan").write("a.ts", "a"),
        ))
        .unwrap();
        let (url, server) = serve_once("200 OK", body).await;

        let generator = HttpGenerator::new(url, Some("secret".into())).unwrap();
        let patch = generator.generate(&request()).await.unwrap();
        assert_eq!(patch, CodePatch::new("plan").write("a.ts", "a"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /generate"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(raw.contains(r#""activeFilePath":"src/App.tsx""#));
    }

    #[tokio::test]
    async fn test_failure_envelope() {
        let body = serde_json::to_string(&GenerateResponse::err("quota exceeded")).unwrap();
        let (url, _server) = serve_once("200 OK", body).await;
        let generator = HttpGenerator::new(url, None).unwrap();
        assert_eq!(
            generator.generate(&request()).await,
            Err(GenerateError::Service("quota exceeded".into()))
        );
    }

    #[tokio::test]
    async fn test_error_status_without_envelope() {
        let (url, _server) = serve_once("502 Bad Gateway", "upstream down".into()).await;
        let generator = HttpGenerator::new(url, None).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerateError::Service("service returned 502 Bad Gateway".into()));
    }

    #[tokio::test]
    async fn test_garbage_body() {
        let (url, _server) = serve_once("200 OK", "<html>".into()).await;
        let generator = HttpGenerator::new(url, None).unwrap();
        assert!(matches!(
            generator.generate(&request()).await,
            Err(GenerateError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/generate", listener.local_addr().unwrap());
        drop(listener);
        let generator = HttpGenerator::new(url, None).unwrap();
        assert!(matches!(
            generator.generate(&request()).await,
            Err(GenerateError::Transport(_))
        ));
    }
}
