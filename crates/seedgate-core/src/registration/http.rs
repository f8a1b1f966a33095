//! Registrar that posts the draft to a remote HTTP endpoint

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{RegisteredAccount, Registrar, RegistrationRequest, RegistrationResponse};
use crate::error::{ProvisionError, ProvisionResult};

/// JSON-over-HTTP registrar.
#[derive(Debug, Clone)]
pub struct HttpRegistrar {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistrar {
    /// Create a registrar for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> ProvisionResult<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProvisionError::Config(format!(
                "registration url must be http(s): {url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("seedgate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }

    /// Endpoint this registrar posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Statuses that say nothing final about the request itself
fn is_transient(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

impl Registrar for HttpRegistrar {
    async fn register(&self, request: &RegistrationRequest) -> ProvisionResult<RegisteredAccount> {
        debug!(url = %self.url, public_id = %request.public_id, "Posting registration");

        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.json::<RegistrationResponse>().await;

        if is_transient(status) || (!status.is_success() && !status.is_client_error()) {
            warn!(%status, "Registration endpoint unavailable");
            let reason = body.ok().and_then(|b| b.error);
            return Err(ProvisionError::Network(match reason {
                Some(reason) => format!("registration endpoint returned HTTP {status}: {reason}"),
                None => format!("registration endpoint returned HTTP {status}"),
            }));
        }

        let account = match body {
            Ok(body) if status.is_success() => body.into_result()?,
            Ok(body) => {
                return Err(ProvisionError::RegistrationRejected(
                    body.error.unwrap_or_else(|| format!("HTTP {status}")),
                ))
            }
            Err(e) if status.is_success() => {
                return Err(ProvisionError::Network(format!(
                    "unreadable registration response: {e}"
                )))
            }
            Err(_) => return Err(ProvisionError::RegistrationRejected(format!("HTTP {status}"))),
        };
        info!(user_id = %account.user_id, "Account registered");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::MnemonicEncoder;
    use crate::pow::ProofOfWorkResult;
    use crate::provision::{AgentConfig, ProfileVisibility};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            public_id: "pk_test".into(),
            public_key: "00".into(),
            signing_key: "11".into(),
            seed_phrase: MnemonicEncoder::embedded().unwrap().encode(&[1u8; 16]),
            proof_of_work: ProofOfWorkResult {
                nonce: 5,
                hash: "0".repeat(64),
                timestamp: 1_700_000_000_000,
                difficulty: 1,
            },
            profile_type: ProfileVisibility::Anonymous,
            agent_config: AgentConfig::default(),
            signature: "22".into(),
        }
    }

    /// Answer one request with `status` and `body`; yields the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/register", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length || n == 0 {
                        break;
                    }
                } else if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&received).to_string()
        });
        (url, handle)
    }

    async fn register_against(
        status: &'static str,
        body: &'static str,
    ) -> (ProvisionResult<RegisteredAccount>, String) {
        let (url, server) = serve_once(status, body).await;
        let registrar = HttpRegistrar::new(url, Duration::from_secs(5)).unwrap();
        let result = registrar.register(&request()).await;
        (result, server.await.unwrap())
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = HttpRegistrar::new("ftp://example.com", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn test_accepts_https_url() {
        let registrar =
            HttpRegistrar::new("https://example.com/api/register", Duration::from_secs(5))
                .unwrap();
        assert_eq!(registrar.url(), "https://example.com/api/register");
    }

    #[tokio::test]
    async fn test_success_returns_account() {
        let (result, raw) = register_against(
            "200 OK",
            r#"{"success":true,"user":{"userId":"u1","publicKeyHash":"h","accountStatus":"active","ledgerBlockId":"blk_7"}}"#,
        )
        .await;
        let account = result.unwrap();
        assert_eq!(account.user_id, "u1");
        assert_eq!(account.ledger_block_id, "blk_7");

        assert!(raw.starts_with("POST /register"));
        assert!(raw.contains(r#""publicId":"pk_test""#));
        assert!(raw.contains(r#""signingKey":"11""#));
    }

    #[tokio::test]
    async fn test_success_false_is_rejection() {
        let (result, _) =
            register_against("200 OK", r#"{"success":false,"error":"duplicate public id"}"#).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ProvisionError::RegistrationRejected(ref r) if r == "duplicate public id"));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_service_unavailable_with_json_is_network_error() {
        let (result, _) = register_against(
            "503 Service Unavailable",
            r#"{"success":false,"error":"service overloaded"}"#,
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ProvisionError::Network(_)), "got {err:?}");
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("service overloaded"));
    }

    #[tokio::test]
    async fn test_service_unavailable_with_garbage_is_network_error() {
        let (result, _) = register_against("503 Service Unavailable", "<html>busy</html>").await;
        assert!(matches!(result.unwrap_err(), ProvisionError::Network(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_is_network_error() {
        let (result, _) = register_against("429 Too Many Requests", "{}").await;
        assert!(matches!(result.unwrap_err(), ProvisionError::Network(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_rejection() {
        let (result, _) = register_against(
            "400 Bad Request",
            r#"{"success":false,"error":"proof-of-work too weak"}"#,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            ProvisionError::RegistrationRejected(ref r) if r == "proof-of-work too weak"
        ));
    }

    #[tokio::test]
    async fn test_unreadable_success_body_is_network_error() {
        let (result, _) = register_against("200 OK", "not json").await;
        assert!(matches!(result.unwrap_err(), ProvisionError::Network(_)));
    }
}
