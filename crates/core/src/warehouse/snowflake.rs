//! Snowflake SQL API (v2) client.
//!
//! Statements are submitted with `POST /api/v2/statements`. A `202` means
//! the statement is still running; its status URL is polled until it
//! returns `200` or an error.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::WarehouseConfig;

use super::{StatementOutcome, Warehouse, WarehouseError};

/// Snowflake implementation of `Warehouse`.
pub struct SnowflakeClient {
    client: Client,
    base_url: String,
    config: WarehouseConfig,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    data: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Debug)]
enum Poll {
    Done(StatementOutcome),
    Pending { handle: String, status_url: String },
}

impl SnowflakeClient {
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: config.account_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.config.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.config.token_type)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn interpret(response: Response) -> Result<Poll, WarehouseError> {
        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<StatementResponse> = serde_json::from_str(&body).ok();

        match status {
            StatusCode::OK => {
                let parsed = parsed.ok_or_else(|| {
                    WarehouseError::Parse(body.chars().take(200).collect())
                })?;
                Ok(Poll::Done(StatementOutcome {
                    handle: parsed.statement_handle.unwrap_or_default(),
                    message: parsed.message.unwrap_or_default(),
                    rows: parsed.data.unwrap_or_default(),
                }))
            }
            StatusCode::ACCEPTED => {
                let parsed = parsed.ok_or_else(|| {
                    WarehouseError::Parse(body.chars().take(200).collect())
                })?;
                let handle = parsed.statement_handle.unwrap_or_default();
                let status_url = parsed
                    .statement_status_url
                    .unwrap_or_else(|| format!("/api/v2/statements/{}", handle));
                Ok(Poll::Pending { handle, status_url })
            }
            _ => Err(match parsed {
                Some(p) => WarehouseError::Api {
                    status: status.as_u16(),
                    code: p.code.unwrap_or_default(),
                    message: p.message.unwrap_or_default(),
                },
                None => WarehouseError::Api {
                    status: status.as_u16(),
                    code: String::new(),
                    message: body.chars().take(200).collect(),
                },
            }),
        }
    }
}

#[async_trait]
impl Warehouse for SnowflakeClient {
    fn name(&self) -> &str {
        "snowflake"
    }

    async fn execute(&self, sql: &str) -> Result<StatementOutcome, WarehouseError> {
        let body = StatementRequest {
            statement: sql,
            timeout: self.config.statement_timeout_secs,
            database: self.config.database.as_deref(),
            schema: self.config.schema.as_deref(),
            warehouse: self.config.warehouse.as_deref(),
            role: self.config.role.as_deref(),
        };

        debug!(statement = sql, "Submitting statement");
        let response = self
            .request(self.client.post(format!("{}/api/v2/statements", self.base_url)))
            .json(&body)
            .send()
            .await?;

        let deadline = Instant::now() + Duration::from_secs(self.config.statement_timeout_secs);
        let poll_interval = Duration::from_millis(self.config.status_poll_interval_ms);
        let mut poll = Self::interpret(response).await?;

        loop {
            match poll {
                Poll::Done(outcome) => {
                    info!(handle = %outcome.handle, "Statement finished");
                    return Ok(outcome);
                }
                Poll::Pending { handle, status_url } => {
                    if Instant::now() >= deadline {
                        return Err(WarehouseError::Timeout {
                            handle,
                            secs: self.config.statement_timeout_secs,
                        });
                    }
                    debug!(handle = %handle, "Statement still running");
                    sleep(poll_interval).await;

                    let response = self
                        .request(self.client.get(format!("{}{}", self.base_url, status_url)))
                        .send()
                        .await?;
                    poll = Self::interpret(response).await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_skips_unset_context() {
        let body = StatementRequest {
            statement: "TRUNCATE TABLE dim_coaches;",
            timeout: 300,
            database: Some("NBA"),
            schema: None,
            warehouse: None,
            role: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statement"], "TRUNCATE TABLE dim_coaches;");
        assert_eq!(json["database"], "NBA");
        assert!(json.get("schema").is_none());
    }

    #[test]
    fn test_parse_async_response() {
        let json = r#"{
            "code": "333334",
            "message": "Asynchronous execution in progress.",
            "statementHandle": "01b2-abc",
            "statementStatusUrl": "/api/v2/statements/01b2-abc"
        }"#;
        let parsed: StatementResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.statement_handle.as_deref(), Some("01b2-abc"));
        assert_eq!(
            parsed.statement_status_url.as_deref(),
            Some("/api/v2/statements/01b2-abc")
        );
    }

    #[test]
    fn test_trims_account_url() {
        let client = SnowflakeClient::new(WarehouseConfig {
            account_url: "https://acme.snowflakecomputing.com/".to_string(),
            ..WarehouseConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "https://acme.snowflakecomputing.com");
        assert_eq!(client.name(), "snowflake");
    }

    fn response(status: u16, body: &str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_interpret_finished_statement() {
        let poll = SnowflakeClient::interpret(response(
            200,
            r#"{
                "code": "090001",
                "message": "Statement executed successfully.",
                "statementHandle": "01b2-done",
                "data": [["4", null]]
            }"#,
        ))
        .await
        .unwrap();

        match poll {
            Poll::Done(outcome) => {
                assert_eq!(outcome.handle, "01b2-done");
                assert_eq!(outcome.message, "Statement executed successfully.");
                assert_eq!(outcome.rows, vec![vec![Some("4".to_string()), None]]);
            }
            other => panic!("unexpected poll: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interpret_running_statement_uses_status_url() {
        let poll = SnowflakeClient::interpret(response(
            202,
            r#"{"statementHandle": "01b2-abc", "statementStatusUrl": "/api/v2/statements/01b2-abc?requestId=7"}"#,
        ))
        .await
        .unwrap();

        match poll {
            Poll::Pending { handle, status_url } => {
                assert_eq!(handle, "01b2-abc");
                assert_eq!(status_url, "/api/v2/statements/01b2-abc?requestId=7");
            }
            other => panic!("unexpected poll: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interpret_running_statement_without_status_url() {
        let poll = SnowflakeClient::interpret(response(202, r#"{"statementHandle": "01b2-abc"}"#))
            .await
            .unwrap();

        match poll {
            Poll::Pending { status_url, .. } => {
                assert_eq!(status_url, "/api/v2/statements/01b2-abc")
            }
            other => panic!("unexpected poll: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interpret_api_error_body() {
        let err = SnowflakeClient::interpret(response(
            422,
            r#"{"code": "002003", "message": "Table 'DIM_COACHES' does not exist."}"#,
        ))
        .await
        .unwrap_err();

        match err {
            WarehouseError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 422);
                assert_eq!(code, "002003");
                assert!(message.contains("DIM_COACHES"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interpret_non_json_error_body() {
        let err = SnowflakeClient::interpret(response(500, "<html>Bad Gateway</html>"))
            .await
            .unwrap_err();

        match err {
            WarehouseError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert!(code.is_empty());
                assert_eq!(message, "<html>Bad Gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_interpret_unparseable_success_body() {
        let err = SnowflakeClient::interpret(response(200, "not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, WarehouseError::Parse(ref body) if body == "not json"));
    }

    /// Serve one canned HTTP response per connection.
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                // Read headers and the announced body before answering
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&request).to_lowercase();
                    if let Some(end) = text.find("\r\n\r\n") {
                        let length = text[..end]
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if request.len() >= end + 4 + length {
                            break;
                        }
                    }
                }

                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_execute_times_out_on_running_statement() {
        let url = serve(
            "202 Accepted",
            r#"{"statementHandle": "01b2-slow", "statementStatusUrl": "/api/v2/statements/01b2-slow"}"#,
        )
        .await;
        let client = SnowflakeClient::new(WarehouseConfig {
            account_url: url,
            statement_timeout_secs: 0,
            ..WarehouseConfig::default()
        })
        .unwrap();

        let err = client.execute("SELECT 1;").await.unwrap_err();
        match err {
            WarehouseError::Timeout { handle, secs } => {
                assert_eq!(handle, "01b2-slow");
                assert_eq!(secs, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_returns_finished_statement() {
        let url = serve(
            "200 OK",
            r#"{"statementHandle": "01b2-fast", "message": "Statement executed successfully."}"#,
        )
        .await;
        let client = SnowflakeClient::new(WarehouseConfig {
            account_url: url,
            ..WarehouseConfig::default()
        })
        .unwrap();

        let outcome = client.execute("TRUNCATE TABLE dim_coaches;").await.unwrap();
        assert_eq!(outcome.handle, "01b2-fast");
    }
}
