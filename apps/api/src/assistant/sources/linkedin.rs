//! LinkedIn discovery via a job tool server speaking JSON-RPC over streamable HTTP.
//!
//! A session is opened with `initialize` + `notifications/initialized` and reused
//! across calls. Tool names from `tools/list` are cached for the process. When
//! the server no longer knows the session, the handshake runs again once and the
//! call is retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::assistant::discovery::{dedup_preserving_order, JobSource, SourceError};
use crate::assistant::query::JobQuery;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";
const SEARCH_TOOL: &str = "search_jobs";
const DEFAULT_KEYWORDS: &str = "Software Engineer";

/// Server-assigned session; stateless servers hand out no id.
#[derive(Debug, Clone, PartialEq)]
struct ToolSession {
    id: Option<String>,
}

pub struct LinkedInToolSource {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
    session: Mutex<Option<ToolSession>>,
    tools: OnceCell<Vec<String>>,
}

impl LinkedInToolSource {
    pub fn new(endpoint: String) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(90)).build()?,
            endpoint,
            next_id: AtomicU64::new(1),
            session: Mutex::new(None),
            tools: OnceCell::new(),
        })
    }

    /// Current session, opening one if there is none.
    async fn session(&self) -> Result<ToolSession, SourceError> {
        let mut current = self.session.lock().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }
        let session = self.open_session().await?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// Forgets `stale` unless another call already replaced it.
    async fn drop_session(&self, stale: &ToolSession) {
        let mut current = self.session.lock().await;
        if current.as_ref() == Some(stale) {
            *current = None;
        }
    }

    async fn open_session(&self) -> Result<ToolSession, SourceError> {
        info!("Initializing job tool session at {}", self.endpoint);

        let init = self
            .post(
                None,
                &self.request(
                    "initialize",
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "clientInfo": {
                            "name": env!("CARGO_PKG_NAME"),
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                ),
            )
            .await?;
        let id = init
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        read_rpc_result(init).await?;

        self.post(
            id.as_deref(),
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await?;

        debug!("Job tool session opened: {:?}", id);
        Ok(ToolSession { id })
    }

    async fn list_tools(&self, session: &ToolSession) -> Result<Vec<String>, SourceError> {
        let listed = self
            .post(session.id.as_deref(), &self.request("tools/list", json!({})))
            .await?;
        let tools = tool_names(&read_rpc_result(listed).await?);
        info!("Job tools loaded: {:?}", tools);
        Ok(tools)
    }

    /// One search attempt within `session`. `None` when the server has no search tool.
    async fn search(
        &self,
        session: &ToolSession,
        arguments: &Value,
    ) -> Result<Option<Value>, SourceError> {
        let tools = self
            .tools
            .get_or_try_init(|| self.list_tools(session))
            .await?;
        if !tools.iter().any(|t| t == SEARCH_TOOL) {
            warn!("Job tool '{SEARCH_TOOL}' not offered by server (tools: {:?})", tools);
            return Ok(None);
        }

        let response = self
            .post(
                session.id.as_deref(),
                &self.request(
                    "tools/call",
                    json!({"name": SEARCH_TOOL, "arguments": arguments}),
                ),
            )
            .await?;
        Ok(Some(read_rpc_result(response).await?))
    }

    fn request(&self, method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params
        })
    }

    async fn post(
        &self,
        session_id: Option<&str>,
        body: &Value,
    ) -> Result<reqwest::Response, SourceError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(id) = session_id {
            request = request.header(SESSION_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

/// 404, or a 400 naming the session, means the server dropped our session.
fn is_session_lost(error: &SourceError) -> bool {
    match error {
        SourceError::Api { status: 404, .. } => true,
        SourceError::Api {
            status: 400,
            message,
        } => message.to_lowercase().contains("session"),
        _ => false,
    }
}

#[async_trait]
impl JobSource for LinkedInToolSource {
    fn name(&self) -> &'static str {
        "linkedin"
    }

    async fn discover(&self, query: &JobQuery, share: u32) -> Result<Vec<String>, SourceError> {
        let arguments = json!({
            "keywords": query.keywords_or(DEFAULT_KEYWORDS),
            "location": query.location_or_default(),
            "limit": share
        });
        debug!("Calling {SEARCH_TOOL} with {arguments}");

        let session = self.session().await?;
        let result = match self.search(&session, &arguments).await {
            Err(e) if is_session_lost(&e) => {
                warn!("Job tool session expired ({e}), re-initializing");
                self.drop_session(&session).await;
                let session = self.session().await?;
                self.search(&session, &arguments).await?
            }
            other => other?,
        };
        let Some(result) = result else {
            return Ok(Vec::new());
        };

        let payload = normalize_tool_result(&result)?;
        let urls = dedup_preserving_order(job_urls(&payload));
        info!("LinkedIn returned {} job URLs", urls.len());
        Ok(urls)
    }
}

async fn read_rpc_result(response: reqwest::Response) -> Result<Value, SourceError> {
    let body = response.text().await?;
    parse_rpc_body(&body)
}

/// Extracts the JSON-RPC `result` from a plain JSON body or from the first
/// `data:` frame of an event-stream body.
fn parse_rpc_body(body: &str) -> Result<Value, SourceError> {
    let trimmed = body.trim();
    let message: Value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
            .find(|msg| msg.get("result").is_some() || msg.get("error").is_some())
            .ok_or_else(|| SourceError::Protocol("no JSON-RPC message in response".to_string()))?
    };

    if let Some(error) = message.get("error") {
        let text = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::Protocol(text.to_string()));
    }

    message
        .get("result")
        .cloned()
        .ok_or_else(|| SourceError::Protocol("response has no result".to_string()))
}

fn tool_names(list_result: &Value) -> Vec<String> {
    list_result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Turns a tool call result into JSON: the first text block is parsed as JSON,
/// or wrapped as `{"raw_text": ...}` when it is not JSON.
fn normalize_tool_result(result: &Value) -> Result<Value, SourceError> {
    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(SourceError::Protocol(format!("tool reported error: {result}")));
    }

    if let Some(structured) = result.get("structuredContent") {
        return Ok(structured.clone());
    }

    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|b| b.get("text").and_then(Value::as_str))
        });

    Ok(match text {
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| json!({"raw_text": text})),
        None => result.clone(),
    })
}

fn job_urls(payload: &Value) -> Vec<String> {
    payload
        .get("job_urls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex as StdMutex};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };

    use super::*;

    #[derive(Default)]
    struct ToolServerState {
        tools: Vec<&'static str>,
        live_sessions: HashSet<String>,
        opened: u32,
        /// (method, session header) per request, in arrival order.
        log: Vec<(String, Option<String>)>,
        calls: Vec<Value>,
    }

    /// Stateful job tool server: hands out session ids and rejects unknown ones.
    #[derive(Clone, Default)]
    struct FakeToolServer {
        state: Arc<StdMutex<ToolServerState>>,
    }

    impl FakeToolServer {
        fn expire_sessions(&self) {
            self.state.lock().unwrap().live_sessions.clear();
        }

        fn log(&self) -> Vec<(String, Option<String>)> {
            self.state.lock().unwrap().log.clone()
        }

        fn count(&self, method: &str) -> usize {
            self.log().iter().filter(|(m, _)| m == method).count()
        }
    }

    async fn rpc(
        State(fake): State<FakeToolServer>,
        headers: HeaderMap,
        Json(message): Json<Value>,
    ) -> Response {
        let method = message["method"].as_str().unwrap_or_default().to_string();
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut state = fake.state.lock().unwrap();
        state.log.push((method.clone(), session.clone()));

        if method == "initialize" {
            state.opened += 1;
            let id = format!("session-{}", state.opened);
            state.live_sessions.insert(id.clone());
            let reply = json!({
                "jsonrpc": "2.0",
                "id": message["id"],
                "result": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "jobs", "version": "1.0"}
                }
            });
            return ([(SESSION_HEADER, id)], Json(reply)).into_response();
        }

        let known = session.map_or(false, |id| state.live_sessions.contains(&id));
        if !known {
            return (StatusCode::NOT_FOUND, "Session not found").into_response();
        }

        match method.as_str() {
            "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
            "tools/list" => {
                let tools: Vec<Value> = state
                    .tools
                    .iter()
                    .map(|name| json!({"name": name, "inputSchema": {"type": "object"}}))
                    .collect();
                Json(json!({"jsonrpc": "2.0", "id": message["id"], "result": {"tools": tools}}))
                    .into_response()
            }
            "tools/call" => {
                state.calls.push(message["params"].clone());
                let text = json!({"job_urls": [
                    "https://www.linkedin.com/jobs/view/1",
                    "https://www.linkedin.com/jobs/view/1",
                    "https://www.linkedin.com/jobs/view/2"
                ]})
                .to_string();
                let frame = json!({
                    "jsonrpc": "2.0",
                    "id": message["id"],
                    "result": {"content": [{"type": "text", "text": text}], "isError": false}
                });
                (
                    [(header::CONTENT_TYPE.as_str(), "text/event-stream")],
                    format!("event: message\ndata: {frame}\n\n"),
                )
                    .into_response()
            }
            _ => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    async fn tool_server(tools: &[&'static str]) -> (LinkedInToolSource, FakeToolServer) {
        let fake = FakeToolServer::default();
        fake.state.lock().unwrap().tools = tools.to_vec();

        let app = Router::new().route("/mcp", post(rpc)).with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let source = LinkedInToolSource::new(format!("http://{addr}/mcp")).unwrap();
        (source, fake)
    }

    fn entry(method: &str, session: Option<&str>) -> (String, Option<String>) {
        (method.to_string(), session.map(str::to_string))
    }

    #[tokio::test]
    async fn test_discover_runs_handshake_then_calls_search_tool() {
        let (source, fake) = tool_server(&["search_jobs", "get_job_details"]).await;

        let urls = source.discover(&JobQuery::default_for(5), 3).await.unwrap();

        assert_eq!(
            urls,
            vec!["https://www.linkedin.com/jobs/view/1", "https://www.linkedin.com/jobs/view/2"]
        );
        assert_eq!(
            fake.log(),
            vec![
                entry("initialize", None),
                entry("notifications/initialized", Some("session-1")),
                entry("tools/list", Some("session-1")),
                entry("tools/call", Some("session-1")),
            ]
        );
        assert_eq!(
            fake.state.lock().unwrap().calls[0],
            json!({
                "name": "search_jobs",
                "arguments": {"keywords": "Software Engineer", "location": "India", "limit": 3}
            })
        );
    }

    #[tokio::test]
    async fn test_live_session_is_reused() {
        let (source, fake) = tool_server(&["search_jobs"]).await;

        source.discover(&JobQuery::default_for(5), 3).await.unwrap();
        source.discover(&JobQuery::default_for(5), 3).await.unwrap();

        assert_eq!(fake.count("initialize"), 1);
        assert_eq!(fake.count("tools/list"), 1);
        assert_eq!(fake.count("tools/call"), 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_reopened_and_call_retried() {
        let (source, fake) = tool_server(&["search_jobs"]).await;
        source.discover(&JobQuery::default_for(5), 3).await.unwrap();

        fake.expire_sessions();
        let urls = source.discover(&JobQuery::default_for(5), 3).await.unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(
            fake.log()[4..].to_vec(),
            vec![
                entry("tools/call", Some("session-1")),
                entry("initialize", None),
                entry("notifications/initialized", Some("session-2")),
                entry("tools/call", Some("session-2")),
            ]
        );
        assert_eq!(fake.count("tools/list"), 1);

        // later calls stay on the new session
        source.discover(&JobQuery::default_for(5), 3).await.unwrap();
        assert_eq!(fake.log().last(), Some(&entry("tools/call", Some("session-2"))));
    }

    #[tokio::test]
    async fn test_missing_search_tool_yields_no_urls() {
        let (source, fake) = tool_server(&["get_job_details"]).await;

        let urls = source.discover(&JobQuery::default_for(5), 3).await.unwrap();

        assert!(urls.is_empty());
        assert_eq!(fake.count("tools/call"), 0);
    }

    #[test]
    fn test_session_loss_detection() {
        let lost = SourceError::Api {
            status: 404,
            message: "Session not found".to_string(),
        };
        let bad_session = SourceError::Api {
            status: 400,
            message: "Bad Request: No valid session ID provided".to_string(),
        };
        let other = SourceError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(is_session_lost(&lost));
        assert!(is_session_lost(&bad_session));
        assert!(!is_session_lost(&other));
    }

    #[test]
    fn test_parse_plain_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[{"name":"search_jobs"}]}}"#;
        let result = parse_rpc_body(body).unwrap();
        assert_eq!(tool_names(&result), vec!["search_jobs"]);
    }

    #[test]
    fn test_parse_event_stream_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"ok\":true}}\n\n";
        let result = parse_rpc_body(body).unwrap();
        assert_eq!(result["ok"], json!(true));
    }

    #[test]
    fn test_rpc_error_is_reported() {
        let body = r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Method not found"}}"#;
        let err = parse_rpc_body(body).unwrap_err();
        assert!(err.to_string().contains("Method not found"));
    }

    #[test]
    fn test_text_block_json_is_parsed() {
        let result = json!({
            "content": [{"type": "text", "text": "{\"job_urls\": [\"https://linkedin.com/jobs/view/1\", \"https://linkedin.com/jobs/view/1\"]}"}]
        });
        let payload = normalize_tool_result(&result).unwrap();
        assert_eq!(
            dedup_preserving_order(job_urls(&payload)),
            vec!["https://linkedin.com/jobs/view/1"]
        );
    }

    #[test]
    fn test_non_json_text_block_is_wrapped() {
        let result = json!({"content": [{"type": "text", "text": "login required"}]});
        let payload = normalize_tool_result(&result).unwrap();
        assert_eq!(payload["raw_text"], json!("login required"));
        assert!(job_urls(&payload).is_empty());
    }

    #[test]
    fn test_tool_error_flag_is_an_error() {
        let result = json!({"isError": true, "content": [{"type": "text", "text": "cookie expired"}]});
        assert!(normalize_tool_result(&result).is_err());
    }
}
