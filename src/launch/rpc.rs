use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DeployError, DeployErrorKind};

/// Session id reported when the daemon's reply doesn't contain one.
pub const SESSION_ID_NOT_FOUND: &str = "not found";

const GET_SESSION_INFO: &str = "aria2.getSessionInfo";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    id: u64,
}

/// Returns the JSON-RPC endpoint of a daemon listening on `port`.
pub fn rpc_endpoint(port: u16) -> String {
    format!("http://localhost:{port}/jsonrpc")
}

/// Asks the daemon for its session id.
///
/// A reply without `result.sessionId` yields [`SESSION_ID_NOT_FOUND`].
/// An unreachable daemon or a reply that isn't JSON is an error of kind
/// [`DeployErrorKind::RpcProbe`].
pub fn probe_session(endpoint: &str, timeout: Duration) -> Result<String, DeployError> {
    tracing::debug!(endpoint, "probing JSON-RPC interface");

    let request = RpcRequest {
        jsonrpc: "2.0",
        method: GET_SESSION_INFO,
        id: 1,
    };

    let reply = reqwest::blocking::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .and_then(|client| client.post(endpoint).json(&request).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json::<Value>())
        .map_err(|error| {
            DeployError::new(DeployErrorKind::RpcProbe)
                .with_context(endpoint)
                .with_source(error)
        })?;

    tracing::trace!(%reply, "JSON-RPC reply");

    Ok(extract_session_id(&reply))
}

fn extract_session_id(reply: &Value) -> String {
    reply
        .pointer("/result/sessionId")
        .and_then(Value::as_str)
        .unwrap_or(SESSION_ID_NOT_FOUND)
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_body() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: GET_SESSION_INFO,
            id: 1,
        };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","method":"aria2.getSessionInfo","id":1}"#
        );
    }

    #[test]
    fn test_extract_session_id() {
        let reply = json!({"id": 1, "jsonrpc": "2.0", "result": {"sessionId": "cd6a3bc6a1de28300bb3b0a4d3d8bf2e"}});
        assert_eq!(extract_session_id(&reply), "cd6a3bc6a1de28300bb3b0a4d3d8bf2e");
    }

    #[test]
    fn test_extract_session_id_missing() {
        assert_eq!(extract_session_id(&json!({"result": {}})), SESSION_ID_NOT_FOUND);
        assert_eq!(extract_session_id(&json!({"error": {"code": 1}})), SESSION_ID_NOT_FOUND);
        assert_eq!(
            extract_session_id(&json!({"result": {"sessionId": 42}})),
            SESSION_ID_NOT_FOUND
        );
    }

    #[test]
    fn test_rpc_endpoint() {
        assert_eq!(rpc_endpoint(6800), "http://localhost:6800/jsonrpc");
    }
}
