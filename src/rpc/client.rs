use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};

use crate::{config::Settings, storage::entities::ActivitySample};

use super::{
    DaemonStatus, GamificationDetails, GamificationStatus, Request, Response,
    METHOD_GET_ACTIVITY_LOGS, METHOD_GET_CONFIG, METHOD_GET_GAMIFICATION_DETAILS,
    METHOD_GET_GAMIFICATION_STATUS, METHOD_GET_STATUS, METHOD_PING,
};

const ROUND_TRIP_DEADLINE: Duration = Duration::from_secs(10);

/// Everything that can go wrong on the client side of a call. Transport
/// problems are distinct from a server that answered `success: false`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running (socket not found at {0:?})")]
    NotRunning(PathBuf),
    #[error("failed to connect to daemon: {0}")]
    Connect(#[source] std::io::Error),
    #[error("failed to exchange request with daemon: {0}")]
    Transport(#[source] std::io::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("{method} failed: {message}")]
    Rejected { method: String, message: String },
}

/// Short-lived caller: connects, issues exactly one request, reads exactly
/// one response. The whole round trip shares a single deadline.
pub struct RpcClient {
    socket_path: PathBuf,
    deadline: Duration,
}

impl RpcClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            deadline: ROUND_TRIP_DEADLINE,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn call(&self, request: Request) -> Result<Response, ClientError> {
        if !self.socket_path.exists() {
            return Err(ClientError::NotRunning(self.socket_path.clone()));
        }

        let exchange = async {
            let mut stream = UnixStream::connect(&self.socket_path)
                .await
                .map_err(ClientError::Connect)?;

            let mut payload = serde_json::to_vec(&request)?;
            payload.push(b'\n');
            stream
                .write_all(&payload)
                .await
                .map_err(ClientError::Transport)?;

            let mut line = String::new();
            BufReader::new(stream)
                .read_line(&mut line)
                .await
                .map_err(ClientError::Transport)?;
            Ok(serde_json::from_str::<Response>(&line)?)
        };

        tokio::time::timeout(self.deadline, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.deadline))?
    }

    /// `call` plus unwrapping: a `success: false` response becomes an error
    /// carrying the server-provided message.
    async fn expect<T: DeserializeOwned>(&self, request: Request) -> Result<T, ClientError> {
        let method = request.method.clone();
        let response = self.call(request).await?;
        if !response.success {
            return Err(ClientError::Rejected {
                method,
                message: response
                    .error
                    .unwrap_or_else(|| "unspecified error".to_string()),
            });
        }
        Ok(serde_json::from_value(
            response.data.unwrap_or(serde_json::Value::Null),
        )?)
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.expect::<String>(Request::new(METHOD_PING)).await?;
        Ok(())
    }

    pub async fn daemon_status(&self) -> Result<DaemonStatus, ClientError> {
        self.expect(Request::new(METHOD_GET_STATUS)).await
    }

    pub async fn activity_logs(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivitySample>, ClientError> {
        let mut request = Request::new(METHOD_GET_ACTIVITY_LOGS);
        if let Some(from) = from {
            request = request.with_param("from", from.to_rfc3339());
        }
        if let Some(to) = to {
            request = request.with_param("to", to.to_rfc3339());
        }
        self.expect(request).await
    }

    pub async fn config(&self) -> Result<Settings, ClientError> {
        self.expect(Request::new(METHOD_GET_CONFIG)).await
    }

    pub async fn gamification_status(
        &self,
        user_id: Option<&str>,
    ) -> Result<GamificationStatus, ClientError> {
        let mut request = Request::new(METHOD_GET_GAMIFICATION_STATUS);
        if let Some(user_id) = user_id {
            request = request.with_param("user_id", user_id);
        }
        self.expect(request).await
    }

    pub async fn gamification_details(
        &self,
        user_id: Option<&str>,
    ) -> Result<GamificationDetails, ClientError> {
        let mut request = Request::new(METHOD_GET_GAMIFICATION_DETAILS);
        if let Some(user_id) = user_id {
            request = request.with_param("user_id", user_id);
        }
        self.expect(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::rpc::Request;

    use super::{ClientError, RpcClient};

    #[tokio::test]
    async fn missing_socket_is_a_distinct_error() {
        let client = RpcClient::new(PathBuf::from("/nonexistent/sidekick.sock"));
        let error = client.call(Request::new("ping")).await.unwrap_err();
        assert!(matches!(error, ClientError::NotRunning(_)));
    }
}
