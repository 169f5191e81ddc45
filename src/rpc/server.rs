use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    select,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    daemon::services::{Services, DEFAULT_USER_ID},
    scoring::exp_threshold,
};

use super::{
    DaemonStatus, GamificationDetails, GamificationStatus, Request, Response,
    INVALID_REQUEST_ERROR, METHOD_GET_ACTIVITY_LOGS, METHOD_GET_CONFIG,
    METHOD_GET_GAMIFICATION_DETAILS, METHOD_GET_GAMIFICATION_STATUS, METHOD_GET_STATUS,
    METHOD_PING,
};

/// Unix-socket listener serving the one-request-per-connection protocol.
/// Binding is the only fatal failure; everything after that is answered as a
/// structured failure response and never takes the process down.
pub struct RpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
}

struct ServerState {
    services: Arc<Services>,
    started_at: DateTime<Utc>,
}

impl RpcServer {
    pub fn bind(
        socket_path: PathBuf,
        services: Arc<Services>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        // A stale socket from a previous run would make bind fail.
        match std::fs::remove_file(&socket_path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("failed to remove stale socket"),
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Closing the directory before binding means the socket is never
            // reachable by other users, even before its own chmod below.
            if let Some(parent) = socket_path.parent() {
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                    .context("failed to restrict socket directory permissions")?;
            }
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("failed to bind socket at {socket_path:?}"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to set socket permissions")?;
        }

        info!("listening on {socket_path:?}");
        Ok(Self {
            listener,
            socket_path,
            state: Arc::new(ServerState {
                services,
                started_at: Utc::now(),
            }),
            shutdown,
        })
    }

    /// Accept loop. Each connection gets its own task; cancellation stops
    /// accepting, lets in-flight handlers finish, then removes the socket.
    pub async fn run(self) -> Result<()> {
        let tracker = TaskTracker::new();
        loop {
            select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let state = self.state.clone();
                            tracker.spawn(handle_connection(stream, state));
                        }
                        Err(e) => {
                            warn!("failed to accept connection {e:?}");
                        }
                    }
                }
            }
        }

        tracker.close();
        tracker.wait().await;
        drop(self.listener);
        let _ = std::fs::remove_file(&self.socket_path);
        info!("rpc server stopped");
        Ok(())
    }
}

async fn handle_connection(stream: UnixStream, state: Arc<ServerState>) {
    let (read, mut write) = stream.into_split();
    let mut line = String::new();

    let response = match BufReader::new(read).read_line(&mut line).await {
        Ok(_) => match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!("dispatching {}", request.method);
                state.dispatch(request).await
            }
            // Short-circuit without looking at the method.
            Err(_) => Response::failure(INVALID_REQUEST_ERROR),
        },
        Err(e) => {
            warn!("failed to read request {e:?}");
            return;
        }
    };

    let mut payload = match serde_json::to_vec(&response) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("failed to encode response {e:?}");
            return;
        }
    };
    payload.push(b'\n');

    if let Err(e) = write.write_all(&payload).await {
        warn!("failed to write response {e:?}");
    }
    let _ = write.shutdown().await;
}

impl ServerState {
    async fn dispatch(&self, request: Request) -> Response {
        match request.method.as_str() {
            METHOD_PING => Response::ok("pong"),

            METHOD_GET_STATUS => Response::ok(DaemonStatus {
                running: true,
                started_at: self.started_at,
                uptime_secs: (Utc::now() - self.started_at).num_seconds(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),

            METHOD_GET_ACTIVITY_LOGS => {
                let from = param_time(&request, "from");
                let to = param_time(&request, "to");
                match self.services.activity.logs(from, to).await {
                    Ok(logs) => Response::ok(logs),
                    Err(e) => Response::failure(e.to_string()),
                }
            }

            METHOD_GET_CONFIG => Response::ok(&self.services.settings),

            METHOD_GET_GAMIFICATION_STATUS => {
                let user_id = param_user(&request);
                match self.services.game.effective_status(&user_id).await {
                    Ok((status, _)) => {
                        let next = exp_threshold(status.level + 1);
                        Response::ok(GamificationStatus::from_effective(status, next))
                    }
                    Err(e) => Response::failure(e.to_string()),
                }
            }

            METHOD_GET_GAMIFICATION_DETAILS => {
                let user_id = param_user(&request);
                let effective = self.services.game.effective_status(&user_id).await;
                let usage = self.services.activity.usage_today().await;
                match (effective, usage) {
                    (Ok((status, modifiers)), Ok(recent_apps)) => {
                        let next = exp_threshold(status.level + 1);
                        Response::ok(GamificationDetails {
                            status: GamificationStatus::from_effective(status, next),
                            modifiers,
                            recent_apps,
                        })
                    }
                    (Err(e), _) | (_, Err(e)) => Response::failure(e.to_string()),
                }
            }

            other => Response::failure(format!("unknown method: {other}")),
        }
    }
}

/// Optional RFC 3339 timestamp parameter. An unparsable value is treated the
/// same as an absent one, letting the service apply its defaults.
fn param_time(request: &Request, key: &str) -> Option<DateTime<Utc>> {
    let raw = request.params.get(key)?;
    let Value::String(raw) = raw else { return None };
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|v| v.with_timezone(&Utc))
}

fn param_user(request: &Request) -> String {
    match request.params.get("user_id") {
        Some(Value::String(user_id)) if !user_id.is_empty() => user_id.clone(),
        _ => DEFAULT_USER_ID.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::Value;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::UnixStream,
    };
    use tokio_util::sync::CancellationToken;

    use crate::{
        config::Settings,
        rpc::{client::RpcClient, Request, Response, METHOD_GET_ACTIVITY_LOGS, METHOD_PING},
        storage::Database,
        utils::logging::TEST_LOGGING,
    };

    use super::{RpcServer, Services};

    struct TestServer {
        client: RpcClient,
        shutdown: CancellationToken,
        _dir: tempfile::TempDir,
    }

    fn start_server() -> TestServer {
        *TEST_LOGGING;
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("sidekick.sock");
        let services = Arc::new(Services::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Settings::default(),
        ));
        let shutdown = CancellationToken::new();
        let server = RpcServer::bind(socket_path.clone(), services, shutdown.clone()).unwrap();
        tokio::spawn(server.run());
        TestServer {
            client: RpcClient::new(socket_path),
            shutdown,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let server = start_server();
        let response = server.client.call(Request::new(METHOD_PING)).await.unwrap();
        assert!(response.success);
        assert_eq!(response.data, Some(Value::String("pong".into())));
        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn unknown_method_is_a_clean_failure() {
        let server = start_server();
        let response = server
            .client
            .call(Request::new("launch_missiles"))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("unknown method: launch_missiles")
        );
        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn malformed_request_short_circuits() {
        let server = start_server();
        let mut stream = UnixStream::connect(server.client.socket_path())
            .await
            .unwrap();
        stream.write_all(b"this is not json\n").await.unwrap();

        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("invalid request format"));
        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn fresh_user_status_is_seeded_with_first_gate() {
        let server = start_server();
        let status = server.client.gamification_status(None).await.unwrap();
        assert_eq!(status.user_id, "local");
        assert_eq!(status.level, 1);
        assert_eq!(status.total_exp, 0);
        assert_eq!(status.next_level_exp, 100);
        assert_eq!(status.stamina, 100);
        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn socket_is_owner_only_from_the_first_instant() {
        use std::os::unix::fs::PermissionsExt;

        let server = start_server();
        let socket_path = server.client.socket_path();

        // The directory is closed before the socket ever exists, so the 0600
        // socket mode is never racing against a connect from another user.
        let dir_mode = std::fs::metadata(socket_path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);

        let socket_mode = std::fs::metadata(socket_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(socket_mode & 0o777, 0o600);
        server.shutdown.cancel();
    }

    #[tokio::test]
    async fn activity_logs_accept_reversed_bounds() {
        let server = start_server();
        let now = Utc::now();
        let request = Request::new(METHOD_GET_ACTIVITY_LOGS)
            .with_param("from", now.to_rfc3339())
            .with_param("to", (now - chrono::Duration::hours(1)).to_rfc3339());
        let response = server.client.call(request).await.unwrap();
        assert!(response.success, "bounds must be swapped, not rejected");
        server.shutdown.cancel();
    }
}
