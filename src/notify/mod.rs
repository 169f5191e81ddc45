//! Desktop notifications. Platform senders are an ordered list of backends
//! tried in sequence; the first success wins, otherwise the last failure is
//! returned. Constructed once at daemon startup and passed down, never held
//! in a global.

use anyhow::{anyhow, Result};
use tracing::debug;

pub trait NotifyBackend: Send + Sync {
    /// Capability tag used in logs.
    fn name(&self) -> &'static str;

    fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// `osascript` notification on macOS.
pub struct OsaScript;

impl NotifyBackend for OsaScript {
    fn name(&self) -> &'static str {
        "osascript"
    }

    fn send(&self, title: &str, body: &str) -> Result<()> {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape(body),
            escape(title)
        );
        run_command("osascript", &["-e", &script])
    }
}

/// `notify-send` for freedesktop environments.
pub struct NotifySend;

impl NotifyBackend for NotifySend {
    fn name(&self) -> &'static str {
        "notify-send"
    }

    fn send(&self, title: &str, body: &str) -> Result<()> {
        run_command("notify-send", &[title, body])
    }
}

fn run_command(program: &str, args: &[&str]) -> Result<()> {
    let status = std::process::Command::new(program)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    if !status.success() {
        return Err(anyhow!("{program} exited with {status}"));
    }
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

pub struct Notifier {
    backends: Vec<Box<dyn NotifyBackend>>,
}

impl Notifier {
    /// Backend order for the current platform.
    pub fn with_platform_backends() -> Self {
        let backends: Vec<Box<dyn NotifyBackend>> = if cfg!(target_os = "macos") {
            vec![Box::new(OsaScript)]
        } else {
            vec![Box::new(NotifySend), Box::new(OsaScript)]
        };
        Self { backends }
    }

    pub fn with_backends(backends: Vec<Box<dyn NotifyBackend>>) -> Self {
        Self { backends }
    }

    pub fn send(&self, title: &str, body: &str) -> Result<()> {
        let mut last_failure = anyhow!("no notification backend available");
        for backend in &self.backends {
            match backend.send(title, body) {
                Ok(_) => {
                    debug!("notification delivered via {}", backend.name());
                    return Ok(());
                }
                Err(e) => {
                    debug!("notification backend {} failed {e:?}", backend.name());
                    last_failure = e;
                }
            }
        }
        Err(last_failure)
    }
}
