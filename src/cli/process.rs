use std::{env, path::Path, path::PathBuf, process::Stdio};

use anyhow::{Context, Result};
use sysinfo::{get_current_pid, Signal, System};

const DAEMON_BINARY: &str = "sidekick-daemon";

/// The daemon binary ships next to the CLI binary.
fn daemon_path() -> Result<PathBuf> {
    let cli = env::current_exe().context("Can't locate the current executable")?;
    let dir = cli
        .parent()
        .context("Executable has no parent directory")?;
    Ok(dir.join(DAEMON_BINARY))
}

pub fn kill_running_daemons(name: &Path) {
    let system = System::new_all();
    let current_id = get_current_pid().unwrap();
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            // SIGTERM lets the daemon remove its socket; a stubborn process
            // gets killed outright.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
}

pub fn stop_daemon() -> Result<()> {
    kill_running_daemons(&daemon_path()?);
    println!("Stopped");
    Ok(())
}

/// Shuts down any previous daemon and spawns a fresh one. The spawned
/// process detaches itself, so this returns as soon as the fork succeeded.
pub fn restart_daemon(dir: Option<&Path>) -> Result<()> {
    let daemon = daemon_path()?;
    kill_running_daemons(&daemon);

    let mut command = std::process::Command::new(&daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
    }

    println!("Spawning daemon");
    #[allow(clippy::zombie_processes)]
    let _ = command
        .spawn()
        .with_context(|| format!("failed to spawn {daemon:?}"))?;
    println!("Success");
    Ok(())
}
