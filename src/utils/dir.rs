use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

/// Every filesystem location the application uses, resolved once at startup
/// and passed down explicitly. Resolution order for the data directory:
/// explicit `--dir` override, then `SIDEKICK_DIR`, then
/// `$XDG_STATE_HOME/sidekick` (falling back to `$HOME/.local/state/sidekick`).
#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match override_dir {
            Some(dir) => dir,
            None => match env::var("SIDEKICK_DIR") {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => default_state_dir()?,
            },
        };

        match std::fs::create_dir_all(&data_dir) {
            Ok(_) => {}
            Err(v) if v.kind() == io::ErrorKind::AlreadyExists => {}
            Err(v) => return Err(v.into()),
        }

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn database(&self) -> PathBuf {
        self.data_dir.join("sidekick.db")
    }

    pub fn socket(&self) -> PathBuf {
        self.data_dir.join("sidekick.sock")
    }

    pub fn settings(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn logs(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn default_state_dir() -> Result<PathBuf> {
    let mut path = env::var("XDG_STATE_HOME").map(PathBuf::from).or_else(|_| {
        env::var("HOME").map(|home| {
            let mut path = PathBuf::from(home);
            path.push(".local/state");
            path
        })
    })
    .context("Couldn't find neither XDG_STATE_HOME nor HOME")?;
    path.push("sidekick");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::AppPaths;

    #[test]
    fn explicit_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::resolve(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(paths.data_dir(), dir.path());
        assert_eq!(paths.database(), dir.path().join("sidekick.db"));
        assert_eq!(paths.socket(), dir.path().join("sidekick.sock"));
    }
}
