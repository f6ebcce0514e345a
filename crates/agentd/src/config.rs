// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! On-disk layout for the agent daemon: one state directory holding the
//! control socket, the singleton lock/pid file, and the log file.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine a state directory: set PREFLIGHT_STATE_DIR, XDG_STATE_HOME, or HOME")]
    NoStateDir,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    /// Resolve the daemon's paths. One agent daemon serves one state
    /// directory; `PREFLIGHT_STATE_DIR` overrides discovery entirely (tests
    /// use this for isolation), otherwise falls back to
    /// `$XDG_STATE_HOME/preflight` or `~/.local/state/preflight`.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("agent.sock"),
            lock_path: state_dir.join("agent.pid"),
            version_path: state_dir.join("agent.version"),
            log_path: state_dir.join("agent.log"),
            state_dir,
        })
    }
}

fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("PREFLIGHT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("preflight"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/preflight"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_dir_override_wins() {
        std::env::set_var("PREFLIGHT_STATE_DIR", "/tmp/preflight-test-state");
        let config = Config::load().unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/preflight-test-state"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/preflight-test-state/agent.sock"));
        std::env::remove_var("PREFLIGHT_STATE_DIR");
    }
}
