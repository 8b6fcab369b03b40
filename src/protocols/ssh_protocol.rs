use crate::protocols::protocol::{run_to_string, ChannelError, RemoteChannel};
use log::debug;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Options passed through to the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// `ssh` executable to run.
    pub program: String,
    pub port: Option<u16>,
    /// Path to identity file (private key).
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Skip host key verification (insecure).
    pub skip_host_key_check: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            port: None,
            identity_file: None,
            connect_timeout: Duration::from_secs(30),
            skip_host_key_check: false,
        }
    }
}

/// Channel backed by the system `ssh` binary. Each `exec` is its own ssh process,
/// so every command gets a fresh session that is closed when it returns.
///
/// Authentication is left to ssh itself (agent, keys, known_hosts). `BatchMode` is
/// always on so a missing key fails fast instead of prompting.
#[derive(Debug, Clone)]
pub struct SshProtocol {
    host: String,
    user: Option<String>,
    config: SshConfig,
}

impl SshProtocol {
    pub fn new(host: impl Into<String>, user: Option<String>, config: SshConfig) -> Self {
        Self {
            host: host.into(),
            user,
            config,
        }
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(u) => format!("{}@{}", u, self.host),
            None => self.host.clone(),
        }
    }

    /// Full argument vector for one remote command, without the program name.
    pub fn args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];

        let timeout_secs = self.config.connect_timeout.as_secs().max(1);
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={}", timeout_secs));

        if let Some(port) = self.config.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().into_owned());
        }
        if self.config.skip_host_key_check {
            args.push("-o".to_string());
            args.push("StrictHostKeyChecking=no".to_string());
            args.push("-o".to_string());
            args.push("UserKnownHostsFile=/dev/null".to_string());
        }

        args.push(self.destination());
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

impl RemoteChannel for SshProtocol {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        debug!("ssh {} cmd: {}", self.destination(), command);
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.args(command));
        run_to_string(cmd)
    }
}
