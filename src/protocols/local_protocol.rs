use crate::protocols::protocol::{run_to_string, ChannelError, RemoteChannel};
use log::debug;
use std::process::Command;

/// Runs commands with the local `sh`. Lets the remote protocol be exercised against
/// a file on this machine (loopback verification) with no ssh involved.
#[derive(Debug, Clone)]
pub struct ShellProtocol {
    shell: String,
}

impl Default for ShellProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellProtocol {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl RemoteChannel for ShellProtocol {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        debug!("{} cmd: {}", self.shell, command);
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        run_to_string(cmd)
    }
}
