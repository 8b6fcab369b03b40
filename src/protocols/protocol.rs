use log::debug;
use std::io;
use std::process::{Command, Stdio};

/// Failures of the channel itself, as opposed to the command it carried.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The session could not be created.
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    /// The command ran but exited non-zero.
    #[error("command exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    /// The command was killed before it could exit.
    #[error("command terminated by signal")]
    Signal,

    /// Standard output was not UTF-8 text.
    #[error("command output is not valid UTF-8")]
    InvalidOutput,
}

/// A channel that runs one shell command at a time and returns its standard output.
///
/// `exec` takes `&mut self`: a command must complete before the next one is issued
/// on the same channel.
pub trait RemoteChannel {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError>;
}

impl<C: RemoteChannel + ?Sized> RemoteChannel for &mut C {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        (**self).exec(command)
    }
}

impl<C: RemoteChannel + ?Sized> RemoteChannel for Box<C> {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        (**self).exec(command)
    }
}

/// Run a prepared process to completion and return its stdout.
pub(crate) fn run_to_string(mut cmd: Command) -> Result<String, ChannelError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd
        .output()
        .map_err(|source| ChannelError::Spawn { program, source })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return match output.status.code() {
            Some(code) => Err(ChannelError::Exit { code, stderr }),
            None => Err(ChannelError::Signal),
        };
    }

    let stdout = String::from_utf8(output.stdout).map_err(|_| ChannelError::InvalidOutput)?;
    debug!("command returned {} bytes", stdout.len());
    Ok(stdout)
}
