pub mod command;
pub mod local_protocol;
pub mod protocol;
pub mod ssh_protocol;

pub use command::RemoteCommand;
pub use local_protocol::ShellProtocol;
pub use protocol::{ChannelError, RemoteChannel};
pub use ssh_protocol::{SshConfig, SshProtocol};
