use ascii_table::{Align, AsciiTable};
use clap::{Parser, Subcommand};
use hashverify::backends::{backend_and_path, Target};
use hashverify::protocols::command::DEFAULT_SCRIPT;
use hashverify::protocols::{
    ChannelError, RemoteChannel, RemoteCommand, ShellProtocol, SshConfig, SshProtocol,
};
use hashverify::{
    ByteRange, LocalBackend, RemoteBackend, VerifyError, VerifyOptions, VerifyReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Command-line interface for hashverify
#[derive(Parser, Debug)]
#[command(
    name = "hashverify",
    version,
    about = "Check a local file against its remote copy using SHA-1 digests"
)]
struct Cli {
    /// ssh port (global; overrides a port in the target URL)
    #[arg(short, long, value_name = "PORT", global = true)]
    port: Option<u16>,

    /// ssh identity file (global)
    #[arg(short, long, value_name = "FILE", global = true)]
    identity: Option<PathBuf>,

    /// ssh connect timeout in seconds (global)
    #[arg(long, value_name = "SECS", global = true, default_value_t = 30)]
    connect_timeout: u64,

    /// Disable ssh host key checking (global, insecure)
    #[arg(long, global = true)]
    insecure_skip_host_key_check: bool,

    /// Use a helper script on the remote host instead of the inline shell pipeline (global)
    #[arg(long, value_name = "PROGRAM", global = true, num_args = 0..=1, default_missing_value = DEFAULT_SCRIPT)]
    script: Option<String>,

    /// Number of verification threads (global)
    #[arg(short, long, value_name = "THREADS", global = true, default_value_t = num_cpus::get().max(2))]
    threads: usize,

    /// Disables the progress bar (global)
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the 128 KiB block digest and the whole-file digest of a local file
    Hash { file: PathBuf },
    /// Print the digest of an inclusive byte range of a local file
    Range {
        file: PathBuf,
        /// Range as start-end, e.g. 0-131071
        range: ByteRange,
    },
    /// Check whether a remote file exists (e.g., ssh://user@host/path)
    Exists { target: String },
    /// Print the digest of an inclusive byte range of a remote file
    RemoteRange { target: String, range: ByteRange },
    /// Compare a local file with its remote copy
    Verify {
        local: PathBuf,
        target: String,
        /// Only compare this range
        #[arg(short, long)]
        range: Option<ByteRange>,
        /// Compare in chunks of this many bytes, reporting each chunk
        #[arg(short, long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },
}

/// The channels a target can resolve to. Plain paths run through the local shell.
#[derive(Debug, Clone)]
enum Channel {
    Ssh(SshProtocol),
    Shell(ShellProtocol),
}

impl RemoteChannel for Channel {
    fn exec(&mut self, command: &str) -> Result<String, ChannelError> {
        match self {
            Channel::Ssh(ssh) => ssh.exec(command),
            Channel::Shell(sh) => sh.exec(command),
        }
    }
}

impl Cli {
    fn remote_command(&self) -> RemoteCommand {
        match &self.script {
            Some(program) => RemoteCommand::script(program.clone()),
            None => RemoteCommand::Pipeline,
        }
    }

    /// Resolve a target string into a channel and the path on the far side.
    fn channel_for(&self, target: &str) -> Result<(Channel, String), VerifyError> {
        match backend_and_path(target)? {
            Target::Local(path) => Ok((Channel::Shell(ShellProtocol::new()), path)),
            Target::Ssh {
                user,
                host,
                port,
                path,
            } => {
                let config = SshConfig {
                    port: self.port.or(port),
                    identity_file: self.identity.clone(),
                    connect_timeout: Duration::from_secs(self.connect_timeout),
                    skip_host_key_check: self.insecure_skip_host_key_check,
                    ..SshConfig::default()
                };
                Ok((Channel::Ssh(SshProtocol::new(host, user, config)), path))
            }
        }
    }

    fn remote(&self, target: &str) -> Result<(RemoteBackend<Channel>, String), VerifyError> {
        let (channel, path) = self.channel_for(target)?;
        Ok((RemoteBackend::with_command(channel, self.remote_command()), path))
    }
}

fn print_report(report: &VerifyReport) {
    let mut table = AsciiTable::default();
    table.column(0).set_header("#").set_align(Align::Right);
    table.column(1).set_header("Range").set_align(Align::Left);
    table.column(2).set_header("Status").set_align(Align::Left);
    let rows: Vec<Vec<String>> = report
        .chunks
        .iter()
        .map(|c| vec![c.index.to_string(), c.range.to_string(), c.status.to_string()])
        .collect();
    if !rows.is_empty() {
        println!("{}", table.format(rows));
    }
}

/// Runs the selected command. `Ok(false)` means the files differ.
fn run(cli: &Cli) -> Result<bool, VerifyError> {
    match &cli.command {
        Commands::Hash { file } => {
            let summary = LocalBackend::new().digest_file(file)?;
            println!("block {}", summary.block_digest);
            println!("total {}", summary.total_digest);
            Ok(true)
        }
        Commands::Range { file, range } => {
            let digest = LocalBackend::new().digest_path_range(file, *range)?;
            println!("{}", digest);
            Ok(true)
        }
        Commands::Exists { target } => {
            let (mut remote, path) = cli.remote(target)?;
            let exists = remote.check_exists(&path)?;
            println!("{}", if exists { "1" } else { "0" });
            Ok(exists)
        }
        Commands::RemoteRange { target, range } => {
            let (mut remote, path) = cli.remote(target)?;
            let digest = remote.digest_range(&path, *range)?;
            println!("{}", digest);
            Ok(true)
        }
        Commands::Verify {
            local,
            target,
            range,
            chunk_size,
        } => {
            if let Some(range) = range {
                let (mut remote, path) = cli.remote(target)?;
                let mut file = std::fs::File::open(local)?;
                let status = hashverify::verify_range(&mut file, &mut remote, &path, *range)?;
                println!("{} {}", range, status);
                return Ok(status.is_match());
            }
            if let Some(chunk_size) = chunk_size {
                let (channel, path) = cli.channel_for(target)?;
                let options = VerifyOptions {
                    threads: cli.threads,
                    chunk_size: *chunk_size,
                    no_progress: cli.no_progress,
                };
                let report =
                    hashverify::verify_chunks(local, channel, cli.remote_command(), &path, &options)?;
                print_report(&report);
                println!("{}", report.status);
                return Ok(report.is_match());
            }
            let (mut remote, path) = cli.remote(target)?;
            let status = hashverify::verify_file(local, &mut remote, &path)?;
            println!("{}", status);
            Ok(status.is_match())
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging using env_logger and HASHVERIFY_LOG
    env_logger::Builder::from_env(env_logger::Env::new().filter("HASHVERIFY_LOG")).init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
