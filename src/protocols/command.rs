//! Text of the shell commands sent over a [`RemoteChannel`](super::RemoteChannel).
//!
//! Every digest command answers on a single line as `<status>,<value>`: status `1`
//! with a hex SHA-1 on success, status `0` with a reason on failure.

use crate::backends::VerifyError;
use crate::range::ByteRange;

/// Default helper script name for [`RemoteCommand::Script`].
pub const DEFAULT_SCRIPT: &str = "sha1range.sh";

/// How the remote side computes a range digest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemoteCommand {
    /// Inline POSIX pipeline built from `wc`, `tail`, `head` and `sha1sum`. The status
    /// flag is `1` only when the range fits in the file before and after hashing, `tail`
    /// succeeded, and `sha1sum` produced a full-length digest.
    #[default]
    Pipeline,
    /// A helper installed on the remote host, invoked as `<program> "<path>" <start>-<end>`.
    Script { program: String },
}

/// Wrap `path` in double quotes for a POSIX shell.
///
/// `$`, backquote and backslash are escaped so they stay literal. A path containing a
/// double quote or a newline is refused.
pub fn quote_path(path: &str) -> Result<String, VerifyError> {
    if path.contains('"') || path.contains('\n') {
        return Err(VerifyError::UnsupportedPath(path.to_string()));
    }
    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for c in path.chars() {
        if matches!(c, '$' | '`' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}

/// Prints `1` if a regular file exists at `path`, `0` otherwise.
pub fn exists_command(path: &str) -> Result<String, VerifyError> {
    let p = quote_path(path)?;
    Ok(format!("[ -f {p} ] && echo 1 || echo 0"))
}

/// Prints `1,<size in bytes>` or `0,<reason>`. Does not check existence itself.
pub fn size_command(path: &str) -> Result<String, VerifyError> {
    let p = quote_path(path)?;
    Ok(format!(
        "sz=$(wc -c < {p}) && echo \"1,$sz\" || echo \"0,cannot read file\""
    ))
}

impl RemoteCommand {
    pub fn script(program: impl Into<String>) -> Self {
        RemoteCommand::Script {
            program: program.into(),
        }
    }

    /// Command that digests `range` of the file at `path`.
    pub fn digest_command(&self, path: &str, range: ByteRange) -> Result<String, VerifyError> {
        let p = quote_path(path)?;
        match self {
            RemoteCommand::Script { program } => Ok(format!("{program} {p} {range}")),
            // Bounds are compared as `e < sz` so no shell arithmetic runs on values larger
            // than the file. A failing `tail` is reported on fd 3 into the captured text.
            RemoteCommand::Pipeline => Ok(format!(
                "f={p}; s={start}; e={end}; \
                 sz=$(wc -c < \"$f\") || {{ echo \"0,cannot read file\"; exit 0; }}; \
                 if [ $e -ge $sz ]; then echo \"0,range {range} exceeds file size $sz\"; \
                 else h=$( {{ {{ tail -c +$((s + 1)) \"$f\" || echo tail-failed >&3; }} \
                 | head -c $((e - s + 1)) | sha1sum; }} 3>&1 ) \
                 && case \"$h\" in *tail-failed*) false ;; esac \
                 && h=${{h%% *}} && [ ${{#h}} -eq 40 ] \
                 && [ $(wc -c < \"$f\") -gt $e ] \
                 && echo \"1,$h\" || echo \"0,digest of range {range} failed\"; fi",
                start = range.start(),
                end = range.end(),
            )),
        }
    }
}
