//! Launch-script naming conventions and text helpers.

use std::path::{Path, PathBuf};

use crate::domain::errors::{GenieError, GenieResult};

/// Environment variable holding the job working directory inside the script.
pub const GENIE_JOB_DIR_ENV_VAR: &str = "GENIE_JOB_DIR";

/// Name of the launch script written into the job working directory.
pub const SCRIPT_FILE_NAME: &str = "run";

/// Completion sentinel holding the exit code of the job process.
pub const DONE_FILE_NAME: &str = "genie.done";

pub const STDOUT_LOG_FILE_NAME: &str = "stdout.log";
pub const STDERR_LOG_FILE_NAME: &str = "stderr.log";
pub const ENV_LOG_FILE_NAME: &str = "env.log";

/// Directory under the working directory holding staged resources.
pub const GENIE_DIR: &str = "genie";

/// `${GENIE_JOB_DIR}` as it appears in emitted script lines.
pub fn job_dir_var() -> String {
    format!("${{{GENIE_JOB_DIR_ENV_VAR}}}")
}

/// Script reference to a path relative to the job working directory.
pub fn job_dir_path(relative: &Path) -> String {
    format!("{}/{}", job_dir_var(), relative.display())
}

/// Shell timestamp line, e.g. `echo Start: ...`.
pub fn timestamp_line(label: &str) -> String {
    format!("echo {label}: `date '+%Y-%m-%d %H:%M:%S'`")
}

/// Last path segment of a file reference (URI or path).
pub fn file_name(reference: &str) -> GenieResult<&str> {
    let trimmed = reference.trim();
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(GenieError::Precondition(format!(
            "File reference {reference} does not name a file"
        ))),
    }
}

/// Local destination for a remote file staged into `dir`.
pub fn staged_path(dir: &Path, reference: &str) -> GenieResult<PathBuf> {
    Ok(dir.join(file_name(reference)?))
}

/// Quote a value for safe use as a single shell word.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:,=@%+".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
