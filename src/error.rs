//! Process-level error type.
//!
//! Exit code conventions:
//! - `2` — input/usage errors (missing files, malformed tables, bad ranges)
//! - `3` — a requested operation has no data to work on (e.g. empty table)
//! - `4` — numeric/internal failures (non-finite model output on valid input)
//!
//! Recoverable pipeline conditions (unreadable VHE table, unparseable
//! redshift, bins that cannot be split) are *not* errors; they are carried as
//! data on the corresponding outcome values.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Input/usage error (exit code 2) wrapping an I/O failure on `path`.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::new(2, format!("{}: {err}", path.display()))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
