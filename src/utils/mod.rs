//! Shared utilities: the error types every module returns and the logging
//! bootstrap used by the binary.

pub mod error;
pub mod logging;
