//! Library surface behind the `newtest` binary: argument structs and
//! subcommand bodies live here so `tests/` can exercise them directly
//! without spawning a subprocess.

pub mod commands;
pub mod select;
pub mod topology;
