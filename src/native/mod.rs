//! Native module contains implementations of core traits that drive locally
//! installed toolchains and plain child processes, without Docker or other
//! isolation layers.
pub mod compiler;
pub mod diagnostics;
pub mod executor;
pub mod launch;
pub mod process;
