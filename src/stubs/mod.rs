//! Stage implementations with canned results and an artificial delay, for
//! exercising the orchestration without toolchains or network.

pub mod compiler;
pub mod runner;
pub mod scorer;
