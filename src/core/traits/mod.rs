pub mod compiler;
pub mod runner;
pub mod scorer;
