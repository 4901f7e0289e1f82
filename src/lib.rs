pub mod config;
pub mod constants;
pub mod core;
pub mod native;
pub mod scorer;
pub mod stubs;

#[cfg(test)]
mod integration_test;
