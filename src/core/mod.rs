pub mod comparator;
pub mod domain;
pub mod errors;
pub mod grader;
pub mod pipeline;
pub mod scope;
pub mod traits;
