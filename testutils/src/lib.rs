mod configs;
mod constants;
mod exposition;
mod objs;

pub use configs::*;
pub use constants::*;
pub use exposition::*;
pub use objs::*;
pub use rstest::fixture;
pub use rstest_log::rstest;
