mod engine;
mod reconcilers;
mod target;

pub use engine::*;
pub use target::*;

#[cfg(test)]
mod tests;
