pub mod credential;
pub mod record;
pub mod types;

#[cfg(test)]
mod tests;

pub use credential::*;
pub use record::*;
pub use types::*;
