pub mod locate;
pub mod manager;


pub use locate::*;
pub use manager::*;
