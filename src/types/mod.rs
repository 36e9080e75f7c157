pub mod flight;
pub mod report;

pub use flight::*;
pub use report::*;
