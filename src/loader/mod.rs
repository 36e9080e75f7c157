pub mod flight_table;
pub mod main;
pub mod parameter_table;

pub use flight_table::*;
pub use main::*;
pub use parameter_table::*;
