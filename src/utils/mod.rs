// Utility functions

pub mod logger;
pub mod shutdown;

pub use logger::*;
pub use shutdown::*;
