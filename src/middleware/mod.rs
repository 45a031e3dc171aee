// HTTP middleware

pub mod cors;
pub mod catch_panic;

pub use cors::*;
pub use catch_panic::*;
