pub mod lib;

pub use lib::*;
