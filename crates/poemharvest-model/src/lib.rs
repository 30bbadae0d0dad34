pub mod error;
pub mod marker;
pub mod poem_record;

pub use error::*;
pub use poem_record::*;
