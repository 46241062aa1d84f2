pub mod diagnostic;
pub mod field;
pub mod import;
pub mod target;
