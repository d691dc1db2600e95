mod parser;
pub mod types;
pub mod validation;

pub use parser::{ParseError, parse_schema};
pub use validation::{ValidationError, validate_references};
