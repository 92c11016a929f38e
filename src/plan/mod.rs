pub mod error;
pub mod normalize;
pub mod parser;
pub mod plan_model;
pub mod prompt;
