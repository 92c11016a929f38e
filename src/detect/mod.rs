pub mod classifier;
pub mod detector;
pub mod field_model;
pub mod hints;
pub mod registry;
