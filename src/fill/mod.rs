pub mod applier;
pub mod fill_model;
pub mod matcher;
pub mod rollback;
