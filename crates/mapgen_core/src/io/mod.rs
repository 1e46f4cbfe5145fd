pub mod recipe;
pub mod snapshot;
