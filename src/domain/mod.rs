pub mod grouping;
pub mod models;
pub mod sessions;
