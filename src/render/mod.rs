pub mod ease;
pub mod model;
