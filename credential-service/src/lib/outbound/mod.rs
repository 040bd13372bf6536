pub mod ids;
pub mod repositories;
