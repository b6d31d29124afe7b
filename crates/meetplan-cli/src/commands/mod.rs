pub mod alternatives;
pub mod config;
pub mod conflicts;
pub mod import;
pub mod suggest;
