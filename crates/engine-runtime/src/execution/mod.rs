pub mod collection;
pub mod executor;
pub mod factory;
pub mod workers;
