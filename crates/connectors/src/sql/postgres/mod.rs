pub mod adapter;
pub mod params;
pub mod pool;
pub(crate) mod utils;
