pub mod connection;
pub mod migration;
pub mod status;
