pub mod error;
pub mod execution;

pub use execution::{
    executor::MigrationCoordinator,
    factory::{ConnectionFactory, Connections, DefaultConnectionFactory},
};
