//! Database implementations

pub mod appointment_repository;
pub mod directory_repository;
pub mod manager;

pub use appointment_repository::SqliteAppointmentStore;
pub use directory_repository::SqlitePartyDirectory;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
