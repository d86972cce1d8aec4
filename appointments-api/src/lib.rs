pub mod config;
pub mod database;
pub mod gateway;
pub mod handlers;
pub mod integrations;

pub use database::Database;
pub use gateway::AppointmentGateway;
