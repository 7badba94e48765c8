pub mod connections;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod state;
