pub mod agent;
pub mod chat;
