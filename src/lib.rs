pub mod catalog;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod index;
pub mod init;
pub mod llm;
pub mod render;
pub mod session;
pub mod tools;

pub use error::AssistantError;
