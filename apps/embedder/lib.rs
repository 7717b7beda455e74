pub mod cache;
pub mod config;
pub mod content;
pub mod db;
pub mod document;
pub mod embeddings;
pub mod pipeline;
pub mod server;
