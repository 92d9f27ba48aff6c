pub mod error;
pub mod handler;
pub mod server;
pub mod utils;
