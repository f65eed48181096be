// Network adapter for the public game socket.

pub mod chat;
pub mod client;

pub use client::ws_handler;
