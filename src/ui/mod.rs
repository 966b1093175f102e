//! Web display: REST endpoints and a websocket feed of meter frames

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{AppState, WebServer};
