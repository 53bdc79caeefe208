mod client;
mod codec;
mod connection;
mod error;
mod response;
mod session;
mod tag_generator;

pub use client::Client;
pub use error::ImapError;
pub use session::Session;
