pub mod capture;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod playback;
pub mod protocol;
pub mod session;
pub mod timeline;
pub mod upload;

pub use error::{ClientError, Result};
