pub use error::Error;

pub mod controls;
pub mod error;
pub mod local;
pub mod notification;
pub mod output;
pub mod playlist;
pub mod reconciler;
pub mod remote;
pub mod service;
pub mod session;
pub mod state;

pub type Result<T, E = Error> = std::result::Result<T, E>;
