//! HTTP movie archive server
//!
//! This crate lets a browser walk a set of configured root directories,
//! pick a video and play it with seek support through HTTP range requests.
//! Filesystem paths travel through URLs as opaque [`PathToken`]s.

pub mod config;
mod error;
pub mod listing;
mod pages;
pub mod range;
pub mod roots;
mod server;
mod state;
pub mod storage;
pub mod stream;
pub mod token;
mod utils;
pub mod watch;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use listing::{Entry, Listing, ListingError, Playlist, PlaylistEntry};
pub use range::{parse_range, RangeError, RangeWindow};
pub use roots::RootSet;
pub use server::FileServerApi;
pub use state::ServerState;
pub use stream::{StreamError, VideoStream};
pub use token::{PathToken, TokenError};
pub use watch::{WatchEvent, WatchLog};

/// Result type alias for file server operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
