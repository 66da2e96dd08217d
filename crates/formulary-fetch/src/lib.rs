//! Archive fetching for formulary.
//!
//! Downloads source archives and resources over HTTP(S) (or reads `file://`
//! URLs), verifies each against its declared SHA-256 while streaming, and
//! keeps verified archives in a download cache.

pub mod download;
pub mod error;

pub use download::{FetchOptions, FetchedArchive, Fetcher};
pub use error::FetchError;
