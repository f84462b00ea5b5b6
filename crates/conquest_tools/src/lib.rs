//! # Tower Conquest Development Tools
//!
//! Command-line tools for development:
//! - Level and match configuration validators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
