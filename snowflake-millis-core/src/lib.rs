//! Core of snowflake-millis, the instrumented Snowflake connection layer.
//! Not intended to be used directly.
#![warn(future_incompatible, rust_2018_idioms)]
#![forbid(unsafe_code)]
//
// Allows an API be documented as only available in some specific platforms.
// <https://doc.rust-lang.org/unstable-book/language-features/doc-cfg.html>
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
pub mod error;

pub mod connection;
pub mod cursor;
pub mod logger;
pub mod snowflake;

pub use connection::{ConnectOptions, Connection, LogSettings};
pub use cursor::{Cursor, RowFormat};
pub use error::{Error, Result};
