//! Client for the price-update service.
//!
//! Update payloads are fetched as base64, decoded to bytes and handed to the
//! exchange calls untouched. Nothing here interprets them.

mod client;
mod error;
mod payload;

pub use client::PriceUpdateClient;
pub use error::{OracleError, Result};
pub use payload::{decode_payload, ParsedPrice, PriceUpdate};
