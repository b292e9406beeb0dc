// SPDX-License-Identifier: MIT

//! Platescan: AI Factory Inventory
//!
//! Builds a structured equipment inventory from photos. Each uploaded image is
//! sent to a multimodal Gemini model which identifies the equipment, reads any
//! data-plate text via OCR, and returns a fixed five-field record that becomes
//! an inventory card.

pub mod config;
pub mod encoder;
pub mod error;
pub mod gemini;
pub mod inventory;
pub mod web;

pub use config::AppConfig;
pub use error::{PlatescanError, Result};
