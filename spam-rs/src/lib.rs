//! spam-rs: spam classification service
//!
//! Classifies free text, or text pulled out of images by OCR, as spam or
//! ham with a TF-IDF multinomial naive Bayes model, and explains each
//! verdict with the tokens that weighed most towards spam.
//!
//! # Example
//!
//! ```no_run
//! use spam_rs::config::Config;
//! use spam_rs::spam::SpamManager;
//!
//! fn main() -> spam_rs::Result<()> {
//!     let config = Config::default();
//!     let manager = SpamManager::open(&config)?;
//!
//!     let result = manager.classify_text("Win a free prize now!", None)?;
//!     println!("spam: {} ({:.2})", result.is_spam, result.spam_probability);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`spam`]: Text pipeline, model, persistence and orchestration
//! - [`ocr`]: Image preprocessing, OCR engines and error correction
//! - [`api`]: REST API

pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod spam;

pub use config::Config;
pub use error::{Result, SpamError};
