//! Spam classification
//!
//! - `normalizer`: whitespace and control-character cleanup
//! - `vectorizer`: TF-IDF features over a sorted vocabulary
//! - `classifier`: multinomial naive Bayes model
//! - `keywords`: per-text spam indicator ranking
//! - `store`: JSON persistence for model and corpus
//! - `manager`: orchestration, model swapping and retraining

pub mod classifier;
pub mod keywords;
pub mod manager;
pub mod normalizer;
pub mod store;
pub mod types;
pub mod vectorizer;

pub use classifier::{Model, ModelParams, ModelView};
pub use keywords::top_keywords;
pub use manager::{validate_rows, SpamManager};
pub use normalizer::normalize;
pub use store::ModelStore;
pub use types::*;
pub use vectorizer::{TfidfVectorizer, VectorizerConfig};
