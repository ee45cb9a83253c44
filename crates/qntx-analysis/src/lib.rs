//! # QNTX Analysis Helpers
//!
//! Offline helpers for inspecting model outputs from analysis scripts:
//! - **reduce**: t-SNE and SVD projections of vector batches
//! - **transform**: read a vector from each object, reduce the batch, write points back
//! - **cache**: disk-backed memoization for expensive computations
//! - **report**: console lines with the top-k entries of a score matrix
//! - **format**: small display helpers shared by the above
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use ndarray::array;
//! use qntx_analysis::report::TopKReport;
//!
//! let idx2word: HashMap<usize, String> =
//!     [(0, "a"), (1, "b"), (2, "c")].map(|(i, w)| (i, w.to_string())).into();
//! let values = array![[0.1, 0.7, 0.2]];
//!
//! let lines = TopKReport::new(&idx2word)
//!     .labels(&[1])
//!     .top_k(2)
//!     .render(values.view())
//!     .unwrap();
//! assert!(lines[0].starts_with("0.700 b"));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod reduce;
pub mod report;
pub mod tracing;
pub mod transform;

// Re-export commonly used items at crate root
pub use cache::{cached, Cached, DiskCache};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use reduce::{Reducer, Svd, SvdConfig, Tsne, TsneConfig};
pub use report::{LabelMap, ReportConfig, TopKReport, ValueFormat};
pub use transform::{convert_for_each, eigen_points, tsne_points, ScoredObject};
