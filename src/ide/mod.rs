//! IDE features: queries for editors and diagram tools.
//!
//! Everything here reads a built workspace through an [`Analysis`] snapshot
//! and never mutates it.
//!
//! ## Usage
//!
//! ```ignore
//! use tessera::ide::Analysis;
//!
//! let analysis = builder.analysis();
//! let items = analysis.completions(&location, &ElementPath::root(), "parent");
//! ```

mod analysis;
mod completion;
mod goto;

pub use analysis::Analysis;
pub use completion::{CompletionItem, completions, completions_at};
pub use goto::{GotoResult, GotoTarget};
