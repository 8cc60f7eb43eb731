//! Data types parsed from ZFM/R50x response payloads.

pub mod error;
pub mod index_table;
pub mod search;
pub mod system_params;

pub use error::{Error, Result};
pub use index_table::IndexTable;
pub use search::SearchMatch;
pub use system_params::SystemParameters;
