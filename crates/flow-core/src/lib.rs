pub mod error;
pub mod io;
pub mod mcp;
pub mod paths;
pub mod section;
pub mod tree;
pub mod types;

pub use error::{FlowError, Result};
