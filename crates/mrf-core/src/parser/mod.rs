//! Path-scoped JSON element extraction
//!
//! [`ScopedScanner`] is the push-style core used by the async pipeline;
//! [`ScopedObjectReader`] wraps it as a pull-style iterator over any
//! [`std::io::Read`].

pub mod reader;
pub mod scanner;

pub use reader::ScopedObjectReader;
pub use scanner::{ScanStats, ScopedScanner};
