//! Core CARESS raw data reader module

pub mod codec;
pub mod format;
pub mod iter;
pub mod reader;
pub mod types;
pub mod utils;

pub use format::partition::Section;
pub use iter::{Element, ElementIter, Record, UnitIter};
pub use reader::{read_text_element, RawfileSession};
pub use types::error::{CaressError, Result};
