//! # caress-raw
//!
//! A reader for CARESS raw data files, the block-structured measurement
//! format written by CARESS instrument control systems.
//!
//! A file is a stream of self-describing data units: element templates are
//! defined inside the file, followed by typed node values (motor positions,
//! counters, detector histograms). Integer, IEEE and VAX float payloads in
//! either byte order are converted to the host's representation on request.
//!
//! ```no_run
//! use caress_raw::{ParseStatus, RawfileSession};
//!
//! let mut session = RawfileSession::open("run001.dat")?;
//! while let ParseStatus::Unit(unit) = session.next_unit()? {
//!     let values = session.read_values(&unit)?;
//!     println!("{} {} {:?}", unit.element, unit.node, values);
//! }
//! session.close();
//! # Ok::<(), caress_raw::CaressError>(())
//! ```
pub mod caress;

// Re-export the main types for convenience
pub use caress::{
    read_text_element,
    types::models::{
        DataUnit,
        ElementKind,
        ParseStatus,
        ReadOptions,
        TypeCode,
        ValueClass,
        Values,
    },
    CaressError,
    Element,
    RawfileSession,
    Record,
    Result,
    Section,
};
