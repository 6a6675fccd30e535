//! File format parsing layer for CARESS raw data files.
//!
//! This module bridges raw block I/O and the high-level
//! [`RawfileSession`](crate::caress::reader::RawfileSession).
//!
//! # Module Organization
//!
//! - [`blocks`]: fixed 512-byte block access
//! - [`tokens`]: signed-byte token stream over the blocks
//! - [`descriptors`]: element templates defined in the file
//! - [`grammar`]: data descriptions and unit assembly
//! - [`partition`]: direct-offset reads of large payloads
//!
//! # Architecture
//!
//! ```text
//!  RawfileSession
//!        │
//!  ┌─────┴──────────┐
//!  │  UnitParser    │ ← grammar::UnitParser::next_unit()
//!  │  ┌──────────┐  │
//!  │  │Descriptor│  │
//!  │  │  Table   │  │
//!  │  └──────────┘  │        ┌───────────────┐
//!  │  Tokenizer     │        │ partition::   │
//!  └─────┬──────────┘        │ read_partition│
//!        │                   └──────┬────────┘
//!  ┌─────┴───────────────────────────┴──┐
//!  │            BlockStore              │
//!  └────────────────────────────────────┘
//! ```

pub mod blocks;
pub mod descriptors;
pub mod grammar;
pub mod partition;
pub mod tokens;
