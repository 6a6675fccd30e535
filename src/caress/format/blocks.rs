//! # Block Store
//!
//! Presents a CARESS raw data file as a sequence of fixed 512-byte blocks.
//! Blocks are numbered from 1. The store keeps no cursor of its own; the
//! tokenizer and the partition reader decide which bytes they need.
//!
//! A short read is reported as [`CaressError::Truncated`]; whether that means
//! a proper end of file or a file still being written is decided by the
//! caller from context.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::trace;

use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{BLOCK_LENGTH, MAX_BLOCKS};

pub type Block = [u8; BLOCK_LENGTH];

#[derive(Debug)]
pub struct BlockStore {
    path: PathBuf,
    file: File,
}

impl BlockStore {
    /// Opens `path` read-only.
    ///
    /// # Errors
    /// Returns [`CaressError::CannotOpen`] if the file does not exist or
    /// cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CaressError::CannotOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Closes and reopens the underlying file, picking up data a writer
    /// has appended since it was opened.
    pub fn reopen(&mut self) -> Result<()> {
        self.file = File::open(&self.path).map_err(|source| CaressError::CannotOpen {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Reads block `n` (1-based) in full.
    pub fn read_block(&mut self, n: u64) -> Result<Block> {
        let mut block = [0u8; BLOCK_LENGTH];
        self.read_exact_at(block_offset(n)?, &mut block)
            .map_err(|e| truncated(e, n))?;
        trace!("Read block {}", n);
        Ok(block)
    }

    /// Reads `n_blocks` consecutive blocks starting at `start_block`.
    ///
    /// # Errors
    /// Returns [`CaressError::PayloadTooLarge`] if more than [`MAX_BLOCKS`]
    /// blocks are requested, [`CaressError::Truncated`] if the file ends
    /// before the last one.
    pub fn read_span(&mut self, start_block: u64, n_blocks: u64) -> Result<Vec<u8>> {
        check_capacity(n_blocks)?;
        let mut buf = vec![0u8; n_blocks as usize * BLOCK_LENGTH];
        self.read_exact_at(block_offset(start_block)?, &mut buf)
            .map_err(|e| truncated(e, start_block + n_blocks - 1))?;
        trace!("Read {} blocks starting at block {}", n_blocks, start_block);
        Ok(buf)
    }

    /// Reads `len` bytes at absolute byte `offset` out of the blocks that
    /// hold them.
    pub fn read_range(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let block = BLOCK_LENGTH as u64;
        let first = offset / block + 1;
        let last = offset.checked_add(len - 1).map(|end| end / block + 1).ok_or(
            CaressError::PayloadTooLarge {
                blocks: len.div_ceil(block),
                max: MAX_BLOCKS,
            },
        )?;
        let span = self.read_span(first, last - first + 1)?;
        let from = (offset % block) as usize;
        Ok(span[from..from + len as usize].to_vec())
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }
}

fn block_offset(n: u64) -> Result<u64> {
    n.checked_sub(1)
        .and_then(|i| i.checked_mul(BLOCK_LENGTH as u64))
        .ok_or(CaressError::Truncated { block: n })
}

fn check_capacity(blocks: u64) -> Result<()> {
    if blocks > MAX_BLOCKS {
        return Err(CaressError::PayloadTooLarge {
            blocks,
            max: MAX_BLOCKS,
        });
    }
    Ok(())
}

fn truncated(e: std::io::Error, block: u64) -> CaressError {
    if e.kind() == ErrorKind::UnexpectedEof {
        CaressError::Truncated { block }
    } else {
        CaressError::Io(e)
    }
}
