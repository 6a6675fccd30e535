//! # Token Stream
//!
//! Delivers the file one signed byte at a time, refilling the current block
//! from the [`BlockStore`] when the cursor runs off its end. Payloads are
//! skipped over in one step and recorded by their absolute file position.

use std::borrow::Cow;

use log::trace;

use super::blocks::{Block, BlockStore};
use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{token, Payload, BLOCK_LENGTH};

/// Saved cursor state, restored with [`Tokenizer::reset`].
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    block_number: u64,
    buf: Block,
    index: usize,
    token: i8,
    before_start: bool,
}

impl Mark {
    pub fn position(&self) -> u64 {
        offset_of(self.block_number, self.index)
    }
}

#[derive(Debug)]
pub struct Tokenizer {
    store: BlockStore,
    /// 1-based number of the block held in `buf`; 0 before the first read.
    block_number: u64,
    buf: Block,
    /// Position of the current token within `buf`.
    index: usize,
    token: i8,
    /// Set when a rewind moved in front of the first byte of the file.
    before_start: bool,
}

impl Tokenizer {
    pub fn new(store: BlockStore) -> Self {
        Self {
            store,
            block_number: 0,
            buf: [0u8; BLOCK_LENGTH],
            index: 0,
            token: token::NIL,
            before_start: false,
        }
    }

    /// Reads block 1 and positions on its first byte.
    ///
    /// The position is left unchanged if the block cannot be read.
    pub fn start(&mut self) -> Result<()> {
        self.buf = self.store.read_block(1)?;
        self.block_number = 1;
        self.index = 0;
        self.token = self.buf[0] as i8;
        Ok(())
    }

    pub fn mark(&self) -> Mark {
        Mark {
            block_number: self.block_number,
            buf: self.buf,
            index: self.index,
            token: self.token,
            before_start: self.before_start,
        }
    }

    /// Returns to a position saved with [`mark`](Self::mark).
    pub fn reset(&mut self, mark: Mark) {
        self.block_number = mark.block_number;
        self.buf = mark.buf;
        self.index = mark.index;
        self.token = mark.token;
        self.before_start = mark.before_start;
    }

    pub fn token(&self) -> i8 {
        self.token
    }

    /// Absolute file offset of the current token.
    pub fn position(&self) -> u64 {
        offset_of(self.block_number, self.index)
    }

    /// Moves to the next token, reading the following block when needed.
    ///
    /// A failed block read does not move the cursor.
    pub fn advance(&mut self) -> Result<()> {
        if self.index < BLOCK_LENGTH - 1 {
            self.index += 1;
        } else {
            let next = self.block_number + 1;
            self.buf = self.store.read_block(next)?;
            self.block_number = next;
            self.index = 0;
        }
        self.token = self.buf[self.index] as i8;
        Ok(())
    }

    /// Skips `len` payload bytes starting at the current token.
    ///
    /// Only the block holding the byte after the payload is read; the
    /// payload itself is fetched on demand through [`payload_bytes`].
    ///
    /// [`payload_bytes`]: Self::payload_bytes
    ///
    /// # Errors
    /// Returns [`CaressError::MalformedUnit`] if the payload would end past
    /// the largest addressable file offset.
    pub fn take_payload(&mut self, len: u64) -> Result<Payload> {
        let offset = self.position();
        let beyond = || {
            CaressError::MalformedUnit(format!(
                "payload of {} bytes at offset {} exceeds the file address range",
                len, offset
            ))
        };
        offset.checked_add(len).ok_or_else(beyond)?;
        let pos = self.index as u64 + len;
        if pos < BLOCK_LENGTH as u64 {
            self.index = pos as usize;
        } else {
            let target = self
                .block_number
                .checked_add(pos / BLOCK_LENGTH as u64)
                .ok_or_else(beyond)?;
            self.buf = self.store.read_block(target)?;
            self.block_number = target;
            self.index = (pos % BLOCK_LENGTH as u64) as usize;
            trace!("Payload of {} bytes at {} ends in block {}", len, offset, target);
        }
        self.token = self.buf[self.index] as i8;
        Ok(Payload { offset, len })
    }

    /// Returns the bytes of `payload`, borrowed from the current block when
    /// they lie entirely inside it.
    pub fn payload_bytes(&mut self, payload: Payload) -> Result<Cow<'_, [u8]>> {
        let block_start = self.block_number.saturating_sub(1) * BLOCK_LENGTH as u64;
        let block_end = block_start + BLOCK_LENGTH as u64;
        let inside = payload
            .offset
            .checked_add(payload.len)
            .is_some_and(|end| payload.offset >= block_start && end <= block_end);
        if self.block_number > 0 && inside {
            let from = (payload.offset - block_start) as usize;
            return Ok(Cow::Borrowed(&self.buf[from..from + payload.len as usize]));
        }
        Ok(Cow::Owned(self.store.read_range(payload.offset, payload.len)?))
    }

    /// Moves the cursor back by `steps` tokens without reading.
    pub fn rewind(&mut self, steps: usize) {
        let mut index = self.index as i64 - steps as i64;
        while index < 0 && self.block_number > 1 {
            index += BLOCK_LENGTH as i64;
            self.block_number -= 1;
        }
        if index < 0 {
            self.before_start = true;
            self.index = 0;
        } else {
            self.index = index as usize;
        }
    }

    /// Reopens the file, re-reads the current block and advances by one
    /// token, so that bytes appended by a writer become visible.
    pub fn refresh(&mut self) -> Result<()> {
        self.store.reopen()?;
        let number = self.block_number.max(1);
        self.buf = self.store.read_block(number)?;
        self.block_number = number;
        if self.before_start {
            self.before_start = false;
            self.index = 0;
            self.token = self.buf[0] as i8;
            return Ok(());
        }
        self.advance()
    }

    pub fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }
}

fn offset_of(block_number: u64, index: usize) -> u64 {
    block_number.saturating_sub(1) * BLOCK_LENGTH as u64 + index as u64
}
