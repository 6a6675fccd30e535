//! Builds synthetic CARESS raw data files for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use caress_raw::caress::codec::vax::ieee32_to_vax;
use tempfile::TempDir;

pub const BLOCK: usize = 512;

pub const NIL: u8 = 0;
pub const END_OF_FILE: u8 = 0xc0;
pub const PAREN: u8 = 0x80;
pub const THESIS: u8 = 0x81;

pub const CHAR: u8 = 16;
pub const INT16_LE: u8 = 1;
pub const INT16_BE: u8 = 9;
pub const INT32_LE: u8 = 2;
pub const INT32_BE: u8 = 10;
pub const INT64_LE: u8 = 13;
pub const INT64_BE: u8 = 14;
pub const IEEE32_LE: u8 = 3;
pub const IEEE32_BE: u8 = 4;
pub const IEEE64_LE: u8 = 11;
pub const IEEE64_BE: u8 = 12;
pub const VAX: u8 = 5;

/// Token stream writer producing the on-disk layout.
#[derive(Default, Clone)]
pub struct RawWriter {
    bytes: Vec<u8>,
}

impl RawWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Inline count below 128, 32-bit little-endian count otherwise.
    pub fn count(&mut self, n: u64) -> &mut Self {
        if n < 128 {
            self.raw(&[n as u8])
        } else {
            self.raw(&[0x80 | INT32_LE]).raw(&(n as i32).to_le_bytes())
        }
    }

    /// Out-of-line count written with integer type `code`.
    pub fn count_as(&mut self, n: i64, code: u8) -> &mut Self {
        self.raw(&[0x80 | code]);
        match code {
            INT16_LE => self.raw(&(n as i16).to_le_bytes()),
            INT16_BE => self.raw(&(n as i16).to_be_bytes()),
            INT32_LE => self.raw(&(n as i32).to_le_bytes()),
            INT32_BE => self.raw(&(n as i32).to_be_bytes()),
            INT64_LE => self.raw(&n.to_le_bytes()),
            INT64_BE => self.raw(&n.to_be_bytes()),
            _ => panic!("not an integer code: {}", code),
        }
    }

    /// Simple description of `count` items followed by the payload.
    pub fn typed(&mut self, code: u8, count: u64, payload: &[u8]) -> &mut Self {
        self.raw(&[code]).count(count).raw(payload)
    }

    pub fn chars(&mut self, text: &str) -> &mut Self {
        self.typed(CHAR, text.len() as u64, text.as_bytes())
    }

    pub fn define(&mut self, definition: &str) -> &mut Self {
        self.chars(definition)
    }

    pub fn label(&mut self, name: &str) -> &mut Self {
        self.chars(name)
    }

    pub fn int16(&mut self, values: &[i16]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed(INT16_LE, values.len() as u64, &payload)
    }

    pub fn int16_be(&mut self, values: &[i16]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.typed(INT16_BE, values.len() as u64, &payload)
    }

    pub fn int32(&mut self, values: &[i32]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed(INT32_LE, values.len() as u64, &payload)
    }

    pub fn int32_be(&mut self, values: &[i32]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.typed(INT32_BE, values.len() as u64, &payload)
    }

    pub fn int64(&mut self, values: &[i64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed(INT64_LE, values.len() as u64, &payload)
    }

    pub fn int64_be(&mut self, values: &[i64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.typed(INT64_BE, values.len() as u64, &payload)
    }

    pub fn f32(&mut self, values: &[f32]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed(IEEE32_LE, values.len() as u64, &payload)
    }

    pub fn f32_be(&mut self, values: &[f32]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.typed(IEEE32_BE, values.len() as u64, &payload)
    }

    pub fn f64(&mut self, values: &[f64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed(IEEE64_LE, values.len() as u64, &payload)
    }

    pub fn f64_be(&mut self, values: &[f64]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.typed(IEEE64_BE, values.len() as u64, &payload)
    }

    pub fn vax(&mut self, values: &[f32]) -> &mut Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| ieee32_to_vax(*v)).collect();
        self.typed(VAX, values.len() as u64, &payload)
    }

    pub fn nil(&mut self) -> &mut Self {
        self.raw(&[NIL])
    }

    pub fn eof(&mut self) -> &mut Self {
        self.raw(&[END_OF_FILE])
    }

    /// Bytes padded with zeros to whole blocks.
    pub fn padded(&self) -> Vec<u8> {
        let mut out = self.bytes.clone();
        let rem = out.len() % BLOCK;
        if rem != 0 || out.is_empty() {
            out.resize(out.len() + BLOCK - rem, 0);
        }
        out
    }

    pub fn unpadded(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Writes `bytes` to a fresh temporary directory.
pub fn write_file(bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("run.dat");
    fs::write(&path, bytes).expect("write data file");
    (dir, path)
}

/// Scenario A: `DEFDAT STEP(X)` with one int16 value 42.
pub fn step_file() -> RawWriter {
    let mut w = RawWriter::new();
    w.define("DEFDAT STEP(X)").label("STEP").int16(&[42]).nil().eof();
    w
}
