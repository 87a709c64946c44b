//! Fixed-capacity circular buffer of raw converter codes.
//!
//! A plain arena plus a write cursor and a wrapped flag; all index arithmetic
//! is modulo the capacity and the storage is never reallocated or shifted.
//! The buffer itself is not synchronized - the sampler wraps it in a mutex
//! and keeps critical sections down to index math and copies.

use crate::error::{Result, ScopeError};

#[derive(Debug)]
pub struct SampleBuffer {
    data: Vec<u16>,
    write_idx: usize,
    wrapped: bool,
}

impl SampleBuffer {
    /// Allocate a buffer of `capacity` raw codes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ScopeError::InvalidArgument("buffer capacity must be non-zero"));
        }
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ScopeError::AllocationFailed {
                bytes: capacity * std::mem::size_of::<u16>(),
            })?;
        data.resize(capacity, 0);
        Ok(Self {
            data,
            write_idx: 0,
            wrapped: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid samples currently stored.
    pub fn available(&self) -> usize {
        if self.wrapped {
            self.data.len()
        } else {
            self.write_idx
        }
    }

    /// True once the write cursor has wrapped at least once this run.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn write_idx(&self) -> usize {
        self.write_idx
    }

    /// Append one raw code, overwriting the oldest sample once full.
    pub fn push(&mut self, code: u16) {
        self.data[self.write_idx] = code;
        self.write_idx += 1;
        if self.write_idx >= self.data.len() {
            self.write_idx = 0;
            self.wrapped = true;
        }
    }

    /// Reset the cursor and wrapped flag for a fresh run. Stale codes stay in
    /// the arena but are unreachable until overwritten.
    pub fn reset(&mut self) {
        self.write_idx = 0;
        self.wrapped = false;
    }

    /// Copy the most recent `out.len().min(available)` samples into `out`,
    /// oldest to newest. Returns the number of samples copied.
    pub fn copy_recent(&self, out: &mut [u16]) -> usize {
        let available = self.available();
        let count = out.len().min(available);
        if count == 0 {
            return 0;
        }

        let capacity = self.data.len();
        let start = if self.wrapped {
            (self.write_idx + capacity - count) % capacity
        } else {
            available - count
        };

        let first_len = count.min(capacity - start);
        out[..first_len].copy_from_slice(&self.data[start..start + first_len]);
        if first_len < count {
            out[first_len..count].copy_from_slice(&self.data[..count - first_len]);
        }
        count
    }
}
