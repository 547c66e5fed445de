use std::ops::{Deref, DerefMut};

/// Owned, resizable byte array. New space is always zeroed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn new(size: usize) -> Self {
        ByteBuffer {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zeroes the whole buffer.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn clear_range(&mut self, index: usize, length: usize) {
        self.fill_range(index, length, 0);
    }

    pub fn fill(&mut self, value: u8) {
        self.bytes.fill(value);
    }

    pub fn fill_range(&mut self, index: usize, length: usize, value: u8) {
        self.bytes[index..index + length].fill(value);
    }

    /// Copies `length` bytes starting at `index` into `dest` at `offset`.
    pub fn copy_to(&self, dest: &mut ByteBuffer, offset: usize, index: usize, length: usize) {
        dest.bytes[offset..offset + length].copy_from_slice(&self.bytes[index..index + length]);
    }

    /// Moves contents without wrapping: positive amounts shift towards the end,
    /// negative towards the start. Vacated bytes are zeroed.
    pub fn shift(&mut self, amount: isize) {
        if amount.unsigned_abs() >= self.len() {
            self.clear();
        } else if amount > 0 {
            self.shift_right(amount as usize);
        } else if amount < 0 {
            self.shift_left(amount.unsigned_abs());
        }
    }

    pub fn shift_left(&mut self, amount: usize) {
        let len = self.len();
        if amount >= len {
            self.clear();
            return;
        }
        self.bytes.copy_within(amount.., 0);
        self.bytes[len - amount..].fill(0);
    }

    pub fn shift_right(&mut self, amount: usize) {
        let len = self.len();
        if amount >= len {
            self.clear();
            return;
        }
        self.bytes.copy_within(..len - amount, amount);
        self.bytes[..amount].fill(0);
    }

    /// Like `shift`, but bytes pushed off one end come back in at the other.
    pub fn rotate(&mut self, amount: isize) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let amount = amount.rem_euclid(len as isize) as usize;
        self.bytes.rotate_right(amount);
    }

    pub fn reverse(&mut self) {
        self.bytes.reverse();
    }

    pub fn reverse_range(&mut self, index: usize, length: usize) {
        self.bytes[index..index + length].reverse();
    }

    /// Keeps existing content up to the new size; growth is zero-filled.
    pub fn resize(&mut self, size: usize) {
        self.bytes.resize(size, 0);
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for ByteBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        ByteBuffer { bytes }
    }
}
