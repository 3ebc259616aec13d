//! Sliding window for DEFLATE decompression.
//!
//! The decoder keeps the most recent `2^bits` bytes of produced output in
//! a circular buffer so back-references can be resolved. The buffer is
//! allocated on first use, reused across resets, and updated from the
//! output actually handed to the caller at the end of each step call.

/// Minimum window bits accepted by the codec.
pub const MIN_WBITS: u32 = 8;

/// Maximum window bits accepted by the codec (32 KiB window).
pub const MAX_WBITS: u32 = 15;

/// A circular history buffer of power-of-two capacity.
#[derive(Debug, Clone)]
pub struct Window {
    /// Backing storage; empty until first needed.
    buf: Vec<u8>,
    /// Capacity, `1 << bits`.
    size: usize,
    /// Write index for the next byte.
    next: usize,
    /// Number of valid history bytes (up to `size`).
    have: usize,
}

impl Window {
    /// Create a window of capacity `1 << bits` without allocating yet.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is outside `MIN_WBITS..=MAX_WBITS`.
    pub fn new(bits: u32) -> Self {
        assert!(
            (MIN_WBITS..=MAX_WBITS).contains(&bits),
            "window bits must be in {}..={}, got {}",
            MIN_WBITS,
            MAX_WBITS,
            bits
        );
        Self {
            buf: Vec::new(),
            size: 1usize << bits,
            next: 0,
            have: 0,
        }
    }

    fn ensure_allocated(&mut self) {
        if self.buf.is_empty() {
            self.buf = vec![0u8; self.size];
        }
    }

    /// Window capacity in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of valid history bytes.
    pub fn have(&self) -> usize {
        self.have
    }

    /// Forget all history, keeping the allocation.
    pub fn clear(&mut self) {
        self.next = 0;
        self.have = 0;
    }

    /// Record `data` (output just produced) into the history.
    pub fn update(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.ensure_allocated();

        let len = data.len();
        if len >= self.size {
            // Only the newest `size` bytes matter.
            self.buf.copy_from_slice(&data[len - self.size..]);
            self.next = 0;
            self.have = self.size;
            return;
        }

        let to_end = self.size - self.next;
        let n = len.min(to_end);
        self.buf[self.next..self.next + n].copy_from_slice(&data[..n]);
        if len > n {
            self.buf[..len - n].copy_from_slice(&data[n..]);
            self.next = len - n;
        } else {
            self.next += n;
            if self.next == self.size {
                self.next = 0;
            }
        }
        self.have = (self.have + len).min(self.size);
    }

    /// The byte `dist` positions back in the produced stream (1-based).
    ///
    /// Callers must ensure `1 <= dist <= have()`.
    #[inline]
    pub fn byte_back(&self, dist: usize) -> u8 {
        debug_assert!(dist >= 1 && dist <= self.have);
        let idx = self.next.wrapping_sub(dist) & (self.size - 1);
        self.buf[idx]
    }

    /// Preload the history with a preset dictionary.
    ///
    /// Only the last `size` bytes are kept when the dictionary is larger,
    /// as the zlib format specifies.
    pub fn preload(&mut self, dictionary: &[u8]) {
        self.clear();
        self.update(dictionary);
    }

    /// Export the current history, oldest byte first.
    ///
    /// This is the decoder side of dictionary export: up to `size` bytes
    /// of the most recent output.
    pub fn history(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.have);
        let mask = self.size - 1;
        for i in 0..self.have {
            let idx = self.next.wrapping_sub(self.have - i) & mask;
            out.push(self.buf[idx]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_basic() {
        let mut w = Window::new(8);
        w.update(b"Hello");
        assert_eq!(w.have(), 5);
        assert_eq!(w.byte_back(1), b'o');
        assert_eq!(w.byte_back(5), b'H');
    }

    #[test]
    fn test_window_wraps() {
        let mut w = Window::new(8); // 256-byte window
        let data: Vec<u8> = (0..300u32).map(|i| (i & 0xFF) as u8) .collect();
        w.update(&data);
        assert_eq!(w.have(), 256);
        // Newest byte is 299 & 0xFF = 43.
        assert_eq!(w.byte_back(1), 43);
        // Oldest retained byte is 300 - 256 = 44.
        assert_eq!(w.byte_back(256), 44);
    }

    #[test]
    fn test_window_oversized_update() {
        let mut w = Window::new(8);
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        w.update(&data);
        assert_eq!(w.have(), 256);
        assert_eq!(w.byte_back(1), data[999]);
        assert_eq!(w.byte_back(256), data[1000 - 256]);
    }

    #[test]
    fn test_window_incremental_matches_bulk() {
        let data: Vec<u8> = (0..777u32).map(|i| (i * 7 % 256) as u8).collect();

        let mut bulk = Window::new(9);
        bulk.update(&data);

        let mut inc = Window::new(9);
        for chunk in data.chunks(13) {
            inc.update(chunk);
        }

        assert_eq!(bulk.have(), inc.have());
        for d in 1..=bulk.have() {
            assert_eq!(bulk.byte_back(d), inc.byte_back(d));
        }
    }

    #[test]
    fn test_window_history_export() {
        let mut w = Window::new(8);
        w.update(b"Hello, World!");
        assert_eq!(w.history(), b"Hello, World!");

        let big: Vec<u8> = (0..400u32).map(|i| (i & 0xFF) as u8).collect();
        w.clear();
        w.update(&big);
        assert_eq!(w.history(), &big[400 - 256..]);
    }

    #[test]
    fn test_window_dictionary_preload() {
        let mut w = Window::new(8);
        w.update(b"old output");
        w.preload(b"dictionary");
        assert_eq!(w.history(), b"dictionary");
    }

    #[test]
    #[should_panic(expected = "window bits")]
    fn test_window_bits_out_of_range() {
        let _ = Window::new(16);
    }
}
