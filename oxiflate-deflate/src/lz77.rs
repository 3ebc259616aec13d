//! LZ77 match finding for the DEFLATE encoder.
//!
//! The finder keeps a window of the last `2 * wsize` input bytes and two
//! hash structures: `head`, keyed by a rolling 3-byte fingerprint, giving
//! the most recent window position with that fingerprint, and `prev`,
//! chaining older positions. Candidate matches are found by walking the
//! chain up to a per-level hop budget and comparing candidate substrings.
//!
//! Matches are 3..=258 bytes at distances up to the window size. Higher
//! compression levels walk longer chains and defer matches lazily; the
//! per-level parameters live in [`MatchConfig`].

use oxiflate_core::bitstream::InputCursor;

use crate::tables::{MAX_MATCH, MIN_MATCH};

/// Lookahead the match loops require before searching; suspending below
/// this (unless the input ended) keeps every match fully comparable.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Matches of minimum length this far back cost more than literals.
pub const TOO_FAR: usize = 4096;

/// Compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Full lazy match search.
    #[default]
    Default,
    /// Bias toward literals; meant for data pre-processed by a filter.
    Filtered,
    /// Huffman coding only, no match search.
    HuffmanOnly,
    /// Run-length encoding: distance-one matches only.
    Rle,
    /// Normal matching but force fixed Huffman codes.
    Fixed,
}

/// How a level drives the match loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Level 0: stored blocks, no matching.
    Stored,
    /// Greedy matching (levels 1-3).
    Fast,
    /// Lazy matching (levels 4-9).
    Slow,
}

/// Per-level match-search parameters.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Halve the remaining chain budget once a match this long is held.
    pub good_length: usize,
    /// Do not bother deferring a match already this long.
    pub max_lazy: usize,
    /// Stop searching once a match this long is found.
    pub nice_length: usize,
    /// Maximum hash-chain hops per search.
    pub max_chain: usize,
    /// Which match loop this level uses.
    pub kind: MatchKind,
}

impl MatchConfig {
    /// The parameter table, indexed by compression level 0-9.
    pub fn for_level(level: u8) -> Self {
        let (good_length, max_lazy, nice_length, max_chain, kind) = match level {
            0 => (0, 0, 0, 0, MatchKind::Stored),
            1 => (4, 4, 8, 4, MatchKind::Fast),
            2 => (4, 5, 16, 8, MatchKind::Fast),
            3 => (4, 6, 32, 32, MatchKind::Fast),
            4 => (4, 4, 16, 16, MatchKind::Slow),
            5 => (8, 16, 32, 32, MatchKind::Slow),
            6 => (8, 16, 128, 128, MatchKind::Slow),
            7 => (8, 32, 128, 256, MatchKind::Slow),
            8 => (32, 128, 258, 1024, MatchKind::Slow),
            _ => (32, 258, 258, 4096, MatchKind::Slow),
        };
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            kind,
        }
    }
}

/// Match-finder state: window, hash chains, and the current scan cursor.
#[derive(Debug)]
pub struct LzState {
    /// Sliding window of `2 * wsize` bytes plus a comparison guard.
    pub window: Vec<u8>,
    /// Advertised window size (`1 << wbits`).
    pub wsize: usize,
    /// `wsize - 1` for position masking.
    pub wmask: usize,
    /// Most recent position per hash bucket (0 = empty).
    head: Vec<u16>,
    /// Previous position with the same hash, per window position.
    prev: Vec<u16>,
    hash_mask: usize,
    hash_shift: u32,
    /// Rolling hash of the `MIN_MATCH` bytes at the scan position.
    ins_h: usize,
    /// Start of the string under examination.
    pub strstart: usize,
    /// Valid bytes ahead of `strstart`.
    pub lookahead: usize,
    /// Window offset where the current block's raw bytes begin, or
    /// negative once slid out of reach.
    pub block_start: i64,
    /// Start of the currently held best match.
    pub match_start: usize,
    /// Hash insertions owed for bytes just behind `strstart`.
    pub insert: usize,
    /// Search parameters for the active level.
    pub config: MatchConfig,
}

impl LzState {
    /// Create a finder for a `1 << wbits` window; `mem_level` (1-9) sizes
    /// the hash table.
    pub fn new(wbits: u32, mem_level: u32) -> Self {
        let wsize = 1usize << wbits;
        let hash_bits = mem_level as usize + 7;
        let hash_size = 1usize << hash_bits;
        Self {
            window: vec![0u8; 2 * wsize + MAX_MATCH],
            wsize,
            wmask: wsize - 1,
            head: vec![0u16; hash_size],
            prev: vec![0u16; wsize],
            hash_mask: hash_size - 1,
            hash_shift: ((hash_bits + MIN_MATCH - 1) / MIN_MATCH) as u32,
            ins_h: 0,
            strstart: 0,
            lookahead: 0,
            block_start: 0,
            match_start: 0,
            insert: 0,
            config: MatchConfig::for_level(6),
        }
    }

    /// Return to the post-init state, keeping allocations.
    pub fn reset(&mut self) {
        self.head.fill(0);
        self.prev.fill(0);
        self.ins_h = 0;
        self.strstart = 0;
        self.lookahead = 0;
        self.block_start = 0;
        self.match_start = 0;
        self.insert = 0;
    }

    /// Forget all match history (used by a full flush) without touching
    /// the byte window.
    pub fn clear_hash(&mut self) {
        self.head.fill(0);
        self.insert = 0;
    }

    /// Furthest distance a new match may reach back.
    #[inline]
    pub fn max_dist(&self) -> usize {
        self.wsize - MIN_LOOKAHEAD
    }

    /// Usable window capacity (excludes the comparison guard bytes).
    #[inline]
    fn capacity(&self) -> usize {
        2 * self.wsize
    }

    #[inline]
    fn update_hash(&self, h: usize, byte: u8) -> usize {
        ((h << self.hash_shift) ^ byte as usize) & self.hash_mask
    }

    /// Insert the string at `pos` into the hash chains and return the
    /// previous head of its bucket.
    #[inline]
    pub fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h] as usize;
        self.prev[pos & self.wmask] = head as u16;
        self.head[self.ins_h] = pos as u16;
        head
    }

    /// Re-seed the rolling hash for the bytes at `pos`.
    #[inline]
    pub fn reset_hash_at(&mut self, pos: usize) {
        self.ins_h = self.window[pos] as usize;
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + 1]);
    }

    /// Top up the lookahead from the caller's input, sliding the window
    /// when the scan cursor reaches the upper half. Newly copied bytes
    /// are reported through `on_input` (checksum hook).
    pub fn fill_window<F>(&mut self, src: &mut InputCursor<'_>, mut on_input: F)
    where
        F: FnMut(&[u8]),
    {
        loop {
            let mut more = self.capacity() - self.lookahead - self.strstart;

            if self.strstart >= self.wsize + self.max_dist() {
                let wsize = self.wsize;
                let valid_end = self.strstart + self.lookahead;
                self.window.copy_within(wsize..valid_end, 0);
                self.match_start = self.match_start.saturating_sub(wsize);
                self.strstart -= wsize;
                self.block_start -= wsize as i64;
                if self.insert > self.strstart {
                    self.insert = self.strstart;
                }
                self.slide_hash();
                more += wsize;
            }

            if src.is_empty() {
                break;
            }

            let n = more.min(src.remaining());
            if n > 0 {
                let start = self.strstart + self.lookahead;
                let taken = src.take(n);
                self.window[start..start + n].copy_from_slice(taken);
                on_input(taken);
                self.lookahead += n;
            }

            // Catch up on hash insertions for bytes that arrived earlier
            // than a full MIN_MATCH of context.
            if self.lookahead + self.insert >= MIN_MATCH {
                let mut pos = self.strstart - self.insert;
                self.reset_hash_at(pos);
                while self.insert > 0 {
                    self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
                    self.prev[pos & self.wmask] = self.head[self.ins_h];
                    self.head[self.ins_h] = pos as u16;
                    pos += 1;
                    self.insert -= 1;
                    if self.lookahead + self.insert < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || src.is_empty() {
                break;
            }
        }
    }

    fn slide_hash(&mut self) {
        let wsize = self.wsize as u16;
        for h in self.head.iter_mut() {
            *h = if *h >= wsize { *h - wsize } else { 0 };
        }
        for p in self.prev.iter_mut() {
            *p = if *p >= wsize { *p - wsize } else { 0 };
        }
    }

    /// Walk the hash chain from `cur_match` looking for the longest match
    /// at `strstart`, preferring nearer candidates on ties.
    ///
    /// `prev_length` is the length already held by the caller; only
    /// strictly longer matches are reported. Returns `(length, start)`.
    pub fn longest_match(&self, mut cur_match: usize, prev_length: usize) -> (usize, usize) {
        let mut chain_length = self.config.max_chain;
        let scan = self.strstart;
        let mut best_len = prev_length.max(MIN_MATCH - 1);
        let mut best_start = self.match_start;

        if prev_length >= self.config.good_length {
            chain_length >>= 2;
        }

        let mut nice = self.config.nice_length;
        if nice > self.lookahead {
            nice = self.lookahead;
        }

        let limit = if self.strstart > self.max_dist() {
            self.strstart - self.max_dist()
        } else {
            0
        };

        let max_len = MAX_MATCH.min(self.lookahead);
        if max_len <= best_len {
            return (prev_length, best_start);
        }

        loop {
            debug_assert!(cur_match < scan);

            // Cheap rejections: the byte that would extend the best match,
            // then the first byte.
            if self.window[cur_match + best_len] == self.window[scan + best_len]
                && self.window[cur_match] == self.window[scan]
            {
                let mut len = 0;
                while len < max_len && self.window[cur_match + len] == self.window[scan + len] {
                    len += 1;
                }

                if len > best_len {
                    best_len = len;
                    best_start = cur_match;
                    if len >= nice {
                        break;
                    }
                }
            }

            cur_match = self.prev[cur_match & self.wmask] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length -= 1;
            if chain_length == 0 {
                break;
            }
        }

        if best_len > prev_length {
            (best_len, best_start)
        } else {
            (prev_length, self.match_start)
        }
    }

    /// Length of the run of bytes equal to `window[strstart - 1]`
    /// starting at `strstart`, for the RLE strategy.
    pub fn rle_match_length(&self) -> usize {
        if self.strstart == 0 || self.lookahead < MIN_MATCH {
            return 0;
        }
        let prev_byte = self.window[self.strstart - 1];
        let max = MAX_MATCH.min(self.lookahead);
        let mut len = 0;
        while len < max && self.window[self.strstart + len] == prev_byte {
            len += 1;
        }
        len
    }

    /// Preload up to `wsize` bytes of dictionary into the window and hash
    /// chains without emitting output.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        self.reset();
        let dict = if dictionary.len() > self.wsize {
            &dictionary[dictionary.len() - self.wsize..]
        } else {
            dictionary
        };
        self.window[..dict.len()].copy_from_slice(dict);
        self.strstart = dict.len();
        self.block_start = dict.len() as i64;

        if dict.len() >= MIN_MATCH {
            self.reset_hash_at(0);
            for pos in 0..=dict.len() - MIN_MATCH {
                self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
                self.prev[pos & self.wmask] = self.head[self.ins_h];
                self.head[self.ins_h] = pos as u16;
            }
            self.insert = MIN_MATCH - 1;
        } else {
            self.insert = dict.len();
        }
    }

    /// Export up to `wsize` bytes of current history, oldest first.
    pub fn history(&self) -> &[u8] {
        let end = self.strstart + self.lookahead;
        let len = end.min(self.wsize);
        &self.window[end - len..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::bitstream::InputCursor;

    fn filled(data: &[u8]) -> LzState {
        let mut lz = LzState::new(15, 8);
        let mut src = InputCursor::new(data);
        lz.fill_window(&mut src, |_| {});
        lz
    }

    #[test]
    fn test_level_table_shape() {
        assert_eq!(MatchConfig::for_level(0).kind, MatchKind::Stored);
        assert_eq!(MatchConfig::for_level(1).kind, MatchKind::Fast);
        assert_eq!(MatchConfig::for_level(3).kind, MatchKind::Fast);
        assert_eq!(MatchConfig::for_level(4).kind, MatchKind::Slow);
        assert_eq!(MatchConfig::for_level(9).max_chain, 4096);
        assert_eq!(MatchConfig::for_level(9).nice_length, MAX_MATCH);
    }

    #[test]
    fn test_fill_window_copies_input() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let lz = filled(data);
        assert_eq!(lz.lookahead, data.len());
        assert_eq!(&lz.window[..data.len()], data);
    }

    #[test]
    fn test_finds_repeated_string() {
        let data = b"abcdefabcdefabcdef";
        let mut lz = filled(data);

        // Insert the first occurrence so the chain has a candidate.
        lz.reset_hash_at(0);
        for pos in 0..6 {
            lz.insert_string(pos);
        }
        lz.strstart = 6;
        lz.lookahead = data.len() - 6;

        let head = lz.head[lz.ins_h_of(6)] as usize;
        let (len, start) = lz.longest_match(head, MIN_MATCH - 1);
        assert!(len >= 6, "expected a match of at least 6, got {}", len);
        assert_eq!(start, 0);
    }

    #[test]
    fn test_rle_match() {
        let data = b"aaaaaaaaaa";
        let mut lz = filled(data);
        lz.strstart = 1;
        lz.lookahead = data.len() - 1;
        assert_eq!(lz.rle_match_length(), 9);
    }

    #[test]
    fn test_dictionary_preload() {
        let mut lz = LzState::new(15, 8);
        lz.preload_dictionary(b"hello world dictionary");
        assert_eq!(lz.strstart, 22);
        assert_eq!(lz.history(), b"hello world dictionary");
    }

    #[test]
    fn test_dictionary_truncated_to_window() {
        let mut lz = LzState::new(8, 1);
        let dict: Vec<u8> = (0..600u32).map(|i| (i & 0xFF) as u8).collect();
        lz.preload_dictionary(&dict);
        assert_eq!(lz.strstart, 256);
        assert_eq!(lz.history(), &dict[600 - 256..]);
    }

    impl LzState {
        /// Test helper: the bucket the string at `pos` hashes into.
        fn ins_h_of(&self, pos: usize) -> usize {
            let mut h = self.window[pos] as usize;
            h = self.update_hash(h, self.window[pos + 1]);
            self.update_hash(h, self.window[pos + 2])
        }
    }
}
