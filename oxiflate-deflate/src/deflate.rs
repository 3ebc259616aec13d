//! DEFLATE compression (deflate).
//!
//! The encoder streams: input bytes flow through the LZ77 match finder
//! into a symbol buffer; when the buffer fills or a flush is requested,
//! the buffered block is emitted as whichever of stored, fixed-Huffman,
//! or dynamic-Huffman is smallest. Formed bytes accumulate in a pending
//! buffer that is drained into the caller's output on every step call,
//! so the engine suspends cleanly when output space runs out.
//!
//! The zlib and gzip wrappers are written by the same engine: header on
//! the first step, trailer when the final block completes.

use oxiflate_core::bitstream::{BitSink, InputCursor, OutputCursor};
use oxiflate_core::checksum::{Adler32, Crc32};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressStatus, Compressor, FlushMode};
use oxiflate_core::window::{MAX_WBITS, MIN_WBITS};

use crate::gzip::{self, GzipHeader};
use crate::inflate::Format;
use crate::lz77::{LzState, MatchConfig, MatchKind, Strategy, MIN_LOOKAHEAD, TOO_FAR};
use crate::tables::{distance_to_code, length_to_code, MAX_MATCH, MIN_MATCH};
use crate::trees::{compress_block_static, DataType, Emitter, SymBuf, Trees};

/// Largest stored-block payload (16-bit length field).
const MAX_STORED: usize = 65535;

/// Encoder configuration.
#[derive(Debug, Clone, Copy)]
pub struct DeflateConfig {
    /// Compression level 0..=9 (-1 selects the default, 6).
    pub level: i32,
    /// Output framing (`Auto` is not valid for the encoder).
    pub format: Format,
    /// Window bits, 8..=15.
    pub wbits: u32,
    /// Memory level 1..=9: sizes the hash table and the per-block symbol
    /// buffer.
    pub mem_level: u32,
    /// Compression strategy.
    pub strategy: Strategy,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: -1,
            format: Format::Zlib,
            wbits: MAX_WBITS,
            mem_level: 8,
            strategy: Strategy::Default,
        }
    }
}

impl DeflateConfig {
    /// Configuration with an explicit level and the remaining defaults.
    pub fn with_level(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Decode zlib-style encoded window bits: `8..=15` selects the zlib
    /// wrapper, `-15..=-8` raw DEFLATE, `24..=31` gzip.
    pub fn from_window_bits(level: i32, wbits: i32) -> Result<Self> {
        let (format, wbits) = match wbits {
            8..=15 => (Format::Zlib, wbits as u32),
            -15..=-8 => (Format::Raw, (-wbits) as u32),
            24..=31 => (Format::Gzip, (wbits - 16) as u32),
            _ => {
                return Err(OxiFlateError::invalid_param(format!(
                    "invalid encoded window bits {}",
                    wbits
                )));
            }
        };
        Ok(Self {
            level,
            format,
            wbits,
            ..Self::default()
        })
    }

    fn validate(&self) -> Result<u8> {
        let level = match self.level {
            -1 => 6,
            0..=9 => self.level as u8,
            _ => {
                return Err(OxiFlateError::invalid_param(format!(
                    "compression level {} out of range",
                    self.level
                )));
            }
        };
        if !(MIN_WBITS..=MAX_WBITS).contains(&self.wbits) {
            return Err(OxiFlateError::invalid_param(format!(
                "window bits {} out of range",
                self.wbits
            )));
        }
        if !(1..=9).contains(&self.mem_level) {
            return Err(OxiFlateError::invalid_param(format!(
                "memory level {} out of range",
                self.mem_level
            )));
        }
        if self.format == Format::Auto {
            return Err(OxiFlateError::invalid_param(
                "auto format detection is decoder-only",
            ));
        }
        Ok(level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Start,
    Busy,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    NeedMore,
    BlockDone,
    FinishDone,
}

#[derive(Debug, Clone)]
enum WrapCheck {
    None,
    Adler(Adler32),
    Crc(Crc32),
}

impl WrapCheck {
    fn update(&mut self, data: &[u8]) {
        match self {
            WrapCheck::None => {}
            WrapCheck::Adler(a) => a.update(data),
            WrapCheck::Crc(c) => c.update(data),
        }
    }

    fn value(&self) -> u32 {
        match self {
            WrapCheck::None => 0,
            WrapCheck::Adler(a) => a.finish(),
            WrapCheck::Crc(c) => c.finish(),
        }
    }

    fn reset_for(format: Format) -> Self {
        match format {
            Format::Raw => WrapCheck::None,
            Format::Zlib => WrapCheck::Adler(Adler32::new()),
            Format::Gzip | Format::Auto => WrapCheck::Crc(Crc32::new()),
        }
    }
}

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    level: u8,
    strategy: Strategy,
    format: Format,
    mem_level: u32,
    status: Status,

    lz: LzState,
    syms: SymBuf,
    trees: Trees,
    sink: BitSink,
    pending: Vec<u8>,
    pending_pos: usize,

    /// Level-0 staging buffer for stored blocks.
    stored_buf: Vec<u8>,

    // Lazy-match bookkeeping carried across step calls.
    match_length: usize,
    prev_length: usize,
    prev_match: usize,
    match_available: bool,

    check: WrapCheck,
    dict_id: Option<u32>,
    gzip_header: GzipHeader,
    data_type: DataType,

    /// A flush marker was emitted and no input has arrived since;
    /// repeating the same flush must not emit another marker.
    just_flushed: bool,

    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create an encoder with the given level and the default zlib
    /// wrapper.
    pub fn new(level: i32) -> Self {
        Self::with_config(DeflateConfig::with_level(level))
            .expect("default deflate configuration is valid")
    }

    /// Create an encoder with an explicit configuration.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        let level = config.validate()?;
        let lit_bufsize = 1usize << (config.mem_level + 6);
        // A 256-byte window cannot hold the required lookahead margin;
        // use 512 bytes, which every decoder window accepts.
        let wbits = config.wbits.max(9);
        let mut lz = LzState::new(wbits, config.mem_level);
        lz.config = MatchConfig::for_level(level);
        Ok(Self {
            level,
            strategy: config.strategy,
            format: config.format,
            mem_level: config.mem_level,
            status: Status::Start,
            lz,
            syms: SymBuf::new(lit_bufsize),
            trees: Trees::new(),
            sink: BitSink::new(),
            pending: Vec::new(),
            pending_pos: 0,
            stored_buf: Vec::new(),
            match_length: MIN_MATCH - 1,
            prev_length: MIN_MATCH - 1,
            prev_match: 0,
            match_available: false,
            check: WrapCheck::reset_for(config.format),
            dict_id: None,
            gzip_header: GzipHeader::default(),
            data_type: DataType::Unknown,
            just_flushed: false,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Return to the post-init state, keeping allocations.
    pub fn reset(&mut self) {
        self.status = Status::Start;
        self.lz.reset();
        self.lz.config = MatchConfig::for_level(self.level);
        self.syms.clear();
        self.trees = Trees::new();
        self.sink.clear();
        self.pending.clear();
        self.pending_pos = 0;
        self.stored_buf.clear();
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.match_available = false;
        self.check = WrapCheck::reset_for(self.format);
        self.dict_id = None;
        self.data_type = DataType::Unknown;
        self.just_flushed = false;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Total uncompressed bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total compressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// The running wrapper checksum over the consumed input.
    pub fn checksum(&self) -> u32 {
        self.check.value()
    }

    /// Best-effort classification of the input seen so far.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Replace the gzip header metadata (mtime, name, comment, extra,
    /// hcrc) emitted for a gzip stream. Only valid before the first step.
    pub fn set_gzip_header(&mut self, header: GzipHeader) -> Result<()> {
        if self.status != Status::Start {
            return Err(OxiFlateError::stream_state(
                "gzip header must be set before compression starts",
            ));
        }
        if self.format != Format::Gzip {
            return Err(OxiFlateError::stream_state(
                "stream does not use the gzip wrapper",
            ));
        }
        self.gzip_header = header;
        Ok(())
    }

    /// Pre-feed up to a window of dictionary bytes into the match
    /// finder's history without emitting output. Returns the dictionary's
    /// Adler-32, which a zlib decoder will require.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.status != Status::Start || self.total_in != 0 {
            return Err(OxiFlateError::stream_state(
                "dictionary must be set before compression starts",
            ));
        }
        if self.format == Format::Gzip {
            return Err(OxiFlateError::stream_state(
                "the gzip format has no preset dictionary",
            ));
        }
        let id = Adler32::checksum(dictionary);
        self.lz.preload_dictionary(dictionary);
        self.dict_id = Some(id);
        Ok(id)
    }

    /// Export up to a window of current match history (dictionary
    /// export).
    pub fn get_dictionary(&self) -> Vec<u8> {
        self.lz.history().to_vec()
    }

    /// Switch compression level and strategy mid-stream. Any buffered
    /// symbols are flushed as a block with the old parameters first.
    pub fn set_params(&mut self, level: i32, strategy: Strategy) -> Result<()> {
        let level = match level {
            -1 => 6,
            0..=9 => level as u8,
            _ => {
                return Err(OxiFlateError::invalid_param(format!(
                    "compression level {} out of range",
                    level
                )));
            }
        };
        if self.match_available {
            let byte = self.lz.window[self.lz.strstart - 1];
            self.tally_lit(byte);
            self.match_available = false;
        }
        self.match_length = MIN_MATCH - 1;
        if !self.syms.is_empty() || self.lz.block_start != self.lz.strstart as i64 {
            self.flush_block(false);
        }
        if !self.stored_buf.is_empty() {
            let mut emit = Emitter {
                sink: &mut self.sink,
                pending: &mut self.pending,
            };
            emit.stored_block(&self.stored_buf, false);
            self.stored_buf.clear();
        }
        self.level = level;
        self.strategy = strategy;
        self.lz.config = MatchConfig::for_level(level);
        Ok(())
    }

    /// Override the match-search parameters directly.
    pub fn tune(&mut self, good_length: usize, max_lazy: usize, nice_length: usize, max_chain: usize) {
        self.lz.config.good_length = good_length;
        self.lz.config.max_lazy = max_lazy;
        self.lz.config.nice_length = nice_length;
        self.lz.config.max_chain = max_chain;
    }

    /// An upper bound on the compressed size of `source_len` input bytes
    /// under the current parameters.
    pub fn bound(&self, source_len: u64) -> u64 {
        let wrap_len: u64 = match self.format {
            Format::Raw => 0,
            Format::Zlib => 6 + if self.dict_id.is_some() { 4 } else { 0 },
            Format::Gzip | Format::Auto => {
                let h = &self.gzip_header;
                let mut len = 18u64;
                if let Some(extra) = &h.extra {
                    len += 2 + extra.len() as u64;
                }
                if let Some(name) = &h.name {
                    len += name.len() as u64 + 1;
                }
                if let Some(comment) = &h.comment {
                    len += comment.len() as u64 + 1;
                }
                if h.hcrc {
                    len += 2;
                }
                len
            }
        };

        // The tight bound relies on the default block-buffer sizing; any
        // other sizing falls back to the fixed-codes bound.
        if self.lz.wsize == 1 << MAX_WBITS && self.mem_level == 8 {
            source_len + (source_len >> 12) + (source_len >> 14) + (source_len >> 25) + 7 + wrap_len
        } else {
            source_len + ((source_len + 7) >> 3) + ((source_len + 63) >> 6) + 5 + wrap_len
        }
    }

    /// Whether the stream has been finished and fully drained.
    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished && self.pending_len() == 0
    }

    fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_pos
    }

    fn drain_pending(&mut self, dst: &mut OutputCursor<'_>) {
        if self.pending_pos < self.pending.len() {
            let n = dst.write_slice(&self.pending[self.pending_pos..]);
            self.pending_pos += n;
            if self.pending_pos == self.pending.len() {
                self.pending.clear();
                self.pending_pos = 0;
            }
        }
    }

    fn fill(&mut self, src: &mut InputCursor<'_>) {
        let check = &mut self.check;
        let total_in = &mut self.total_in;
        self.lz.fill_window(src, |data| {
            check.update(data);
            *total_in += data.len() as u64;
        });
    }

    fn tally_lit(&mut self, byte: u8) -> bool {
        self.trees.dyn_ltree[byte as usize].freq += 1;
        self.syms.push_literal(byte)
    }

    fn tally_match(&mut self, dist: u16, length: u16) -> bool {
        let (lcode, _, _) = length_to_code(length);
        self.trees.dyn_ltree[lcode as usize].freq += 1;
        let (dcode, _, _) = distance_to_code(dist);
        self.trees.dyn_dtree[dcode as usize].freq += 1;
        self.syms.push_match(dist, length)
    }

    /// Close the buffered block, choosing the smallest of stored, fixed,
    /// and dynamic encodings.
    fn flush_block(&mut self, last: bool) {
        let stored_start = if self.lz.block_start >= 0 {
            Some(self.lz.block_start as usize)
        } else {
            None
        };
        let stored_len = (self.lz.strstart as i64 - self.lz.block_start).max(0) as u64;

        if self.data_type == DataType::Unknown {
            self.data_type = self.trees.detect_data_type();
        }

        let max_blindex = self.trees.build_trees();
        let mut opt_lenb = self.trees.opt_len_bytes();
        let static_lenb = self.trees.static_len_bytes();
        if self.strategy == Strategy::Fixed || static_lenb <= opt_lenb {
            opt_lenb = static_lenb;
        }

        let mut emit = Emitter {
            sink: &mut self.sink,
            pending: &mut self.pending,
        };

        if stored_len + 4 <= opt_lenb
            && stored_start.is_some()
            && stored_len <= MAX_STORED as u64
        {
            let start = stored_start.unwrap();
            emit.stored_block(&self.lz.window[start..start + stored_len as usize], last);
        } else if self.strategy == Strategy::Fixed || static_lenb == opt_lenb {
            emit.static_header(last);
            compress_block_static(&mut emit, &self.syms);
        } else {
            emit.dynamic_header(last);
            self.trees.send_all_trees(&mut emit, max_blindex);
            self.trees.compress_block_dynamic(&mut emit, &self.syms);
        }
        if last {
            emit.align();
        }

        self.trees.init_block();
        self.syms.clear();
        self.lz.block_start = self.lz.strstart as i64;
    }

    fn write_header(&mut self) {
        match self.format {
            Format::Raw => {}
            Format::Zlib => {
                let cinfo = self.lz.wsize.trailing_zeros() - 8;
                let cmf = ((cinfo as u8) << 4) | 8;
                let level_flags: u8 = if self.strategy == Strategy::HuffmanOnly || self.level < 2 {
                    0
                } else if self.level < 6 {
                    1
                } else if self.level == 6 {
                    2
                } else {
                    3
                };
                let mut flg = level_flags << 6;
                if self.dict_id.is_some() {
                    flg |= 0x20;
                }
                let check = (cmf as u16) * 256 + flg as u16;
                let fcheck = (31 - check % 31) % 31;
                let flg = flg | fcheck as u8;

                self.pending.push(cmf);
                self.pending.push(flg);
                if let Some(id) = self.dict_id {
                    self.pending.extend_from_slice(&id.to_be_bytes());
                }
            }
            Format::Gzip | Format::Auto => {
                let start = self.pending.len();
                let h = &self.gzip_header;
                let mut flags = 0u8;
                if h.text {
                    flags |= gzip::FTEXT;
                }
                if h.hcrc {
                    flags |= gzip::FHCRC;
                }
                if h.extra.is_some() {
                    flags |= gzip::FEXTRA;
                }
                if h.name.is_some() {
                    flags |= gzip::FNAME;
                }
                if h.comment.is_some() {
                    flags |= gzip::FCOMMENT;
                }
                let xfl: u8 = if self.level >= 9 {
                    2
                } else if self.level <= 1 {
                    4
                } else {
                    0
                };

                self.pending.extend_from_slice(&[0x1F, 0x8B, 8, flags]);
                self.pending.extend_from_slice(&h.mtime.to_le_bytes());
                self.pending.push(xfl);
                self.pending.push(h.os);
                if let Some(extra) = &h.extra {
                    self.pending
                        .extend_from_slice(&(extra.len() as u16).to_le_bytes());
                    self.pending.extend_from_slice(extra);
                }
                if let Some(name) = &h.name {
                    self.pending.extend_from_slice(name);
                    self.pending.push(0);
                }
                if let Some(comment) = &h.comment {
                    self.pending.extend_from_slice(comment);
                    self.pending.push(0);
                }
                if h.hcrc {
                    let crc = Crc32::checksum(&self.pending[start..]);
                    self.pending
                        .extend_from_slice(&((crc & 0xFFFF) as u16).to_le_bytes());
                }
            }
        }
    }

    fn write_trailer(&mut self) {
        self.sink.flush_to_byte(&mut self.pending);
        match self.format {
            Format::Raw => {}
            Format::Zlib => {
                let adler = self.check.value();
                self.pending.extend_from_slice(&adler.to_be_bytes());
            }
            Format::Gzip | Format::Auto => {
                let crc = self.check.value();
                self.pending.extend_from_slice(&crc.to_le_bytes());
                let isize = (self.total_in & 0xFFFF_FFFF) as u32;
                self.pending.extend_from_slice(&isize.to_le_bytes());
            }
        }
    }

    /// Advance the encoder: the step operation of the streaming
    /// interface.
    pub fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let mut src = InputCursor::new(input);
        let mut dst = OutputCursor::new(output);

        if self.status == Status::Start {
            self.write_header();
            self.status = Status::Busy;
        }

        self.drain_pending(&mut dst);

        if !src.is_empty() {
            self.just_flushed = false;
        }
        let redundant_flush = self.just_flushed
            && matches!(flush, FlushMode::Partial | FlushMode::Sync | FlushMode::Full)
            && src.is_empty()
            && self.lz.lookahead == 0;

        if self.status == Status::Busy
            && !redundant_flush
            && (!src.is_empty() || self.lz.lookahead > 0 || flush != FlushMode::None)
        {
            let bstate = self.run_compressor(&mut src, flush);

            match bstate {
                BlockState::BlockDone => {
                    let mut emit = Emitter {
                        sink: &mut self.sink,
                        pending: &mut self.pending,
                    };
                    match flush {
                        FlushMode::Partial => emit.align_block(),
                        FlushMode::Sync | FlushMode::Full => {
                            emit.stored_block(&[], false);
                            if flush == FlushMode::Full {
                                self.lz.clear_hash();
                                if self.lz.lookahead == 0 {
                                    self.lz.strstart = 0;
                                    self.lz.block_start = 0;
                                    self.lz.insert = 0;
                                }
                            }
                        }
                        _ => {}
                    }
                    if matches!(
                        flush,
                        FlushMode::Partial | FlushMode::Sync | FlushMode::Full
                    ) {
                        self.just_flushed = true;
                    }
                }
                BlockState::FinishDone => {
                    self.write_trailer();
                    self.status = Status::Finished;
                }
                BlockState::NeedMore => {}
            }
        }

        self.drain_pending(&mut dst);
        self.total_out += dst.produced() as u64;

        let status = if self.status == Status::Finished && self.pending_len() == 0 {
            CompressStatus::Done
        } else if self.pending_len() > 0 && dst.is_full() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        };
        Ok((src.consumed(), dst.produced(), status))
    }

    fn run_compressor(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        match (self.level, self.strategy) {
            (0, _) => self.deflate_stored(src, flush),
            (_, Strategy::HuffmanOnly) => self.deflate_huff(src, flush),
            (_, Strategy::Rle) => self.deflate_rle(src, flush),
            _ => match self.lz.config.kind {
                MatchKind::Stored => self.deflate_stored(src, flush),
                MatchKind::Fast => self.deflate_fast(src, flush),
                MatchKind::Slow => self.deflate_slow(src, flush),
            },
        }
    }

    /// Level 0: raw bytes staged into stored blocks of up to 65535 bytes.
    /// A full buffer is held until more input proves it is not the final
    /// block, so an exact multiple of 65535 bytes still ends on a real
    /// block instead of an empty one.
    fn deflate_stored(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        loop {
            if self.stored_buf.len() == MAX_STORED {
                if src.is_empty() {
                    break;
                }
                let mut emit = Emitter {
                    sink: &mut self.sink,
                    pending: &mut self.pending,
                };
                emit.stored_block(&self.stored_buf, false);
                self.stored_buf.clear();
            }
            let space = MAX_STORED - self.stored_buf.len();
            let chunk = src.take(space);
            if chunk.is_empty() {
                break;
            }
            self.check.update(chunk);
            self.total_in += chunk.len() as u64;
            self.stored_buf.extend_from_slice(chunk);
        }

        if flush == FlushMode::None {
            return BlockState::NeedMore;
        }

        let last = flush == FlushMode::Finish;
        if last || !self.stored_buf.is_empty() {
            let mut emit = Emitter {
                sink: &mut self.sink,
                pending: &mut self.pending,
            };
            emit.stored_block(&self.stored_buf, last);
            self.stored_buf.clear();
        }
        if last {
            BlockState::FinishDone
        } else {
            BlockState::BlockDone
        }
    }

    /// Levels 1-3: greedy matching, no lazy deferral.
    fn deflate_fast(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lz.lookahead < MIN_LOOKAHEAD {
                self.fill(src);
                if self.lz.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lz.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.lz.lookahead >= MIN_MATCH {
                hash_head = self.lz.insert_string(self.lz.strstart);
            }

            self.match_length = MIN_MATCH - 1;
            if hash_head != 0 && self.lz.strstart - hash_head <= self.lz.max_dist() {
                let (len, start) = self.lz.longest_match(hash_head, MIN_MATCH - 1);
                self.match_length = len;
                self.lz.match_start = start;
            }

            let bflush;
            if self.match_length >= MIN_MATCH {
                let dist = (self.lz.strstart - self.lz.match_start) as u16;
                bflush = self.tally_match(dist, self.match_length as u16);
                self.lz.lookahead -= self.match_length;

                if self.match_length <= self.lz.config.max_lazy && self.lz.lookahead >= MIN_MATCH {
                    self.match_length -= 1;
                    while self.match_length != 0 {
                        self.lz.strstart += 1;
                        self.lz.insert_string(self.lz.strstart);
                        self.match_length -= 1;
                    }
                    self.lz.strstart += 1;
                } else {
                    self.lz.strstart += self.match_length;
                    self.match_length = 0;
                    self.lz.reset_hash_at(self.lz.strstart);
                }
            } else {
                bflush = self.tally_lit(self.lz.window[self.lz.strstart]);
                self.lz.lookahead -= 1;
                self.lz.strstart += 1;
            }
            if bflush {
                self.flush_block(false);
            }
        }

        self.finish_run(flush)
    }

    /// Levels 4-9: lazy matching, deferring a match when the next
    /// position holds a strictly longer one.
    fn deflate_slow(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lz.lookahead < MIN_LOOKAHEAD {
                self.fill(src);
                if self.lz.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lz.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.lz.lookahead >= MIN_MATCH {
                hash_head = self.lz.insert_string(self.lz.strstart);
            }

            self.prev_length = self.match_length;
            self.prev_match = self.lz.match_start;
            self.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && self.prev_length < self.lz.config.max_lazy
                && self.lz.strstart - hash_head <= self.lz.max_dist()
            {
                // Only a strictly longer match than the deferred one is
                // worth reporting.
                let (len, start) = self.lz.longest_match(hash_head, self.prev_length);
                self.match_length = len;
                self.lz.match_start = start;

                if self.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (self.match_length == MIN_MATCH
                            && self.lz.strstart - self.lz.match_start > TOO_FAR))
                {
                    self.match_length = MIN_MATCH - 1;
                }
            }

            if self.prev_length >= MIN_MATCH && self.match_length <= self.prev_length {
                let max_insert = self.lz.strstart + self.lz.lookahead - MIN_MATCH;
                let dist = (self.lz.strstart - 1 - self.prev_match) as u16;
                let bflush = self.tally_match(dist, self.prev_length as u16);

                // The match swallows prev_length-1 more input positions;
                // keep the hash chains current for those still in range.
                self.lz.lookahead -= self.prev_length - 1;
                let inserts = self.prev_length - 2;
                for _ in 0..inserts {
                    self.lz.strstart += 1;
                    if self.lz.strstart <= max_insert {
                        self.lz.insert_string(self.lz.strstart);
                    }
                }
                self.match_available = false;
                self.match_length = MIN_MATCH - 1;
                self.lz.strstart += 1;

                if bflush {
                    self.flush_block(false);
                }
            } else if self.match_available {
                // The previous byte loses: emit it as a literal and keep
                // evaluating from the current position.
                let byte = self.lz.window[self.lz.strstart - 1];
                let bflush = self.tally_lit(byte);
                if bflush {
                    self.flush_block(false);
                }
                self.lz.strstart += 1;
                self.lz.lookahead -= 1;
            } else {
                self.match_available = true;
                self.lz.strstart += 1;
                self.lz.lookahead -= 1;
            }
        }

        if self.match_available {
            let byte = self.lz.window[self.lz.strstart - 1];
            self.tally_lit(byte);
            self.match_available = false;
        }
        self.finish_run(flush)
    }

    /// `Strategy::Rle`: distance-one matches only.
    fn deflate_rle(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lz.lookahead <= MAX_MATCH {
                self.fill(src);
                if self.lz.lookahead <= MAX_MATCH && flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                if self.lz.lookahead == 0 {
                    break;
                }
            }

            let run = self.lz.rle_match_length();
            let bflush = if run >= MIN_MATCH {
                let run = run.min(self.lz.lookahead);
                let b = self.tally_match(1, run as u16);
                self.lz.lookahead -= run;
                self.lz.strstart += run;
                b
            } else {
                let b = self.tally_lit(self.lz.window[self.lz.strstart]);
                self.lz.lookahead -= 1;
                self.lz.strstart += 1;
                b
            };
            if bflush {
                self.flush_block(false);
            }
        }
        self.finish_run(flush)
    }

    /// `Strategy::HuffmanOnly`: no match search at all.
    fn deflate_huff(&mut self, src: &mut InputCursor<'_>, flush: FlushMode) -> BlockState {
        loop {
            if self.lz.lookahead == 0 {
                self.fill(src);
                if self.lz.lookahead == 0 {
                    if flush == FlushMode::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            let bflush = self.tally_lit(self.lz.window[self.lz.strstart]);
            self.lz.lookahead -= 1;
            self.lz.strstart += 1;
            if bflush {
                self.flush_block(false);
            }
        }
        self.finish_run(flush)
    }

    fn finish_run(&mut self, flush: FlushMode) -> BlockState {
        self.lz.insert = self.lz.strstart.min(MIN_MATCH - 1);
        if flush == FlushMode::Finish {
            self.flush_block(true);
            return BlockState::FinishDone;
        }
        if !self.syms.is_empty() {
            self.flush_block(false);
        }
        BlockState::BlockDone
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        self.step(input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Deflater::is_finished(self)
    }
}

/// Compress a complete buffer as a raw DEFLATE stream.
pub fn deflate(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_config(DeflateConfig {
        level,
        format: Format::Raw,
        ..DeflateConfig::default()
    })?;
    deflater.compress_all(data)
}
