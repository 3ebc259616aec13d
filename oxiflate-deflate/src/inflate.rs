//! DEFLATE decompression (inflate).
//!
//! The decoder is an explicit state machine driven by bit availability:
//! any state may suspend by returning control to the caller with "needs
//! input" or "needs output", and the next step call resumes in the same
//! state with the same bit accumulator. This makes the engine usable with
//! arbitrarily chunked input and output buffers, down to one byte at a
//! time.
//!
//! Framing is handled in the same machine: raw DEFLATE, the zlib wrapper
//! (RFC 1950), the gzip wrapper (RFC 1952) including its optional header
//! fields, and an auto-detect mode that also spans concatenated gzip
//! members.

use oxiflate_core::bitstream::{BitBuf, InputCursor, OutputCursor};
use oxiflate_core::checksum::{Adler32, Crc32};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{DecompressStatus, Decompressor, FlushMode};
use oxiflate_core::window::{Window, MAX_WBITS, MIN_WBITS};

use crate::gzip::{self, GzipHeader};
use crate::inftree::{
    build_table, fixed_tables, BuildError, Code, CodeKind, ENOUGH, FIXED_DIST_BITS,
    FIXED_LEN_BITS,
};
use crate::tables::{
    CODELEN_SYMBOLS, CODE_LENGTH_ORDER, DIST_SYMBOLS, END_OF_BLOCK, LITLEN_SYMBOLS,
};

/// Longest NAME/COMMENT field retained during header collection; longer
/// fields are still consumed but truncated.
const FIELD_CAP: usize = 65536;

/// Wrapper format the decoder expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Raw DEFLATE, no wrapper.
    Raw,
    /// zlib wrapper (RFC 1950).
    #[default]
    Zlib,
    /// gzip wrapper (RFC 1952).
    Gzip,
    /// Detect zlib or gzip from the first bytes; spans concatenated gzip
    /// members.
    Auto,
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy)]
pub struct InflateConfig {
    /// Expected wrapper.
    pub format: Format,
    /// Window bits, 8..=15.
    pub wbits: u32,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            format: Format::Zlib,
            wbits: MAX_WBITS,
        }
    }
}

impl InflateConfig {
    /// Configuration from an explicit format and window size.
    pub fn new(format: Format, wbits: u32) -> Result<Self> {
        if !(MIN_WBITS..=MAX_WBITS).contains(&wbits) {
            return Err(OxiFlateError::invalid_param(format!(
                "window bits {} out of range {}..={}",
                wbits, MIN_WBITS, MAX_WBITS
            )));
        }
        Ok(Self { format, wbits })
    }

    /// Decode zlib-style encoded window bits: `8..=15` selects the zlib
    /// wrapper, `-15..=-8` raw DEFLATE, `24..=31` gzip, and `40..=47`
    /// auto-detection.
    pub fn from_window_bits(wbits: i32) -> Result<Self> {
        match wbits {
            8..=15 => Self::new(Format::Zlib, wbits as u32),
            -15..=-8 => Self::new(Format::Raw, (-wbits) as u32),
            24..=31 => Self::new(Format::Gzip, (wbits - 16) as u32),
            40..=47 => Self::new(Format::Auto, (wbits - 32) as u32),
            _ => Err(OxiFlateError::invalid_param(format!(
                "invalid encoded window bits {}",
                wbits
            ))),
        }
    }
}

/// Decoder states. Each maps to a resumption point; the names follow the
/// order fields appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Flags,
    Time,
    Os,
    ExLen,
    Extra,
    Name,
    Comment,
    Hcrc,
    DictId,
    Dict,
    BlockHead,
    StoredReady,
    StoredLen,
    StoredCopy,
    Table,
    LenLens,
    CodeLens,
    LenReady,
    Len,
    LenExt,
    Dist,
    DistExt,
    Match,
    Lit,
    Check,
    Length,
    Done,
    Bad(&'static str),
}

/// Running wrapper checksum.
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
}

/// Decode one symbol through a root-plus-sub-table pair, pulling input a
/// byte at a time. Returns `None` (with the accumulator intact) when the
/// input runs dry, so a suspended call can retry the same lookup.
fn decode_sym(
    table: &[Code],
    root: u32,
    bits: &mut BitBuf,
    src: &mut InputCursor<'_>,
) -> Option<Code> {
    let mut here;
    loop {
        here = table[bits.bits(root) as usize];
        if (here.bits as u32) <= bits.count() {
            break;
        }
        if !bits.pull_byte(src) {
            return None;
        }
    }

    if here.op != 0 && here.op & 0xF0 == 0 {
        let last = here;
        loop {
            let idx = last.val as usize
                + (bits.bits(last.bits as u32 + last.op as u32) >> last.bits as u32) as usize;
            here = table[idx];
            if (last.bits as u32 + here.bits as u32) <= bits.count() {
                break;
            }
            if !bits.pull_byte(src) {
                return None;
            }
        }
        bits.drop_bits(last.bits as u32);
    }

    bits.drop_bits(here.bits as u32);
    Some(here)
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    state: State,
    format: Format,
    wbits: u32,
    /// Whether the current member carries gzip framing (resolved per
    /// member in auto mode).
    member_gzip: bool,
    window: Window,
    bits: BitBuf,
    last: bool,

    stored_len: usize,

    nlen: usize,
    ndist: usize,
    ncode: usize,
    have: usize,
    lens: [u16; 320],
    work: [u16; 288],
    codes: Vec<Code>,
    lenoff: usize,
    lenbits: u32,
    distoff: usize,
    distbits: u32,
    fixed_active: bool,

    length: usize,
    offset: usize,
    extra: u32,

    check: WrapCheck,
    header_crc: Crc32,
    dict_expected: u32,
    have_dict: bool,

    gz_flags: u32,
    field_len: usize,
    head: Option<GzipHeader>,
    head_done: bool,

    total_in: u64,
    total_out: u64,
    member_out: u64,

    sane: bool,
    boundary_paused: bool,
    sync_got: usize,

    /// Per-call: output bytes already folded into window/check.
    synced: usize,
    /// Per-call: output offset where the current member began.
    member_base: usize,
}

impl Inflater {
    /// Create a decoder for the default zlib wrapper with a 32 KiB
    /// window.
    pub fn new() -> Self {
        Self::with_config(InflateConfig::default())
    }

    /// Create a decoder with an explicit configuration.
    pub fn with_config(config: InflateConfig) -> Self {
        let mut inflater = Self {
            state: State::Head,
            format: config.format,
            wbits: config.wbits,
            member_gzip: false,
            window: Window::new(config.wbits),
            bits: BitBuf::new(),
            last: false,
            stored_len: 0,
            nlen: 0,
            ndist: 0,
            ncode: 0,
            have: 0,
            lens: [0; 320],
            work: [0; 288],
            codes: vec![Code::default(); ENOUGH],
            lenoff: 0,
            lenbits: 0,
            distoff: 0,
            distbits: 0,
            fixed_active: false,
            length: 0,
            offset: 0,
            extra: 0,
            check: WrapCheck::None,
            header_crc: Crc32::new(),
            dict_expected: 0,
            have_dict: false,
            gz_flags: 0,
            field_len: 0,
            head: None,
            head_done: false,
            total_in: 0,
            total_out: 0,
            member_out: 0,
            sane: true,
            boundary_paused: false,
            sync_got: 0,
            synced: 0,
            member_base: 0,
        };
        inflater.reset();
        inflater
    }

    /// Return to the post-init state, keeping allocations.
    pub fn reset(&mut self) {
        self.state = match self.format {
            Format::Raw => State::BlockHead,
            _ => State::Head,
        };
        self.member_gzip = matches!(self.format, Format::Gzip);
        self.window.clear();
        self.bits.clear();
        self.last = false;
        self.stored_len = 0;
        self.have = 0;
        self.fixed_active = false;
        self.length = 0;
        self.offset = 0;
        self.extra = 0;
        self.check = WrapCheck::None;
        self.header_crc.reset();
        self.dict_expected = 0;
        self.have_dict = false;
        self.gz_flags = 0;
        self.field_len = 0;
        self.head_done = false;
        self.total_in = 0;
        self.total_out = 0;
        self.member_out = 0;
        self.boundary_paused = false;
        self.sync_got = 0;
    }

    /// Total compressed bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total decompressed bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// The running wrapper checksum over the produced output.
    pub fn checksum(&self) -> u32 {
        self.check.value()
    }

    /// Disable strict distance validation: a back-reference reaching past
    /// the available history then produces zero bytes instead of a data
    /// error, accepting streams from some historical PKZIP encoders.
    pub fn set_lenient_distances(&mut self, lenient: bool) {
        self.sane = !lenient;
    }

    /// Ask the decoder to record the gzip header fields of the next
    /// member; retrieve them with [`Inflater::header`].
    pub fn collect_header(&mut self) {
        self.head = Some(GzipHeader::default());
        self.head_done = false;
    }

    /// The collected gzip header, once fully parsed.
    pub fn header(&self) -> Option<&GzipHeader> {
        if self.head_done {
            self.head.as_ref()
        } else {
            None
        }
    }

    /// Adler-32 the stream expects for its preset dictionary (valid once
    /// the decoder has reported [`DecompressStatus::NeedDict`]).
    pub fn dictionary_id(&self) -> u32 {
        self.dict_expected
    }

    /// Supply the preset dictionary the stream asked for.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self.state {
            State::Dict => {
                let id = Adler32::checksum(dictionary);
                if id != self.dict_expected {
                    return Err(OxiFlateError::dictionary_mismatch(self.dict_expected));
                }
                self.window.preload(dictionary);
                self.have_dict = true;
                Ok(())
            }
            // A raw stream has no dictionary id; accept it before any
            // output has been produced.
            State::BlockHead if self.format == Format::Raw && self.total_out == 0 => {
                self.window.preload(dictionary);
                self.have_dict = true;
                Ok(())
            }
            _ => Err(OxiFlateError::stream_state(
                "stream is not waiting for a dictionary",
            )),
        }
    }

    /// Export up to a window of decompression history (dictionary
    /// export).
    pub fn get_dictionary(&self) -> Vec<u8> {
        self.window.history()
    }

    /// Whether the stream has ended and its trailer verified.
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Search the given input for a stored-block sync marker
    /// (`00 00 FF FF`). Returns the bytes consumed and whether the marker
    /// was found; on success the decoder is repositioned to decode from
    /// the byte after the marker, clearing any sticky data error.
    pub fn sync(&mut self, input: &[u8]) -> (usize, bool) {
        let pattern_byte = |got: usize| if got < 2 { 0x00u8 } else { 0xFFu8 };
        let mut used = 0;
        for &byte in input {
            used += 1;
            if byte == pattern_byte(self.sync_got) {
                self.sync_got += 1;
                if self.sync_got == 4 {
                    break;
                }
            } else if byte != 0 {
                self.sync_got = 0;
            } else {
                self.sync_got = 4 - self.sync_got;
            }
        }
        self.total_in += used as u64;

        if self.sync_got == 4 {
            self.sync_got = 0;
            self.bits.clear();
            self.state = State::BlockHead;
            self.last = false;
            (used, true)
        } else {
            (used, false)
        }
    }

    fn fail(&mut self, msg: &'static str, src: &InputCursor<'_>) -> OxiFlateError {
        self.state = State::Bad(msg);
        OxiFlateError::corrupted(self.total_in + src.consumed() as u64, msg)
    }

    fn sync_progress(&mut self, dst: &OutputCursor<'_>) {
        let written = dst.written();
        let new = &written[self.synced..];
        if !new.is_empty() {
            self.check.update(new);
            self.window.update(new);
            self.total_out += new.len() as u64;
            self.member_out += new.len() as u64;
            self.synced = written.len();
        }
    }

    fn restart_member(&mut self, dst: &OutputCursor<'_>) {
        self.last = false;
        self.member_out = 0;
        self.member_base = dst.produced();
        self.window.clear();
        self.header_crc.reset();
        self.check = WrapCheck::None;
        self.have_dict = false;
        self.boundary_paused = false;
        self.state = State::Head;
    }

    /// Advance the decoder: the step operation of the streaming
    /// interface.
    pub fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, DecompressStatus)> {
        if let State::Bad(msg) = self.state {
            return Err(OxiFlateError::corrupted(self.total_in, msg));
        }
        if self.state == State::Done {
            return Ok((0, 0, DecompressStatus::Done));
        }

        let mut src = InputCursor::new(input);
        let mut dst = OutputCursor::new(output);
        self.synced = 0;
        self.member_base = 0;
        if !matches!(flush, FlushMode::Block | FlushMode::Trees) {
            self.boundary_paused = false;
        }

        let status = self.run(&mut src, &mut dst, flush);
        self.sync_progress(&dst);
        self.total_in += src.consumed() as u64;

        match status {
            Ok(s) => Ok((src.consumed(), dst.produced(), s)),
            Err(e) => Err(e),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run(
        &mut self,
        src: &mut InputCursor<'_>,
        dst: &mut OutputCursor<'_>,
        flush: FlushMode,
    ) -> Result<DecompressStatus> {
        loop {
            match self.state {
                State::Head => {
                    match self.format {
                        Format::Raw => {
                            self.state = State::BlockHead;
                            continue;
                        }
                        Format::Zlib => {}
                        Format::Gzip | Format::Auto => {
                            if !self.bits.need(16, src) {
                                return Ok(DecompressStatus::NeedsInput);
                            }
                            if self.bits.bits(16) == 0x8B1F {
                                // gzip magic, LSB-first
                                self.member_gzip = true;
                                self.header_crc.reset();
                                self.header_crc.update(&[0x1F, 0x8B]);
                                self.bits.drop_bits(16);
                                self.state = State::Flags;
                                continue;
                            }
                            if self.format == Format::Gzip {
                                return Err(self.fail("incorrect header check", src));
                            }
                            self.member_gzip = false;
                        }
                    }

                    // zlib header: CMF then FLG.
                    if !self.bits.need(16, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(16);
                    let cmf = hold & 0xFF;
                    if ((cmf << 8) + (hold >> 8)) % 31 != 0 {
                        return Err(self.fail("incorrect header check", src));
                    }
                    if cmf & 0x0F != 8 {
                        return Err(self.fail("unknown compression method", src));
                    }
                    let len = (cmf >> 4) + 8;
                    if len > self.wbits {
                        return Err(self.fail("invalid window size", src));
                    }
                    let fdict = hold & 0x2000 != 0;
                    self.bits.drop_bits(16);
                    self.check = WrapCheck::Adler(Adler32::new());
                    self.state = if fdict { State::DictId } else { State::BlockHead };
                }

                State::Flags => {
                    if !self.bits.need(16, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(16);
                    self.gz_flags = hold;
                    if hold & 0xFF != 8 {
                        return Err(self.fail("unknown compression method", src));
                    }
                    if hold & 0xE000 != 0 {
                        return Err(self.fail("unknown header flags set", src));
                    }
                    if let Some(head) = self.head.as_mut() {
                        head.text = (hold >> 8) & 1 != 0;
                    }
                    self.header_crc
                        .update(&[(hold & 0xFF) as u8, (hold >> 8) as u8]);
                    self.bits.drop_bits(16);
                    self.state = State::Time;
                }

                State::Time => {
                    if !self.bits.need(32, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(32);
                    if let Some(head) = self.head.as_mut() {
                        head.mtime = hold;
                    }
                    self.header_crc.update(&hold.to_le_bytes());
                    self.bits.drop_bits(32);
                    self.state = State::Os;
                }

                State::Os => {
                    if !self.bits.need(16, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(16);
                    if let Some(head) = self.head.as_mut() {
                        head.xfl = (hold & 0xFF) as u8;
                        head.os = (hold >> 8) as u8;
                    }
                    self.header_crc
                        .update(&[(hold & 0xFF) as u8, (hold >> 8) as u8]);
                    self.bits.drop_bits(16);
                    self.state = State::ExLen;
                }

                State::ExLen => {
                    if self.gz_flags & gzip::FEXTRA_WORD != 0 {
                        if !self.bits.need(16, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        let hold = self.bits.bits(16);
                        self.field_len = hold as usize;
                        if let Some(head) = self.head.as_mut() {
                            head.extra = Some(Vec::with_capacity(hold as usize));
                        }
                        self.header_crc
                            .update(&[(hold & 0xFF) as u8, (hold >> 8) as u8]);
                        self.bits.drop_bits(16);
                    }
                    self.state = State::Extra;
                }

                State::Extra => {
                    if self.gz_flags & gzip::FEXTRA_WORD != 0 {
                        while self.field_len > 0 {
                            let Some(byte) = self.bits.take_byte(src) else {
                                return Ok(DecompressStatus::NeedsInput);
                            };
                            self.header_crc.update(&[byte]);
                            if let Some(extra) =
                                self.head.as_mut().and_then(|h| h.extra.as_mut())
                            {
                                extra.push(byte);
                            }
                            self.field_len -= 1;
                        }
                    }
                    self.state = State::Name;
                }

                State::Name => {
                    if self.gz_flags & gzip::FNAME_WORD != 0 {
                        if let Some(head) = self.head.as_mut() {
                            head.name.get_or_insert_with(Vec::new);
                        }
                        loop {
                            let Some(byte) = self.bits.take_byte(src) else {
                                return Ok(DecompressStatus::NeedsInput);
                            };
                            self.header_crc.update(&[byte]);
                            if byte == 0 {
                                break;
                            }
                            if let Some(name) = self.head.as_mut().and_then(|h| h.name.as_mut()) {
                                if name.len() < FIELD_CAP {
                                    name.push(byte);
                                }
                            }
                        }
                    }
                    self.state = State::Comment;
                }

                State::Comment => {
                    if self.gz_flags & gzip::FCOMMENT_WORD != 0 {
                        if let Some(head) = self.head.as_mut() {
                            head.comment.get_or_insert_with(Vec::new);
                        }
                        loop {
                            let Some(byte) = self.bits.take_byte(src) else {
                                return Ok(DecompressStatus::NeedsInput);
                            };
                            self.header_crc.update(&[byte]);
                            if byte == 0 {
                                break;
                            }
                            if let Some(comment) =
                                self.head.as_mut().and_then(|h| h.comment.as_mut())
                            {
                                if comment.len() < FIELD_CAP {
                                    comment.push(byte);
                                }
                            }
                        }
                    }
                    self.state = State::Hcrc;
                }

                State::Hcrc => {
                    if self.gz_flags & gzip::FHCRC_WORD != 0 {
                        if !self.bits.need(16, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        let hold = self.bits.bits(16);
                        if hold != self.header_crc.finish() & 0xFFFF {
                            return Err(self.fail("header crc mismatch", src));
                        }
                        if let Some(head) = self.head.as_mut() {
                            head.hcrc = true;
                        }
                        self.bits.drop_bits(16);
                    }
                    self.head_done = true;
                    self.check = WrapCheck::Crc(Crc32::new());
                    self.state = State::BlockHead;
                }

                State::DictId => {
                    if !self.bits.need(32, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    // The dictionary Adler-32 is stored big-endian.
                    self.dict_expected = self.bits.bits(32).swap_bytes();
                    self.bits.drop_bits(32);
                    self.state = State::Dict;
                }

                State::Dict => {
                    if !self.have_dict {
                        return Ok(DecompressStatus::NeedDict);
                    }
                    self.check = WrapCheck::Adler(Adler32::new());
                    self.state = State::BlockHead;
                }

                State::BlockHead => {
                    if matches!(flush, FlushMode::Block | FlushMode::Trees) {
                        if !self.boundary_paused {
                            self.boundary_paused = true;
                            return Ok(DecompressStatus::BlockEnd);
                        }
                        self.boundary_paused = false;
                    }

                    if self.last {
                        self.bits.align();
                        self.state = match self.format {
                            Format::Raw => State::Done,
                            _ => State::Check,
                        };
                        continue;
                    }

                    if !self.bits.need(3, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    self.last = self.bits.bits(1) != 0;
                    self.bits.drop_bits(1);
                    let btype = self.bits.bits(2);
                    self.bits.drop_bits(2);
                    match btype {
                        0 => self.state = State::StoredReady,
                        1 => {
                            self.fixed_active = true;
                            self.lenbits = FIXED_LEN_BITS;
                            self.distbits = FIXED_DIST_BITS;
                            self.state = State::LenReady;
                        }
                        2 => self.state = State::Table,
                        _ => return Err(self.fail("invalid block type", src)),
                    }
                }

                State::StoredReady => {
                    if flush == FlushMode::Trees {
                        if !self.boundary_paused {
                            self.boundary_paused = true;
                            return Ok(DecompressStatus::BlockEnd);
                        }
                        self.boundary_paused = false;
                    }
                    self.state = State::StoredLen;
                }

                State::StoredLen => {
                    self.bits.align();
                    if !self.bits.need(32, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(32);
                    let len = hold & 0xFFFF;
                    let nlen = hold >> 16;
                    if len != !nlen & 0xFFFF {
                        return Err(self.fail("invalid stored block lengths", src));
                    }
                    self.stored_len = len as usize;
                    self.bits.drop_bits(32);
                    self.state = State::StoredCopy;
                }

                State::StoredCopy => {
                    while self.stored_len > 0 {
                        if self.bits.count() >= 8 {
                            if dst.is_full() {
                                return Ok(DecompressStatus::NeedsOutput);
                            }
                            let byte = self.bits.bits(8) as u8;
                            self.bits.drop_bits(8);
                            dst.push(byte);
                            self.stored_len -= 1;
                            continue;
                        }
                        if dst.is_full() {
                            return Ok(DecompressStatus::NeedsOutput);
                        }
                        let n = self
                            .stored_len
                            .min(src.remaining())
                            .min(dst.remaining());
                        if n == 0 {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        dst.write_slice(src.take(n));
                        self.stored_len -= n;
                    }
                    self.state = State::BlockHead;
                }

                State::Table => {
                    if !self.bits.need(14, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    self.nlen = self.bits.bits(5) as usize + 257;
                    self.bits.drop_bits(5);
                    self.ndist = self.bits.bits(5) as usize + 1;
                    self.bits.drop_bits(5);
                    self.ncode = self.bits.bits(4) as usize + 4;
                    self.bits.drop_bits(4);
                    if self.nlen > LITLEN_SYMBOLS || self.ndist > DIST_SYMBOLS {
                        return Err(self.fail("too many length or distance symbols", src));
                    }
                    self.have = 0;
                    self.state = State::LenLens;
                }

                State::LenLens => {
                    while self.have < self.ncode {
                        if !self.bits.need(3, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        self.lens[CODE_LENGTH_ORDER[self.have]] = self.bits.bits(3) as u16;
                        self.bits.drop_bits(3);
                        self.have += 1;
                    }
                    while self.have < CODELEN_SYMBOLS {
                        self.lens[CODE_LENGTH_ORDER[self.have]] = 0;
                        self.have += 1;
                    }

                    let lens = self.lens;
                    match build_table(
                        CodeKind::Codes,
                        &lens[..CODELEN_SYMBOLS],
                        &mut self.codes,
                        0,
                        7,
                        &mut self.work,
                    ) {
                        Ok((_, bits)) => {
                            self.lenoff = 0;
                            self.lenbits = bits;
                        }
                        Err(_) => return Err(self.fail("invalid code lengths set", src)),
                    }
                    self.have = 0;
                    self.state = State::CodeLens;
                }

                State::CodeLens => {
                    while self.have < self.nlen + self.ndist {
                        let table = &self.codes[self.lenoff..];
                        let Some(here) = decode_here_peek(table, self.lenbits, &mut self.bits, src)
                        else {
                            return Ok(DecompressStatus::NeedsInput);
                        };

                        if here.val < 16 {
                            self.bits.drop_bits(here.bits as u32);
                            self.lens[self.have] = here.val;
                            self.have += 1;
                            continue;
                        }

                        let (extra_bits, base, use_prev) = match here.val {
                            16 => (2u32, 3usize, true),
                            17 => (3, 3, false),
                            _ => (7, 11, false),
                        };
                        if !self.bits.need(here.bits as u32 + extra_bits, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        self.bits.drop_bits(here.bits as u32);
                        let mut copy = base + self.bits.bits(extra_bits) as usize;
                        self.bits.drop_bits(extra_bits);

                        let fill = if use_prev {
                            if self.have == 0 {
                                return Err(self.fail("invalid bit length repeat", src));
                            }
                            self.lens[self.have - 1]
                        } else {
                            0
                        };
                        if self.have + copy > self.nlen + self.ndist {
                            return Err(self.fail("invalid bit length repeat", src));
                        }
                        while copy > 0 {
                            self.lens[self.have] = fill;
                            self.have += 1;
                            copy -= 1;
                        }
                    }

                    if self.lens[END_OF_BLOCK as usize] == 0 {
                        return Err(self.fail("invalid code -- missing end-of-block", src));
                    }

                    let lens = self.lens;
                    let used = match build_table(
                        CodeKind::Lens,
                        &lens[..self.nlen],
                        &mut self.codes,
                        0,
                        9,
                        &mut self.work,
                    ) {
                        Ok((used, bits)) => {
                            self.lenoff = 0;
                            self.lenbits = bits;
                            used
                        }
                        Err(BuildError::Oversubscribed | BuildError::Incomplete) => {
                            return Err(self.fail("invalid literal/lengths set", src));
                        }
                    };
                    match build_table(
                        CodeKind::Dists,
                        &lens[self.nlen..self.nlen + self.ndist],
                        &mut self.codes,
                        used,
                        6,
                        &mut self.work,
                    ) {
                        Ok((_, bits)) => {
                            self.distoff = used;
                            self.distbits = bits;
                        }
                        Err(_) => return Err(self.fail("invalid distances set", src)),
                    }
                    self.fixed_active = false;
                    self.state = State::LenReady;
                }

                State::LenReady => {
                    if flush == FlushMode::Trees {
                        if !self.boundary_paused {
                            self.boundary_paused = true;
                            return Ok(DecompressStatus::BlockEnd);
                        }
                        self.boundary_paused = false;
                    }
                    self.state = State::Len;
                }

                State::Len => {
                    let table: &[Code] = if self.fixed_active {
                        &fixed_tables().lens
                    } else {
                        &self.codes[self.lenoff..]
                    };
                    let Some(here) = decode_sym(table, self.lenbits, &mut self.bits, src) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };

                    if here.op == 0 {
                        self.length = here.val as usize;
                        self.state = State::Lit;
                    } else if here.op & 32 != 0 {
                        self.state = State::BlockHead;
                    } else if here.op & 64 != 0 {
                        return Err(self.fail("invalid literal/length code", src));
                    } else {
                        self.length = here.val as usize;
                        self.extra = (here.op & 15) as u32;
                        self.state = State::LenExt;
                    }
                }

                State::LenExt => {
                    if self.extra != 0 {
                        if !self.bits.need(self.extra, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        self.length += self.bits.bits(self.extra) as usize;
                        self.bits.drop_bits(self.extra);
                    }
                    self.state = State::Dist;
                }

                State::Dist => {
                    let table: &[Code] = if self.fixed_active {
                        &fixed_tables().dists
                    } else {
                        &self.codes[self.distoff..]
                    };
                    let Some(here) = decode_sym(table, self.distbits, &mut self.bits, src) else {
                        return Ok(DecompressStatus::NeedsInput);
                    };

                    if here.op & 64 != 0 {
                        return Err(self.fail("invalid distance code", src));
                    }
                    self.offset = here.val as usize;
                    self.extra = (here.op & 15) as u32;
                    self.state = State::DistExt;
                }

                State::DistExt => {
                    if self.extra != 0 {
                        if !self.bits.need(self.extra, src) {
                            return Ok(DecompressStatus::NeedsInput);
                        }
                        self.offset += self.bits.bits(self.extra) as usize;
                        self.bits.drop_bits(self.extra);
                    }
                    self.state = State::Match;
                }

                State::Match => {
                    while self.length > 0 {
                        if dst.is_full() {
                            return Ok(DecompressStatus::NeedsOutput);
                        }
                        let produced = dst.produced() - self.member_base;
                        if self.offset > produced {
                            let back = self.offset - produced;
                            if back > self.window.have() {
                                if self.sane {
                                    return Err(
                                        self.fail("invalid distance too far back", src)
                                    );
                                }
                                dst.push(0);
                            } else {
                                dst.push(self.window.byte_back(back));
                            }
                            self.length -= 1;
                        } else {
                            let n = dst.copy_within_back(self.offset, self.length);
                            self.length -= n;
                        }
                    }
                    self.state = State::Len;
                }

                State::Lit => {
                    if dst.is_full() {
                        return Ok(DecompressStatus::NeedsOutput);
                    }
                    dst.push(self.length as u8);
                    self.state = State::Len;
                }

                State::Check => {
                    // Fold all output produced so far into the running
                    // check before comparing the trailer.
                    self.sync_progress(dst);

                    if !self.bits.need(32, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let hold = self.bits.bits(32);
                    // zlib stores the Adler-32 big-endian; gzip stores
                    // the CRC-32 little-endian.
                    let stored = if self.member_gzip {
                        hold
                    } else {
                        hold.swap_bytes()
                    };
                    let computed = self.check.value();
                    if stored != computed {
                        return Err(self.fail("incorrect data check", src));
                    }
                    self.bits.drop_bits(32);
                    self.state = if self.member_gzip {
                        State::Length
                    } else {
                        State::Done
                    };
                }

                State::Length => {
                    if !self.bits.need(32, src) {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    let stored = self.bits.bits(32);
                    if stored as u64 != self.member_out & 0xFFFF_FFFF {
                        return Err(self.fail("incorrect length check", src));
                    }
                    self.bits.drop_bits(32);

                    // In auto mode a gzip stream may be a concatenation of
                    // members; keep going while input remains.
                    if self.format == Format::Auto
                        && (self.bits.count() >= 8 || !src.is_empty())
                    {
                        self.sync_progress(dst);
                        self.restart_member(dst);
                        continue;
                    }
                    self.state = State::Done;
                }

                State::Done => {
                    return Ok(DecompressStatus::Done);
                }

                State::Bad(msg) => {
                    return Err(OxiFlateError::corrupted(
                        self.total_in + src.consumed() as u64,
                        msg,
                    ));
                }
            }
        }
    }
}

/// Peek-decode a single-level code for the code-length alphabet (no
/// sub-tables, and the caller controls when bits are dropped).
fn decode_here_peek(
    table: &[Code],
    root: u32,
    bits: &mut BitBuf,
    src: &mut InputCursor<'_>,
) -> Option<Code> {
    loop {
        let here = table[bits.bits(root) as usize];
        if (here.bits as u32) <= bits.count() {
            return Some(here);
        }
        if !bits.pull_byte(src) {
            return None;
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        self.step(input, output, FlushMode::None)
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Inflater::is_finished(self)
    }
}

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater =
        Inflater::with_config(InflateConfig::new(Format::Raw, MAX_WBITS)?);
    inflater.decompress_all(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflate_stored() {
        let compressed = [
            0x01, // BFINAL=1, BTYPE=00, padding
            0x05, 0x00, // LEN=5
            0xFA, 0xFF, // NLEN
            b'H', b'e', b'l', b'l', b'o',
        ];
        assert_eq!(inflate(&compressed).unwrap(), b"Hello");
    }

    #[test]
    fn test_inflate_empty_stored() {
        let compressed = [0x01, 0x00, 0x00, 0xFF, 0xFF];
        assert!(inflate(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_fixed_block() {
        // BFINAL=1, BTYPE=01, literal 'a' (0x30+0x61 = 0x91 over 8 bits),
        // then the 7-bit EOB. Assembled LSB-first: 0b10001_011,
        // 0b0000_1100, zero padding.
        let compressed = [0x4B, 0x04, 0x00];
        assert_eq!(inflate(&compressed).unwrap(), b"a");
    }

    #[test]
    fn test_inflate_overlapping_match() {
        // 'a' then a distance-1 length-10 match (RLE expansion): fixed
        // block assembled by the encoder tests; here hand-checked bytes.
        // BTYPE=01, lit 'a', length code 264 (len 10, 7-bit code
        // 0001000), distance code 0 (5 bits), EOB.
        let mut bits_out: Vec<u8> = Vec::new();
        let mut acc = 0u32;
        let mut n = 0u32;
        let mut put = |value: u32, count: u32| {
            acc |= value << n;
            n += count;
            while n >= 8 {
                bits_out.push(acc as u8);
                acc >>= 8;
                n -= 8;
            }
        };
        put(1, 1); // BFINAL
        put(1, 2); // fixed
        put(0x91u32.reverse_bits() >> 24, 8); // 'a'
        put(0b0001000u32.reverse_bits() >> 25, 7); // length sym 264 = 10
        put(0, 5); // distance sym 0 = 1
        put(0, 7); // EOB
        put(0, 7); // pad
        bits_out.push(acc as u8);

        let result = inflate(&bits_out).unwrap();
        assert_eq!(result, b"aaaaaaaaaaa");
    }

    #[test]
    fn test_stored_length_mismatch_is_data_error() {
        let compressed = [0x01, 0x05, 0x00, 0x00, 0xFF, b'H'];
        let err = inflate(&compressed).unwrap_err();
        assert!(err.to_string().contains("invalid stored block lengths"));
    }

    #[test]
    fn test_sticky_data_error() {
        let mut inf = Inflater::with_config(
            InflateConfig::new(Format::Raw, 15).unwrap(),
        );
        let bad = [0x07u8]; // BTYPE=11 reserved
        let mut out = [0u8; 16];
        assert!(inf.step(&bad, &mut out, FlushMode::None).is_err());
        // Still failing on the next call, without consuming anything.
        let err = inf.step(b"more", &mut out, FlushMode::None).unwrap_err();
        assert!(err.to_string().contains("invalid block type"));
        // Reset clears the condition.
        Decompressor::reset(&mut inf);
        assert!(!inf.is_finished());
    }

    #[test]
    fn test_one_byte_at_a_time_input() {
        let compressed = [
            0x01u8, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o',
        ];
        let mut inf = Inflater::with_config(
            InflateConfig::new(Format::Raw, 15).unwrap(),
        );
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        for &byte in &compressed {
            let mut input: &[u8] = &[byte];
            loop {
                let (c, p, status) = inf.step(input, &mut buf, FlushMode::None).unwrap();
                input = &input[c..];
                out.extend_from_slice(&buf[..p]);
                if status == DecompressStatus::Done || (input.is_empty() && p == 0) {
                    break;
                }
            }
        }
        assert_eq!(out, b"Hello");
        assert!(inf.is_finished());
        assert_eq!(inf.total_out(), 5);
    }

    #[test]
    fn test_from_window_bits() {
        assert_eq!(
            InflateConfig::from_window_bits(15).unwrap().format,
            Format::Zlib
        );
        assert_eq!(
            InflateConfig::from_window_bits(-15).unwrap().format,
            Format::Raw
        );
        assert_eq!(
            InflateConfig::from_window_bits(31).unwrap().format,
            Format::Gzip
        );
        let auto = InflateConfig::from_window_bits(47).unwrap();
        assert_eq!(auto.format, Format::Auto);
        assert_eq!(auto.wbits, 15);
        assert!(InflateConfig::from_window_bits(0).is_err());
        assert!(InflateConfig::from_window_bits(-7).is_err());
        assert!(InflateConfig::from_window_bits(48).is_err());
    }

    #[test]
    fn test_sync_finds_marker() {
        let mut inf = Inflater::with_config(
            InflateConfig::new(Format::Raw, 15).unwrap(),
        );
        let data = [0x12u8, 0x34, 0x00, 0x00, 0xFF, 0xFF, 0xAB];
        let (used, found) = inf.sync(&data);
        assert!(found);
        assert_eq!(used, 6);
    }

    #[test]
    fn test_sync_partial_marker_across_calls() {
        let mut inf = Inflater::with_config(
            InflateConfig::new(Format::Raw, 15).unwrap(),
        );
        let (_, found) = inf.sync(&[0x00, 0x00]);
        assert!(!found);
        let (used, found) = inf.sync(&[0xFF, 0xFF]);
        assert!(found);
        assert_eq!(used, 2);
    }
}
