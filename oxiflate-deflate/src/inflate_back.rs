//! Callback-driven decompression over a caller-supplied window.
//!
//! [`InflateBack`] is a reduced variant of the decoder for one-shot use:
//! the caller provides the window buffer at construction, and the engine
//! uses it directly as the output buffer, pushing it to the output
//! callback whenever it fills and once more at stream end. This avoids
//! the copy from window to a separate output buffer.
//!
//! Only raw DEFLATE is accepted; any wrapper is the caller's business.
//! Input is pulled through [`InputSource`] and output pushed through
//! [`OutputSink`]; both report failure through the normal error channel,
//! which the engine propagates.

use oxiflate_core::bitstream::InputCursor;
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::window::{MAX_WBITS, MIN_WBITS};

use crate::inftree::{build_table, fixed_tables, Code, CodeKind, ENOUGH, FIXED_DIST_BITS, FIXED_LEN_BITS};
use crate::tables::{
    CODELEN_SYMBOLS, CODE_LENGTH_ORDER, DIST_SYMBOLS, END_OF_BLOCK, LITLEN_SYMBOLS,
};

/// Supplies compressed input to [`InflateBack::decode`].
pub trait InputSource {
    /// Fill `buf` with more compressed bytes, returning how many were
    /// written. Returning 0 signals end of input.
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<F> InputSource for F
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        self(buf)
    }
}

/// An [`InputSource`] over any [`std::io::Read`].
#[derive(Debug)]
pub struct ReadSource<R>(pub R);

impl<R: std::io::Read> InputSource for ReadSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.0.read(buf)?)
    }
}

/// Receives decompressed output from [`InflateBack::decode`] in
/// window-sized chunks.
pub trait OutputSink {
    /// Consume a chunk of decompressed bytes.
    fn push(&mut self, data: &[u8]) -> Result<()>;
}

impl<F> OutputSink for F
where
    F: FnMut(&[u8]) -> Result<()>,
{
    fn push(&mut self, data: &[u8]) -> Result<()> {
        self(data)
    }
}

/// An [`OutputSink`] over any [`std::io::Write`].
#[derive(Debug)]
pub struct WriteSink<W>(pub W);

impl<W: std::io::Write> OutputSink for WriteSink<W> {
    fn push(&mut self, data: &[u8]) -> Result<()> {
        self.0.write_all(data)?;
        Ok(())
    }
}

/// Bit reader backed by the input callback.
struct BackBits<'s, I: InputSource> {
    src: &'s mut I,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    hold: u64,
    count: u32,
    total_in: u64,
}

impl<'s, I: InputSource> BackBits<'s, I> {
    fn new(src: &'s mut I) -> Self {
        Self {
            src,
            buf: vec![0u8; 16384],
            pos: 0,
            len: 0,
            hold: 0,
            count: 0,
            total_in: 0,
        }
    }

    fn next_byte(&mut self) -> Result<u8> {
        if self.pos == self.len {
            self.len = self.src.pull(&mut self.buf)?;
            self.pos = 0;
            if self.len == 0 {
                return Err(OxiFlateError::buffer_error("input"));
            }
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        self.total_in += 1;
        Ok(b)
    }

    fn need(&mut self, n: u32) -> Result<()> {
        while self.count < n {
            let b = self.next_byte()?;
            self.hold |= (b as u64) << self.count;
            self.count += 8;
        }
        Ok(())
    }

    fn bits(&self, n: u32) -> u32 {
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    fn take(&mut self, n: u32) -> Result<u32> {
        self.need(n)?;
        let v = self.bits(n);
        self.hold >>= n;
        self.count -= n;
        Ok(v)
    }

    fn align(&mut self) {
        let r = self.count & 7;
        self.hold >>= r;
        self.count -= r;
    }

    /// Decode one symbol through a root-plus-sub-table pair.
    fn decode(&mut self, table: &[Code], root: u32) -> Result<Code> {
        let mut here;
        loop {
            here = table[self.bits(root) as usize];
            if (here.bits as u32) <= self.count {
                break;
            }
            let b = self.next_byte()?;
            self.hold |= (b as u64) << self.count;
            self.count += 8;
        }

        if here.op != 0 && here.op & 0xF0 == 0 {
            let last = here;
            loop {
                let idx = last.val as usize
                    + (self.bits(last.bits as u32 + last.op as u32) >> last.bits as u32) as usize;
                here = table[idx];
                if (last.bits as u32 + here.bits as u32) <= self.count {
                    break;
                }
                let b = self.next_byte()?;
                self.hold |= (b as u64) << self.count;
                self.count += 8;
            }
            self.hold >>= last.bits as u32;
            self.count -= last.bits as u32;
        }

        self.hold >>= here.bits as u32;
        self.count -= here.bits as u32;
        Ok(here)
    }
}

/// Callback-driven raw-DEFLATE decoder writing directly into a borrowed
/// window.
pub struct InflateBack<'w> {
    window: &'w mut [u8],
    mask: usize,
    next: usize,
    full: bool,
    codes: Vec<Code>,
    lens: [u16; 320],
    work: [u16; 288],
}

impl<'w> InflateBack<'w> {
    /// Wrap a caller-supplied window, which must be a power of two of
    /// `2^8..=2^15` bytes. To decode arbitrary streams the window must be
    /// the full 32 KiB.
    pub fn new(window: &'w mut [u8]) -> Result<Self> {
        let len = window.len();
        if !len.is_power_of_two()
            || len < (1 << MIN_WBITS)
            || len > (1 << MAX_WBITS)
        {
            return Err(OxiFlateError::invalid_param(format!(
                "window length {} is not a power of two in 2^8..=2^15",
                len
            )));
        }
        Ok(Self {
            mask: len - 1,
            window,
            next: 0,
            full: false,
            codes: vec![Code::default(); ENOUGH],
            lens: [0; 320],
            work: [0; 288],
        })
    }

    fn put<O: OutputSink>(&mut self, byte: u8, out: &mut O) -> Result<()> {
        self.window[self.next] = byte;
        self.next += 1;
        if self.next == self.window.len() {
            out.push(self.window)?;
            self.next = 0;
            self.full = true;
        }
        Ok(())
    }

    fn history_len(&self) -> usize {
        if self.full {
            self.window.len()
        } else {
            self.next
        }
    }

    /// Decode one complete raw DEFLATE stream, pulling input from `src`
    /// and pushing output through `out`. Returns the number of bytes
    /// decoded.
    pub fn decode<I: InputSource, O: OutputSink>(
        &mut self,
        src: &mut I,
        out: &mut O,
    ) -> Result<u64> {
        self.next = 0;
        self.full = false;
        let mut total_out: u64 = 0;
        let mut bits = BackBits::new(src);

        loop {
            let last = bits.take(1)? != 0;
            let btype = bits.take(2)?;

            match btype {
                0 => {
                    bits.align();
                    let hold = bits.take(32)?;
                    let len = hold & 0xFFFF;
                    if len != !(hold >> 16) & 0xFFFF {
                        return Err(OxiFlateError::corrupted(
                            bits.total_in,
                            "invalid stored block lengths",
                        ));
                    }
                    for _ in 0..len {
                        // The accumulator is byte-aligned here.
                        let byte = if bits.count >= 8 {
                            bits.take(8)? as u8
                        } else {
                            bits.next_byte()?
                        };
                        self.put(byte, out)?;
                        total_out += 1;
                    }
                }
                1 => {
                    let fixed = fixed_tables();
                    total_out += self.decode_block(
                        &mut bits,
                        out,
                        &fixed.lens,
                        FIXED_LEN_BITS,
                        &fixed.dists,
                        FIXED_DIST_BITS,
                    )?;
                }
                2 => {
                    let (lenbits, used, distbits) = self.read_code_tables(&mut bits)?;
                    let codes = std::mem::take(&mut self.codes);
                    let result = self.decode_block(
                        &mut bits,
                        out,
                        &codes,
                        lenbits,
                        &codes[used..],
                        distbits,
                    );
                    self.codes = codes;
                    total_out += result?;
                }
                _ => {
                    return Err(OxiFlateError::corrupted(bits.total_in, "invalid block type"));
                }
            }

            if last {
                break;
            }
        }

        if self.next > 0 {
            let next = self.next;
            out.push(&self.window[..next])?;
        }
        Ok(total_out)
    }

    /// Parse a dynamic block's code tables into the shared pool.
    /// Returns `(len_root_bits, len_table_entries, dist_root_bits)`.
    fn read_code_tables<I: InputSource>(
        &mut self,
        bits: &mut BackBits<'_, I>,
    ) -> Result<(u32, usize, u32)> {
        let nlen = bits.take(5)? as usize + 257;
        let ndist = bits.take(5)? as usize + 1;
        let ncode = bits.take(4)? as usize + 4;
        if nlen > LITLEN_SYMBOLS || ndist > DIST_SYMBOLS {
            return Err(OxiFlateError::corrupted(
                bits.total_in,
                "too many length or distance symbols",
            ));
        }

        for i in 0..CODELEN_SYMBOLS {
            self.lens[CODE_LENGTH_ORDER[i]] = if i < ncode { bits.take(3)? as u16 } else { 0 };
        }
        let lens = self.lens;
        let (_, clbits) = build_table(
            CodeKind::Codes,
            &lens[..CODELEN_SYMBOLS],
            &mut self.codes,
            0,
            7,
            &mut self.work,
        )
        .map_err(|_| OxiFlateError::corrupted(bits.total_in, "invalid code lengths set"))?;

        let mut have = 0;
        while have < nlen + ndist {
            // The code-length table has no sub-tables; a plain root
            // lookup suffices.
            let here = loop {
                let here = self.codes[bits.bits(clbits) as usize];
                if (here.bits as u32) <= bits.count {
                    break here;
                }
                let b = bits.next_byte()?;
                bits.hold |= (b as u64) << bits.count;
                bits.count += 8;
            };

            if here.val < 16 {
                bits.hold >>= here.bits as u32;
                bits.count -= here.bits as u32;
                self.lens[have] = here.val;
                have += 1;
                continue;
            }

            let (extra_bits, base, use_prev) = match here.val {
                16 => (2u32, 3usize, true),
                17 => (3, 3, false),
                _ => (7, 11, false),
            };
            bits.need(here.bits as u32 + extra_bits)?;
            bits.hold >>= here.bits as u32;
            bits.count -= here.bits as u32;
            let mut copy = base + bits.bits(extra_bits) as usize;
            bits.hold >>= extra_bits;
            bits.count -= extra_bits;

            let fill = if use_prev {
                if have == 0 {
                    return Err(OxiFlateError::corrupted(
                        bits.total_in,
                        "invalid bit length repeat",
                    ));
                }
                self.lens[have - 1]
            } else {
                0
            };
            if have + copy > nlen + ndist {
                return Err(OxiFlateError::corrupted(
                    bits.total_in,
                    "invalid bit length repeat",
                ));
            }
            while copy > 0 {
                self.lens[have] = fill;
                have += 1;
                copy -= 1;
            }
        }

        if self.lens[END_OF_BLOCK as usize] == 0 {
            return Err(OxiFlateError::corrupted(
                bits.total_in,
                "invalid code -- missing end-of-block",
            ));
        }

        let lens = self.lens;
        let (used, lenbits) =
            build_table(CodeKind::Lens, &lens[..nlen], &mut self.codes, 0, 9, &mut self.work)
                .map_err(|_| {
                    OxiFlateError::corrupted(bits.total_in, "invalid literal/lengths set")
                })?;
        let (_, distbits) = build_table(
            CodeKind::Dists,
            &lens[nlen..nlen + ndist],
            &mut self.codes,
            used,
            6,
            &mut self.work,
        )
        .map_err(|_| OxiFlateError::corrupted(bits.total_in, "invalid distances set"))?;

        Ok((lenbits, used, distbits))
    }

    /// Decode the symbols of one Huffman block.
    fn decode_block<I: InputSource, O: OutputSink>(
        &mut self,
        bits: &mut BackBits<'_, I>,
        out: &mut O,
        ltable: &[Code],
        lenbits: u32,
        dtable: &[Code],
        distbits: u32,
    ) -> Result<u64> {
        let mut produced: u64 = 0;
        loop {
            let here = bits.decode(ltable, lenbits)?;

            if here.op == 0 {
                self.put(here.val as u8, out)?;
                produced += 1;
                continue;
            }
            if here.op & 32 != 0 {
                return Ok(produced); // end of block
            }
            if here.op & 64 != 0 {
                return Err(OxiFlateError::corrupted(
                    bits.total_in,
                    "invalid literal/length code",
                ));
            }

            let mut length = here.val as usize;
            let extra = (here.op & 15) as u32;
            if extra != 0 {
                length += bits.take(extra)? as usize;
            }

            let here = bits.decode(dtable, distbits)?;
            if here.op & 64 != 0 {
                return Err(OxiFlateError::corrupted(
                    bits.total_in,
                    "invalid distance code",
                ));
            }
            let mut dist = here.val as usize;
            let extra = (here.op & 15) as u32;
            if extra != 0 {
                dist += bits.take(extra)? as usize;
            }

            if dist > self.history_len() {
                return Err(OxiFlateError::corrupted(
                    bits.total_in,
                    "invalid distance too far back",
                ));
            }

            for _ in 0..length {
                let byte = self.window[(self.next.wrapping_sub(dist)) & self.mask];
                self.put(byte, out)?;
            }
            produced += length as u64;
        }
    }
}

/// Convenience: decode a raw DEFLATE buffer through a temporary 32 KiB
/// window, collecting the output.
pub fn inflate_back_buffer(data: &[u8]) -> Result<Vec<u8>> {
    let mut window = vec![0u8; 1 << MAX_WBITS];
    let mut back = InflateBack::new(&mut window)?;
    let mut cursor = InputCursor::new(data);
    let mut output = Vec::new();

    let mut src = |buf: &mut [u8]| -> Result<usize> {
        let chunk = cursor.take(buf.len());
        buf[..chunk.len()].copy_from_slice(chunk);
        Ok(chunk.len())
    };
    back.decode(&mut src, &mut WriteSink(&mut output))?;
    Ok(output)
}
