//! Decoding-table construction for canonical prefix codes.
//!
//! Given a set of code lengths, [`build_table`] writes a root lookup table
//! (indexed by the next `root` input bits) plus linked sub-tables for
//! codes longer than `root` into a caller-provided entry pool. Entries
//! are [`Code`] triplets; sub-table links store pool offsets rather than
//! pointers, so the pool can live inline in the decoder state.
//!
//! The pool bounds ([`ENOUGH_LENS`], [`ENOUGH_DISTS`]) are provable upper
//! limits on the combined root-plus-sub-table footprint given the symbol
//! counts and the 15-bit maximum code length.

use std::sync::OnceLock;

use crate::tables::{fixed_distance_lengths, fixed_litlen_lengths, MAX_CODE_BITS};

/// One decoding table entry.
///
/// `op` encodes the entry kind:
/// - `0`: literal, `val` is the byte
/// - bit 4 set (`16..=31`): length/distance base in `val` with `op & 15`
///   extra bits to read
/// - bit 5 set (`32`): end-of-block
/// - bit 6 set (`64`): invalid code
/// - otherwise (`1..=15`): sub-table link; `op` is the number of index
///   bits and `val` the sub-table offset within the same pool slice
///
/// `bits` is how many input bits the entry consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    /// Entry kind and extra-bit count, as described above.
    pub op: u8,
    /// Bits consumed by this entry.
    pub bits: u8,
    /// Literal value, base value, or sub-table offset.
    pub val: u16,
}

/// Maximum pool entries a literal/length table can require.
pub const ENOUGH_LENS: usize = 1444;

/// Maximum pool entries a distance table can require.
pub const ENOUGH_DISTS: usize = 592;

/// Total pool size shared by both tables.
pub const ENOUGH: usize = ENOUGH_LENS + ENOUGH_DISTS;

/// Which alphabet a table is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// The 19-symbol code-length code.
    Codes,
    /// The literal/length code (symbols 0-287).
    Lens,
    /// The distance code (symbols 0-31).
    Dists,
}

/// Why a table could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The lengths describe more codes than the code space holds.
    Oversubscribed,
    /// The lengths leave part of the code space unused (only tolerated
    /// for a single-symbol length/distance code).
    Incomplete,
}

/// Length-code base values indexed by `symbol - 257`, with guard entries
/// for the invalid symbols 286 and 287.
const LBASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];

/// Length-code `op` values (extra bits + 16); 77 and 202 mark the invalid
/// symbols.
const LEXT: [u16; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20,
    20, 21, 21, 21, 21, 16, 77, 202,
];

/// Distance-code base values, with guard entries for symbols 30 and 31.
const DBASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];

/// Distance-code `op` values (extra bits + 16); 64 marks invalid symbols.
const DEXT: [u16; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26,
    26, 27, 27, 28, 28, 29, 29, 64, 64,
];

/// Build a decoding table for the canonical code described by `lens`.
///
/// Entries are written into `pool` starting at `offset`. `root` is the
/// requested root-table bit count; it may be reduced for short code sets.
/// `work` is scratch space for the length-sorted symbol list.
///
/// Returns `(entries_used, root_bits)`.
pub fn build_table(
    kind: CodeKind,
    lens: &[u16],
    pool: &mut [Code],
    offset: usize,
    root: u32,
    work: &mut [u16; 288],
) -> Result<(usize, u32), BuildError> {
    // Count codes per length.
    let mut count = [0u16; 16];
    for &len in lens {
        debug_assert!(len <= MAX_CODE_BITS as u16);
        count[len as usize] += 1;
    }

    // Bound the root by the longest and shortest used lengths.
    let mut max: u32 = 15;
    while max >= 1 && count[max as usize] == 0 {
        max -= 1;
    }
    let mut root = root.min(max);
    if max == 0 {
        // No symbols at all: provide a one-bit table that reads as an
        // invalid code, so a decoder using it fails cleanly.
        let invalid = Code {
            op: 64,
            bits: 1,
            val: 0,
        };
        pool[offset] = invalid;
        pool[offset + 1] = invalid;
        return Ok((2, 1));
    }
    let mut min: u32 = 1;
    while min < max && count[min as usize] == 0 {
        min += 1;
    }
    if root < min {
        root = min;
    }

    // Kraft-McMillan check for an over- or under-subscribed set.
    let mut left: i32 = 1;
    for len in 1..=15usize {
        left <<= 1;
        left -= count[len] as i32;
        if left < 0 {
            return Err(BuildError::Oversubscribed);
        }
    }
    if left > 0 && (kind == CodeKind::Codes || max != 1) {
        return Err(BuildError::Incomplete);
    }

    // Offsets into the sorted symbol table for each length.
    let mut offs = [0u16; 16];
    for len in 1..15usize {
        offs[len + 1] = offs[len] + count[len];
    }

    // Sort symbols by length, then by symbol index (canonical order).
    for (sym, &len) in lens.iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    // Alphabet-specific entry generation: `mat` splits literals from
    // coded values, `base`/`extra` translate coded symbols.
    let (base, extra, mat): (&[u16], &[u16], usize) = match kind {
        CodeKind::Codes => (&[], &[], 20),
        CodeKind::Lens => (&LBASE, &LEXT, 257),
        CodeKind::Dists => (&DBASE, &DEXT, 0),
    };

    let mut huff: u32 = 0; // bit-reversed code accumulator
    let mut sym: usize = 0;
    let mut len: u32 = min;
    let mut next: usize = offset; // base index of the table being filled
    let mut curr: u32 = root; // index bits of the table being filled
    let mut drop_: u32 = 0; // root bits dropped inside sub-tables
    let mut low: u32 = u32::MAX; // root prefix of the active sub-table
    let mut used: usize = 1usize << root;
    let mask: u32 = (1u32 << root) - 1;

    if (kind == CodeKind::Lens && used > ENOUGH_LENS)
        || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
    {
        return Err(BuildError::Oversubscribed);
    }

    loop {
        // Build the entry for the current symbol.
        let here_bits = (len - drop_) as u8;
        let w = work[sym] as usize;
        let here = if w + 1 < mat {
            Code {
                op: 0,
                bits: here_bits,
                val: w as u16,
            }
        } else if w >= mat {
            Code {
                op: extra[w - mat] as u8,
                bits: here_bits,
                val: base[w - mat],
            }
        } else {
            Code {
                op: 32 + 64,
                bits: here_bits,
                val: 0,
            }
        };

        // Replicate the entry over all table indices sharing its prefix.
        let incr = 1usize << (len - drop_);
        let table_size = 1usize << curr;
        let mut fill = table_size;
        loop {
            fill -= incr;
            pool[next + (huff as usize >> drop_) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // Backwards-increment the len-bit code.
        let mut step = 1u32 << (len - 1);
        while huff & step != 0 {
            step >>= 1;
        }
        if step != 0 {
            huff &= step - 1;
            huff += step;
        } else {
            huff = 0;
        }

        // Advance to the next symbol.
        sym += 1;
        count[len as usize] -= 1;
        if count[len as usize] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as u32;
        }

        // Start a new sub-table when a longer code leaves the current one.
        if len > root && (huff & mask) != low {
            if drop_ == 0 {
                drop_ = root;
            }
            next += table_size;

            // Sub-table size: enough bits to hold every remaining code.
            curr = len - drop_;
            let mut sub_left: i32 = 1 << curr;
            while curr + drop_ < max {
                sub_left -= count[(curr + drop_) as usize] as i32;
                if sub_left <= 0 {
                    break;
                }
                curr += 1;
                sub_left <<= 1;
            }

            used += 1usize << curr;
            if (kind == CodeKind::Lens && used > ENOUGH_LENS)
                || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
            {
                return Err(BuildError::Oversubscribed);
            }

            // Link the sub-table from the root entry for its prefix.
            low = huff & mask;
            pool[offset + low as usize] = Code {
                op: curr as u8,
                bits: root as u8,
                val: (next - offset) as u16,
            };
        }
    }

    // An incomplete single code leaves exactly one table slot unreached.
    if huff != 0 {
        pool[next + (huff as usize >> drop_)] = Code {
            op: 64,
            bits: (len - drop_) as u8,
            val: 0,
        };
    }

    Ok((used, root))
}

/// The fixed literal/length and distance decode tables (RFC 1951 §3.2.6),
/// built once on first use.
pub struct FixedTables {
    /// Literal/length table, root bits 9.
    pub lens: Vec<Code>,
    /// Distance table, root bits 5.
    pub dists: Vec<Code>,
}

/// Root bit count of the fixed literal/length table.
pub const FIXED_LEN_BITS: u32 = 9;

/// Root bit count of the fixed distance table.
pub const FIXED_DIST_BITS: u32 = 5;

/// Get the fixed decode tables.
pub fn fixed_tables() -> &'static FixedTables {
    static TABLES: OnceLock<FixedTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut work = [0u16; 288];

        let litlen: Vec<u16> = fixed_litlen_lengths().iter().map(|&l| l as u16).collect();
        let mut lens = vec![Code::default(); 1 << FIXED_LEN_BITS];
        build_table(CodeKind::Lens, &litlen, &mut lens, 0, FIXED_LEN_BITS, &mut work)
            .expect("fixed literal/length table construction should never fail");

        // The fixed distance code spans 32 symbols; the last two decode
        // as invalid.
        let mut dist: Vec<u16> = fixed_distance_lengths().iter().map(|&l| l as u16).collect();
        dist.extend_from_slice(&[5, 5]);
        let mut dists = vec![Code::default(); 1 << FIXED_DIST_BITS];
        build_table(CodeKind::Dists, &dist, &mut dists, 0, FIXED_DIST_BITS, &mut work)
            .expect("fixed distance table construction should never fail");

        FixedTables { lens, dists }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(table: &[Code], root: u32, stream: u32) -> Code {
        let mut here = table[(stream & ((1 << root) - 1)) as usize];
        if here.op != 0 && here.op & (16 | 32 | 64) == 0 {
            let idx = here.val as usize
                + ((stream >> root) & ((1u32 << here.op) - 1)) as usize;
            here = table[idx];
        }
        here
    }

    #[test]
    fn test_simple_complete_code() {
        // Lengths 1, 2, 2 over a three-symbol code-length alphabet slice.
        let lens = [1u16, 2, 2];
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        let (used, root) =
            build_table(CodeKind::Codes, &lens, &mut pool, 0, 7, &mut work).unwrap();
        assert_eq!(root, 2);
        assert_eq!(used, 4);

        // Canonical: sym0 = 0 (1 bit), sym1 = 10, sym2 = 11; LSB-first the
        // 2-bit codes arrive reversed.
        assert_eq!(pool[0].val, 0);
        assert_eq!(pool[0].bits, 1);
        assert_eq!(pool[2].val, 0); // replicated 1-bit entry
        assert_eq!(pool[1].val, 1);
        assert_eq!(pool[1].bits, 2);
        assert_eq!(pool[3].val, 2);
    }

    #[test]
    fn test_oversubscribed_rejected() {
        // Four 1-bit codes cannot exist.
        let lens = [1u16, 1, 1, 1];
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        assert_eq!(
            build_table(CodeKind::Codes, &lens, &mut pool, 0, 7, &mut work),
            Err(BuildError::Oversubscribed)
        );
    }

    #[test]
    fn test_incomplete_rejected_for_code_lengths() {
        // A lone 2-bit code leaves the space under-subscribed.
        let lens = [2u16, 0, 0, 0];
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        assert_eq!(
            build_table(CodeKind::Codes, &lens, &mut pool, 0, 7, &mut work),
            Err(BuildError::Incomplete)
        );
    }

    #[test]
    fn test_single_symbol_distance_code_allowed() {
        // One 1-bit distance code is legal even though incomplete; the
        // unused half of the space decodes as invalid.
        let lens = [1u16, 0, 0, 0];
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        let (_, root) =
            build_table(CodeKind::Dists, &lens, &mut pool, 0, 6, &mut work).unwrap();
        assert_eq!(root, 1);
        assert_eq!(pool[0].op, 16); // distance base 1, 0 extra bits
        assert_eq!(pool[0].val, 1);
        assert_eq!(pool[1].op, 64); // the unreached slot is invalid
    }

    #[test]
    fn test_empty_code_yields_invalid_table() {
        let lens = [0u16; 19];
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        let (used, root) =
            build_table(CodeKind::Codes, &lens, &mut pool, 0, 7, &mut work).unwrap();
        assert_eq!((used, root), (2, 1));
        assert_eq!(pool[0].op, 64);
        assert_eq!(pool[1].op, 64);
    }

    #[test]
    fn test_fixed_tables() {
        let fixed = fixed_tables();

        // Literal 'A' (symbol 65) has the fixed 8-bit code 0x30 + 65,
        // bit-reversed for LSB-first streams.
        let code = 0x30u32 + 65;
        let mut rev = 0u32;
        for i in 0..8 {
            rev |= ((code >> i) & 1) << (7 - i);
        }
        let here = decode_one(&fixed.lens, FIXED_LEN_BITS, rev);
        assert_eq!(here.op, 0);
        assert_eq!(here.val, 65);
        assert_eq!(here.bits, 8);

        // End-of-block is the 7-bit all-zero code.
        let here = decode_one(&fixed.lens, FIXED_LEN_BITS, 0);
        assert_eq!(here.op & 32, 32);
        assert_eq!(here.bits, 7);

        // Every fixed distance entry consumes 5 bits.
        for stream in 0..32u32 {
            let here = decode_one(&fixed.dists, FIXED_DIST_BITS, stream);
            assert_eq!(here.bits, 5);
        }
    }

    #[test]
    fn test_long_codes_build_subtables() {
        // A skewed code with lengths 1..=15 (two 15-bit codes) forces
        // sub-table creation past a 9-bit root.
        let mut lens = [0u16; 16];
        for (i, len) in lens.iter_mut().enumerate().take(15) {
            *len = (i + 1) as u16;
        }
        lens[15] = 15;
        let mut pool = vec![Code::default(); ENOUGH];
        let mut work = [0u16; 288];
        let (used, root) =
            build_table(CodeKind::Codes, &lens[..16], &mut pool, 0, 9, &mut work).unwrap();
        assert_eq!(root, 9);
        assert!(used > 1 << 9, "sub-tables expected, used = {}", used);

        // The shortest code decodes directly from the root.
        let here = decode_one(&pool, 9, 0b0);
        assert_eq!(here.bits, 1);
        assert_eq!(here.val, 0);
    }
}
