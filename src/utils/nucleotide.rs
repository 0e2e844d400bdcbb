//! Base encoding helpers shared by the collectors.

/// Symbols in the order used for every per-base table.
pub const BASES: [u8; 5] = *b"ACGTN";

/// Slot used for anything outside A/C/G/T.
pub const OTHER_SLOT: usize = 4;

/// Index into a five-slot base table; ambiguity codes share the `N` slot.
#[inline]
pub fn base_index(base: u8) -> usize {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => OTHER_SLOT,
    }
}

/// Watson-Crick complement. Anything that is not A/C/G/T maps to itself.
#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

#[inline]
pub fn is_gc(base: u8) -> bool {
    matches!(base, b'G' | b'C' | b'g' | b'c')
}

/// Two-bit code with A < C < G < T, so numeric order equals lexicographic order.
#[inline]
pub fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Packs up to 32 bases; `None` if any base is not A/C/G/T.
pub fn encode_kmer(kmer: &[u8]) -> Option<u64> {
    debug_assert!(kmer.len() <= 32);
    kmer.iter()
        .try_fold(0u64, |acc, &b| encode_base(b).map(|code| (acc << 2) | code))
}

pub fn decode_kmer(mut code: u64, k: usize) -> String {
    let mut out = vec![b'A'; k];
    for slot in out.iter_mut().rev() {
        *slot = b"ACGT"[(code & 0b11) as usize];
        code >>= 2;
    }
    // only ACGT bytes are written
    String::from_utf8_lossy(&out).into_owned()
}

/// Reverse complement of a packed k-mer.
pub fn reverse_complement_code(mut code: u64, k: usize) -> u64 {
    let mut rc = 0u64;
    for _ in 0..k {
        rc = (rc << 2) | (3 - (code & 0b11));
        code >>= 2;
    }
    rc
}

/// The lexicographically smaller of a packed k-mer and its reverse complement.
#[inline]
pub fn canonical_code(code: u64, k: usize) -> u64 {
    code.min(reverse_complement_code(code, k))
}

#[inline]
pub fn kmer_mask(k: usize) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Rolling iterator over the packed k-mers of a sequence, restarting after
/// every non-ACGT base.
pub struct KmerCodes<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
    valid: usize,
    code: u64,
    mask: u64,
}

impl<'a> KmerCodes<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        Self {
            seq,
            k,
            pos: 0,
            valid: 0,
            code: 0,
            mask: kmer_mask(k),
        }
    }
}

impl Iterator for KmerCodes<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.k == 0 {
            return None;
        }
        while self.pos < self.seq.len() {
            let base = self.seq[self.pos];
            self.pos += 1;
            match encode_base(base) {
                Some(bits) => {
                    self.code = ((self.code << 2) | bits) & self.mask;
                    self.valid += 1;
                    if self.valid >= self.k {
                        return Some(self.code);
                    }
                }
                None => {
                    self.valid = 0;
                    self.code = 0;
                }
            }
        }
        None
    }
}
