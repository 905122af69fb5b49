//! Bit-range metadata describing where a field lives inside an encoded instruction word, plus the
//! codec that moves logical field values in and out of that placement.
//!
//! A field is an ordered list of [`BitRange`]s, most-significant range first. The ranges are
//! concatenated in that order to form the logical value, so the last range supplies the least
//! significant bits.

use std::fmt;

use smallvec::SmallVec;

/// Contiguous span of `length` bits whose least significant bit sits at `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitRange {
    pub start: u32,
    pub length: u32,
}

impl BitRange {
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// Index of the most significant bit covered by the range.
    pub fn msb(&self) -> u32 {
        self.start.saturating_add(self.length).saturating_sub(1)
    }

    pub fn mask(&self) -> u64 {
        shl_saturating(width_mask(self.length), self.start)
    }

    /// One past the most significant bit, or `None` if that overflows.
    pub fn end(&self) -> Option<u32> {
        self.start.checked_add(self.length)
    }

    pub fn contains(&self, bit: u32) -> bool {
        bit >= self.start && bit < self.start.saturating_add(self.length)
    }

    pub fn overlaps(&self, other: &BitRange) -> bool {
        self.start < other.start.saturating_add(other.length)
            && other.start < self.start.saturating_add(self.length)
    }

    pub fn shifted(&self, by: u32) -> Self {
        Self::new(self.start + by, self.length)
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.msb(), self.start)
        }
    }
}

pub type BitRanges = SmallVec<[BitRange; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitFieldError {
    Empty,
    Syntax(String),
    ReversedRange { hi: u32, lo: u32 },
    Overlap { first: BitRange, second: BitRange },
    TooWide(u32),
    /// A bit index outside the 64-bit codec.
    OutOfRange(u32),
}

impl fmt::Display for BitFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitFieldError::Empty => write!(f, "location lists no bit ranges"),
            BitFieldError::Syntax(text) => write!(f, "malformed location segment '{text}'"),
            BitFieldError::ReversedRange { hi, lo } => {
                write!(f, "range {hi}-{lo} must be written high bit first")
            }
            BitFieldError::Overlap { first, second } => {
                write!(f, "ranges {first} and {second} overlap")
            }
            BitFieldError::TooWide(width) => {
                write!(f, "field width {width} exceeds the 64-bit codec")
            }
            BitFieldError::OutOfRange(bit) => {
                write!(f, "bit {bit} is outside the 64-bit codec")
            }
        }
    }
}

impl std::error::Error for BitFieldError {}

/// Physical placement of one field. `signed` marks fields whose logical value is sign-extended
/// from the total width.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitField {
    pub ranges: BitRanges,
    pub signed: bool,
}

impl BitField {
    pub fn builder() -> BitFieldBuilder {
        BitFieldBuilder::new()
    }

    pub fn from_range(start: u32, length: u32) -> Self {
        let mut ranges = SmallVec::new();
        ranges.push(BitRange::new(start, length));
        Self {
            ranges,
            signed: false,
        }
    }

    /// Parses the `hi-lo|hi-lo|n` location syntax used by instruction and CSR definitions.
    pub fn from_location(location: &str) -> Result<Self, BitFieldError> {
        let mut builder = Self::builder();
        for segment in location.split('|') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(BitFieldError::Syntax(location.to_string()));
            }
            let range = match segment.split_once('-') {
                Some((hi, lo)) => {
                    let hi = parse_bit_index(hi, segment)?;
                    let lo = parse_bit_index(lo, segment)?;
                    if hi < lo {
                        return Err(BitFieldError::ReversedRange { hi, lo });
                    }
                    BitRange::new(lo, hi - lo + 1)
                }
                None => BitRange::new(parse_bit_index(segment, segment)?, 1),
            };
            builder = builder.range(range.start, range.length);
        }
        builder.finish()
    }

    pub fn total_width(&self) -> u32 {
        self.ranges.iter().map(|range| range.length).sum()
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Union of every bit position covered by the field.
    pub fn mask(&self) -> u64 {
        self.ranges.iter().fold(0, |acc, range| acc | range.mask())
    }

    /// Extracts the raw (unsigned, unshifted) field value from `word`.
    pub fn decode(&self, word: u64) -> u64 {
        self.ranges.iter().fold(0u64, |acc, range| {
            let chunk = (word >> range.start) & width_mask(range.length);
            shl_saturating(acc, range.length) | chunk
        })
    }

    /// Extracts the field value and sign-extends it from the field width.
    pub fn decode_signed(&self, word: u64) -> i64 {
        sign_extend(self.decode(word), self.total_width())
    }

    /// Decodes honouring the field's own signedness.
    pub fn decode_logical(&self, word: u64) -> i64 {
        if self.signed {
            self.decode_signed(word)
        } else {
            self.decode(word) as i64
        }
    }

    /// Slices `value` into range-sized chunks and ORs them into `word` at each range's start.
    /// Traversal order matches [`BitField::decode`], so the last range receives the low bits.
    pub fn encode(&self, value: u64, word: u64) -> u64 {
        let mut offset = 0u32;
        let mut out = word;
        for range in self.ranges.iter().rev() {
            let chunk = shr_saturating(value, offset) & width_mask(range.length);
            out |= chunk << range.start;
            offset += range.length;
        }
        out
    }

    /// Re-expresses every range relative to a container `by` bits wider at the top.
    pub fn shifted(&self, by: u32) -> Self {
        Self {
            ranges: self.ranges.iter().map(|range| range.shifted(by)).collect(),
            signed: self.signed,
        }
    }

    /// Largest value representable in the field width.
    pub fn max_value(&self) -> u64 {
        width_mask(self.total_width())
    }
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, range) in self.ranges.iter().enumerate() {
            if idx > 0 {
                f.write_str("|")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

pub struct BitFieldBuilder {
    ranges: BitRanges,
    signed: bool,
}

impl BitFieldBuilder {
    fn new() -> Self {
        Self {
            ranges: SmallVec::new(),
            signed: false,
        }
    }

    pub fn range(mut self, start: u32, length: u32) -> Self {
        self.ranges.push(BitRange::new(start, length));
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn finish(self) -> Result<BitField, BitFieldError> {
        if self.ranges.is_empty() {
            return Err(BitFieldError::Empty);
        }
        for range in &self.ranges {
            if range.length == 0 {
                return Err(BitFieldError::Syntax(range.start.to_string()));
            }
            match range.end() {
                Some(end) if end <= 64 => {}
                _ => {
                    let msb = range.start.saturating_add(range.length - 1);
                    return Err(BitFieldError::OutOfRange(msb));
                }
            }
        }
        for (idx, first) in self.ranges.iter().enumerate() {
            for second in &self.ranges[idx + 1..] {
                if first.overlaps(second) {
                    return Err(BitFieldError::Overlap {
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        let field = BitField {
            ranges: self.ranges,
            signed: self.signed,
        };
        let width = field.total_width();
        if width > 64 {
            return Err(BitFieldError::TooWide(width));
        }
        Ok(field)
    }
}

fn parse_bit_index(text: &str, segment: &str) -> Result<u32, BitFieldError> {
    let bit = text
        .trim()
        .parse::<u32>()
        .map_err(|_| BitFieldError::Syntax(segment.to_string()))?;
    if bit >= 64 {
        return Err(BitFieldError::OutOfRange(bit));
    }
    Ok(bit)
}

/// Mask with the low `width` bits set.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

pub fn sign_extend(value: u64, width: u32) -> i64 {
    if width == 0 {
        return 0;
    }
    if width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Smallest power of two that is `>= bits`.
pub fn next_power_of_two(bits: u32) -> u32 {
    bits.max(1).next_power_of_two()
}

/// Width of the host integer used to carry a value of `bits` bits: the next power of two,
/// clamped to 8..=64.
pub fn storage_bits(bits: u32) -> u32 {
    next_power_of_two(bits).clamp(8, 64)
}

fn shl_saturating(value: u64, by: u32) -> u64 {
    if by >= 64 { 0 } else { value << by }
}

fn shr_saturating(value: u64, by: u32) -> u64 {
    if by >= 64 { 0 } else { value >> by }
}
