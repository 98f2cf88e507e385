//! Data segments and the bit buffer they are packed into.
//!
//! A segment is a run of payload characters encoded in a single mode (numeric, alphanumeric,
//! byte, kanji) or an ECI designator. Segments own their bit strings, so a symbol can be built
//! from them without any caller-provided scratch buffers.

use crate::qrcode::Version;

/// A segment of data in a QR code.
///
/// Create segments with [`QrSegment::make_bytes`], [`QrSegment::make_numeric`],
/// [`QrSegment::make_alphanumeric`], [`QrSegment::make_kanji`] or [`QrSegment::make_eci`], or let
/// [`QrSegment::make_segments`] pick the mode for a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrSegment {
    mode: QrSegmentMode,
    numchars: usize,
    data: BitBuffer,
}

impl QrSegment {
    /// Creates a segment for binary data in byte mode.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::with_capacity(data.len() * 8);
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        Self::new(QrSegmentMode::Byte, data.len(), bb)
    }

    /// Creates a segment for a string of decimal digits in numeric mode.
    ///
    /// Returns `None` if `digits` contains anything other than `0`–`9`.
    pub fn make_numeric(digits: &[u8]) -> Option<Self> {
        if !Self::is_numeric(digits) {
            return None;
        }
        let mut bb = BitBuffer::with_capacity(digits.len() * 10 / 3 + 4);
        for chunk in digits.chunks(3) {
            let value = chunk
                .iter()
                .fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0'));
            // 3 digits -> 10 bits, 2 -> 7, 1 -> 4
            bb.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        Some(Self::new(QrSegmentMode::Numeric, digits.len(), bb))
    }

    /// Creates a segment for alphanumeric text.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    /// Returns `None` for anything else.
    pub fn make_alphanumeric(text: &[u8]) -> Option<Self> {
        let mut bb = BitBuffer::with_capacity(text.len() * 11 / 2 + 6);
        for pair in text.chunks(2) {
            let mut value: u32 = 0;
            for &c in pair {
                value = value * 45 + alphanumeric_index(c)?;
            }
            bb.append_bits(value, if pair.len() == 2 { 11 } else { 6 });
        }
        Some(Self::new(QrSegmentMode::Alphanumeric, text.len(), bb))
    }

    /// Creates a kanji-mode segment from Shift JIS double-byte characters.
    ///
    /// Every pair of bytes must be a Shift JIS code in `0x8140..=0x9FFC` or `0xE040..=0xEBBF`
    /// with a trail byte in `0x40..=0xFC` (excluding `0x7F`). Returns `None` otherwise.
    pub fn make_kanji(sjis: &[u8]) -> Option<Self> {
        if !Self::is_kanji(sjis) {
            return None;
        }
        let mut bb = BitBuffer::with_capacity(sjis.len() / 2 * 13);
        for pair in sjis.chunks_exact(2) {
            let code = u32::from(pair[0]) << 8 | u32::from(pair[1]);
            let offset = if code <= 0x9FFC { code - 0x8140 } else { code - 0xC140 };
            bb.append_bits((offset >> 8) * 0xC0 + (offset & 0xFF), 13);
        }
        Some(Self::new(QrSegmentMode::Kanji, sjis.len() / 2, bb))
    }

    /// Creates a segment representing an Extended Channel Interpretation
    /// (ECI) designator with the given assignment value.
    ///
    /// Returns `None` if the value is 1 000 000 or more.
    pub fn make_eci(assignval: u32) -> Option<Self> {
        let mut bb = BitBuffer::with_capacity(24);
        if assignval < 1 << 7 {
            bb.append_bits(assignval, 8);
        } else if assignval < 1 << 14 {
            bb.append_bits(0b10, 2);
            bb.append_bits(assignval, 14);
        } else if assignval < 1_000_000 {
            bb.append_bits(0b110, 3);
            bb.append_bits(assignval, 21);
        } else {
            return None;
        }
        Some(Self::new(QrSegmentMode::Eci, 0, bb))
    }

    /// Picks a single segment for the whole payload: numeric if every byte is a digit,
    /// alphanumeric if every byte is in the alphanumeric set, byte mode otherwise.
    /// An empty payload produces no segments.
    pub fn make_segments(data: &[u8]) -> Vec<Self> {
        if data.is_empty() {
            return Vec::new();
        }
        let seg = Self::make_numeric(data)
            .or_else(|| Self::make_alphanumeric(data))
            .unwrap_or_else(|| Self::make_bytes(data));
        vec![seg]
    }

    pub fn new(mode: QrSegmentMode, numchars: usize, data: BitBuffer) -> Self {
        Self {
            mode,
            numchars,
            data,
        }
    }

    pub fn mode(&self) -> QrSegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    pub fn data(&self) -> &BitBuffer {
        &self.data
    }

    /// Total bits needed to encode `segs` at `version`, headers included.
    ///
    /// Returns `None` if a segment has too many characters for its count field at this version,
    /// or the total overflows.
    pub(crate) fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits: u8 = seg.mode.num_char_count_bits(version);
            if seg.numchars >= 1usize << ccbits {
                return None;
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.data.len())?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &[u8]) -> bool {
        text.iter().all(u8::is_ascii_digit)
    }

    pub fn is_alphanumeric(text: &[u8]) -> bool {
        text.iter().all(|&c| alphanumeric_index(c).is_some())
    }

    pub fn is_kanji(sjis: &[u8]) -> bool {
        sjis.len() % 2 == 0
            && sjis.chunks_exact(2).all(|pair| {
                let code = u16::from(pair[0]) << 8 | u16::from(pair[1]);
                let in_range = (0x8140..=0x9FFC).contains(&code) || (0xE040..=0xEBBF).contains(&code);
                in_range && (0x40..=0xFC).contains(&pair[1]) && pair[1] != 0x7F
            })
    }
}

pub(crate) static ALPHANUMERIC_CHARSET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn alphanumeric_index(c: u8) -> Option<u32> {
    ALPHANUMERIC_CHARSET
        .iter()
        .position(|&x| x == c)
        .map(|i| i as u32)
}

/// The encoding mode of a [`QrSegment`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QrSegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    Eci,
}

impl QrSegmentMode {
    /// The 4-bit mode indicator.
    pub(crate) fn mode_bits(self) -> u32 {
        use QrSegmentMode::*;
        match self {
            Numeric => 0x1,
            Alphanumeric => 0x2,
            Byte => 0x4,
            Kanji => 0x8,
            Eci => 0x7,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_mode_bits(bits: u32) -> Option<Self> {
        use QrSegmentMode::*;
        match bits {
            0x1 => Some(Numeric),
            0x2 => Some(Alphanumeric),
            0x4 => Some(Byte),
            0x8 => Some(Kanji),
            0x7 => Some(Eci),
            _ => None,
        }
    }

    /// Width of the character count field, which grows at versions 10 and 27.
    pub(crate) fn num_char_count_bits(self, ver: Version) -> u8 {
        use QrSegmentMode::*;
        (match self {
            Numeric => [10, 12, 14],
            Alphanumeric => [9, 11, 13],
            Byte => [8, 16, 16],
            Kanji => [8, 10, 12],
            Eci => [0, 0, 0],
        })[usize::from((ver.value() + 7) / 17)]
    }
}

/// An appendable sequence of bits, packed MSB-first into bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            data: Vec::with_capacity(bits.div_ceil(8)),
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn get_bit(&self, index: usize) -> bool {
        (self.data[index >> 3] >> (7 - (index & 7))) & 1 != 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "Value out of range");
        for i in (0..len).rev() {
            if self.length % 8 == 0 {
                self.data.push(0);
            }
            let bit = ((val >> i) & 1) as u8;
            self.data[self.length >> 3] |= bit << (7 - (self.length & 7));
            self.length += 1;
        }
    }

    pub fn append_buffer(&mut self, other: &BitBuffer) {
        for i in 0..other.len() {
            self.append_bits(u32::from(other.get_bit(i)), 1);
        }
    }

    /// The packed bytes. The final byte is zero-padded if the length is not a multiple of 8.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
