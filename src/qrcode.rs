#![forbid(unsafe_code)]
//! QR code symbol construction.
//!
//! Implements QR Code Model 2: versions 1 to 40, all four error correction levels, Reed–Solomon
//! error correction over GF(256), function pattern placement, zigzag data placement and mask
//! selection by penalty score. Symbols own their module matrix.

use crate::segment::{BitBuffer, QrSegment};
use thiserror::Error;

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation.
///
/// # Creation
///
/// - High-level: Use [`QrCode::encode_text`], [`QrCode::encode_binary`] or
///   [`QrCode::encode_payload`].
/// - Mid-level: Use [`QrCode::encode_segments_advanced`].
/// - Low-level: Use [`QrCode::encode_segments_to_codewords`] then [`QrCode::encode_codewords`].
///
/// # Example
///
/// ```rust
/// use qrcode_processor::qrcode::{QrCode, QrCodeEcc};
///
/// let qr = QrCode::encode_text("Hello, World!", QrCodeEcc::Low).unwrap();
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrCode {
    /// The width and height of this QR Code, measured in modules, between
    /// 21 and 177 (inclusive). This is equal to version * 4 + 17.
    size: u8,

    /// The modules of this QR Code (0 = light, 1 = dark), packed bitwise into bytes
    /// in row-major order. Accessed through get_module().
    modules: Vec<u8>,
}

impl QrCode {
    /// Encodes a text string, choosing the most compact single-segment mode.
    ///
    /// The smallest version that fits is chosen, and the error correction level is raised when
    /// that does not increase the version.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self, DataTooLong> {
        Self::encode_payload(text.as_bytes(), ecl, true)
    }

    /// Encodes arbitrary bytes in byte mode.
    pub fn encode_binary(data: &[u8], ecl: QrCodeEcc) -> Result<Self, DataTooLong> {
        let seg = QrSegment::make_bytes(data);
        Self::encode_segments_advanced(&[seg], ecl, Version::MIN, Version::MAX, None, true)
    }

    /// Encodes a message payload the way the processor does: one segment whose mode is chosen
    /// by [`QrSegment::make_segments`], automatic version and mask.
    pub fn encode_payload(data: &[u8], ecl: QrCodeEcc, boostecl: bool) -> Result<Self, DataTooLong> {
        let segs = QrSegment::make_segments(data);
        Self::encode_segments_advanced(&segs, ecl, Version::MIN, Version::MAX, None, boostecl)
    }

    /// Encodes the given segments with full control over the version range, mask and ECC boost.
    ///
    /// The `mask` can be `None` for automatic selection (slower) or a value from 0 to 7.
    pub fn encode_segments_advanced(
        segs: &[QrSegment],
        ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<Self, DataTooLong> {
        let (datacodewords, ecl, version) =
            Self::encode_segments_to_codewords(segs, ecl, minversion, maxversion, boostecl)?;
        Ok(Self::encode_codewords(&datacodewords, ecl, version, mask))
    }

    /// Concatenates the segments into the data codewords of the smallest fitting version.
    ///
    /// If `boostecl` is `true`, the ECC level may be higher than the `ecl` argument if it can be
    /// done without increasing the version.
    ///
    /// # Returns
    ///
    /// The data codewords (terminated and padded to capacity), the effective ECC level and the
    /// chosen version, or a [`DataTooLong`] error.
    pub fn encode_segments_to_codewords(
        segs: &[QrSegment],
        mut ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        boostecl: bool,
    ) -> Result<(Vec<u8>, QrCodeEcc, Version), DataTooLong> {
        assert!(minversion <= maxversion, "Invalid version range");

        // Find the minimal version number to use
        let mut version: Version = minversion;
        let datausedbits: usize = loop {
            let datacapacitybits: usize = Self::get_num_data_codewords(version, ecl) * 8;
            let dataused: Option<usize> = QrSegment::get_total_bits(segs, version);
            match dataused {
                Some(n) if n <= datacapacitybits => break n,
                _ if version >= maxversion => {
                    return Err(match dataused {
                        None => DataTooLong::SegmentTooLong,
                        Some(n) => DataTooLong::DataOverCapacity(n, datacapacitybits),
                    });
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        // Increase the error correction level while the data still fits
        if boostecl {
            for newecl in [QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
                if newecl > ecl && datausedbits <= Self::get_num_data_codewords(version, newecl) * 8 {
                    ecl = newecl;
                }
            }
        }

        let datacapacitybits: usize = Self::get_num_data_codewords(version, ecl) * 8;
        let mut bb = BitBuffer::with_capacity(datacapacitybits);
        for seg in segs {
            bb.append_bits(seg.mode().mode_bits(), 4);
            // get_total_bits() has checked the count against the field width (at most 16 bits)
            bb.append_bits(seg.num_chars() as u32, seg.mode().num_char_count_bits(version));
            bb.append_buffer(seg.data());
        }
        debug_assert_eq!(bb.len(), datausedbits);

        // Add terminator and pad up to a byte if applicable
        let numzerobits: usize = (datacapacitybits - bb.len()).min(4);
        bb.append_bits(0, numzerobits as u8);
        let numzerobits: usize = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, numzerobits as u8);
        debug_assert_eq!(bb.len() % 8, 0);

        // Pad with alternating bytes until data capacity is reached
        for &padbyte in [0xec, 0x11].iter().cycle() {
            if bb.len() >= datacapacitybits {
                break;
            }
            bb.append_bits(padbyte, 8);
        }
        Ok((bb.into_bytes(), ecl, version))
    }

    /// Creates a new QR Code with the given version number,
    /// error correction level, data codeword bytes, and mask number.
    ///
    /// This is a low-level API that most users should not use directly.
    ///
    /// # Panics
    ///
    /// Panics if `datacodewords` does not hold exactly the number of data codewords for the
    /// version and level.
    pub fn encode_codewords(
        datacodewords: &[u8],
        ecl: QrCodeEcc,
        version: Version,
        mask: Option<Mask>,
    ) -> Self {
        let allcodewords: Vec<u8> = Self::add_ecc_and_interleave(datacodewords, version, ecl);

        // Draw modules
        let mut result = Self::function_modules_marked(version);
        result.draw_codewords(&allcodewords);
        result.draw_light_function_modules();
        let funcmods = Self::function_modules_marked(version);

        // Do masking
        let mask: Mask = match mask {
            Some(m) => m,
            None => {
                let mut best = Mask::new(0);
                let mut minpenalty = i32::MAX;
                for i in 0u8..8 {
                    let candidate = Mask::new(i);
                    result.apply_mask(&funcmods, candidate);
                    result.draw_format_bits(ecl, candidate);
                    let penalty: i32 = result.get_penalty_score();
                    if penalty < minpenalty {
                        best = candidate;
                        minpenalty = penalty;
                    }
                    result.apply_mask(&funcmods, candidate); // Undoes the mask due to XOR
                }
                best
            }
        };
        result.apply_mask(&funcmods, mask);
        result.draw_format_bits(ecl, mask);
        result
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        Version::new((self.size - 17) / 4)
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        i32::from(self.size)
    }

    /// Returns this QR Code's error correction level, read back from the format information.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.read_format().0
    }

    /// Returns this QR Code's mask, read back from the format information.
    pub fn mask(&self) -> Mask {
        self.read_format().1
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size();
        range.contains(&x) && range.contains(&y) && self.get_module_bounded(x as u8, y as u8)
    }

    fn get_module_bounded(&self, x: u8, y: u8) -> bool {
        let index = usize::from(y) * usize::from(self.size) + usize::from(x);
        (self.modules[index >> 3] >> (index & 7)) & 1 != 0
    }

    fn set_module_unbounded(&mut self, x: i32, y: i32, isdark: bool) {
        let range = 0..self.size();
        if range.contains(&x) && range.contains(&y) {
            self.set_module_bounded(x as u8, y as u8, isdark);
        }
    }

    fn set_module_bounded(&mut self, x: u8, y: u8, isdark: bool) {
        let index = usize::from(y) * usize::from(self.size) + usize::from(x);
        if isdark {
            self.modules[index >> 3] |= 1u8 << (index & 7);
        } else {
            self.modules[index >> 3] &= !(1u8 << (index & 7));
        }
    }

    fn read_format(&self) -> (QrCodeEcc, Mask) {
        let mut bits: u32 = 0;
        for i in 0..6 {
            bits |= u32::from(self.get_module_bounded(8, i)) << i;
        }
        bits |= u32::from(self.get_module_bounded(8, 7)) << 6;
        bits |= u32::from(self.get_module_bounded(8, 8)) << 7;
        bits |= u32::from(self.get_module_bounded(7, 8)) << 8;
        for i in 9..15 {
            bits |= u32::from(self.get_module_bounded(14 - i, 8)) << i;
        }
        let data = (bits ^ 0x5412) >> 10;
        (
            QrCodeEcc::from_format_bits((data >> 3) as u8),
            Mask::new((data & 7) as u8),
        )
    }

    /// Appends Reed–Solomon codewords to each block of `data` and interleaves the result.
    fn add_ecc_and_interleave(data: &[u8], ver: Version, ecl: QrCodeEcc) -> Vec<u8> {
        assert_eq!(
            data.len(),
            Self::get_num_data_codewords(ver, ecl),
            "Invalid data codeword count"
        );
        let numblocks: usize = Self::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let blockecclen: usize = Self::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let rawcodewords: usize = Self::get_num_raw_data_modules(ver) / 8;
        let numshortblocks: usize = numblocks - (rawcodewords % numblocks);
        let shortblockdatalen: usize = rawcodewords / numblocks - blockecclen;

        let mut result = vec![0u8; rawcodewords];
        let rs = ReedSolomonGenerator::new(blockecclen);
        let mut ecc = vec![0u8; blockecclen];
        let mut dat: &[u8] = data;
        for i in 0..numblocks {
            let datlen: usize = shortblockdatalen + usize::from(i >= numshortblocks);
            rs.compute_remainder(&dat[..datlen], &mut ecc);
            let mut k: usize = i;
            for (j, &b) in dat[..datlen].iter().enumerate() {
                // Long blocks carry one extra byte, placed after every block's short part
                if j == shortblockdatalen {
                    k -= numshortblocks;
                }
                result[k] = b;
                k += numblocks;
            }
            let mut k: usize = data.len() + i;
            for &b in &ecc {
                result[k] = b;
                k += numblocks;
            }
            dat = &dat[datlen..];
        }
        debug_assert!(dat.is_empty());
        result
    }

    /// A symbol of the given version in which exactly the function modules are dark.
    pub(crate) fn function_modules_marked(ver: Version) -> Self {
        let size: u8 = ver.value() * 4 + 17;
        let cells = usize::from(size) * usize::from(size);
        let mut result = Self {
            size,
            modules: vec![0u8; cells.div_ceil(8)],
        };
        // Timing patterns
        result.fill_rectangle(6, 0, 1, size);
        result.fill_rectangle(0, 6, size, 1);
        // Finder patterns with separators and format information
        result.fill_rectangle(0, 0, 9, 9);
        result.fill_rectangle(size - 8, 0, 8, 9);
        result.fill_rectangle(0, size - 8, 9, 8);
        // Alignment patterns, except the three that would overlap finders
        let alignpatpos: Vec<u8> = result.get_alignment_pattern_positions();
        let last = alignpatpos.len().saturating_sub(1);
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                if !((i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0)) {
                    result.fill_rectangle(pos0 - 2, pos1 - 2, 5, 5);
                }
            }
        }
        // Version information
        if ver.value() >= 7 {
            result.fill_rectangle(size - 11, 0, 3, 6);
            result.fill_rectangle(0, size - 11, 6, 3);
        }
        result
    }

    /// Clears the light parts of the function patterns and draws version information.
    fn draw_light_function_modules(&mut self) {
        let size: u8 = self.size;
        for i in (7..size - 7).step_by(2) {
            self.set_module_bounded(6, i, false);
            self.set_module_bounded(i, 6, false);
        }
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let dist: i32 = dx.abs().max(dy.abs());
                if dist == 2 || dist == 4 {
                    self.set_module_unbounded(3 + dx, 3 + dy, false);
                    self.set_module_unbounded(i32::from(size) - 4 + dx, 3 + dy, false);
                    self.set_module_unbounded(3 + dx, i32::from(size) - 4 + dy, false);
                }
            }
        }
        let alignpatpos: Vec<u8> = self.get_alignment_pattern_positions();
        let last = alignpatpos.len().saturating_sub(1);
        for (i, &pos0) in alignpatpos.iter().enumerate() {
            for (j, &pos1) in alignpatpos.iter().enumerate() {
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        self.set_module_bounded(
                            (i32::from(pos0) + dx) as u8,
                            (i32::from(pos1) + dy) as u8,
                            dx == 0 && dy == 0,
                        );
                    }
                }
            }
        }
        let ver: u8 = self.version().value();
        if ver >= 7 {
            let bits: u32 = Self::version_bits(ver);
            for i in 0u8..18 {
                let bit: bool = get_bit(bits, i);
                let a: u8 = size - 11 + (i % 3);
                let b: u8 = i / 3;
                self.set_module_bounded(a, b, bit);
                self.set_module_bounded(b, a, bit);
            }
        }
    }

    /// The 15-bit format information word: BCH(15,5) code of level and mask, XOR 0x5412.
    pub(crate) fn format_bits(ecl: QrCodeEcc, mask: Mask) -> u32 {
        let data = u32::from((ecl.format_bits() << 3) | mask.value());
        let mut rem: u32 = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * 0x537);
        }
        ((data << 10) | rem) ^ 0x5412
    }

    /// The 18-bit version information word: BCH(18,6) code of the version number.
    pub(crate) fn version_bits(ver: u8) -> u32 {
        let ver = u32::from(ver);
        let mut rem: u32 = ver;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
        }
        (ver << 12) | rem
    }

    fn draw_format_bits(&mut self, ecl: QrCodeEcc, mask: Mask) {
        let bits: u32 = Self::format_bits(ecl, mask);
        // First copy, around the top left finder
        for i in 0..6 {
            self.set_module_bounded(8, i, get_bit(bits, i));
        }
        self.set_module_bounded(8, 7, get_bit(bits, 6));
        self.set_module_bounded(8, 8, get_bit(bits, 7));
        self.set_module_bounded(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_module_bounded(14 - i, 8, get_bit(bits, i));
        }
        // Second copy, split between the other two finders
        let size: u8 = self.size;
        for i in 0..8 {
            self.set_module_bounded(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.set_module_bounded(8, size - 15 + i, get_bit(bits, i));
        }
        self.set_module_bounded(8, size - 8, true);
    }

    fn fill_rectangle(&mut self, left: u8, top: u8, width: u8, height: u8) {
        for dy in 0..height {
            for dx in 0..width {
                self.set_module_bounded(left + dx, top + dy, true);
            }
        }
    }

    /// Places codeword bits in the zigzag column-pair order, skipping function modules.
    /// Must be called while function modules are still marked dark.
    fn draw_codewords(&mut self, data: &[u8]) {
        assert_eq!(
            data.len(),
            Self::get_num_raw_data_modules(self.version()) / 8,
            "Illegal argument"
        );
        let size: i32 = self.size();
        let mut i: usize = 0;
        let mut right: i32 = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            let upward: bool = ((right + 1) & 2) == 0;
            for vert in 0..size {
                for j in 0..2 {
                    let x = (right - j) as u8;
                    let y = (if upward { size - 1 - vert } else { vert }) as u8;
                    if !self.get_module_bounded(x, y) && i < data.len() * 8 {
                        self.set_module_bounded(x, y, get_bit(data[i >> 3].into(), 7 - ((i & 7) as u8)));
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, data.len() * 8);
    }

    /// XORs the mask pattern onto every non-function module. Applying it twice undoes it.
    fn apply_mask(&mut self, functionmodules: &QrCode, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                if functionmodules.get_module_bounded(x, y) {
                    continue;
                }
                let invert: bool = mask.inverts(i32::from(x), i32::from(y));
                self.set_module_bounded(x, y, self.get_module_bounded(x, y) ^ invert);
            }
        }
    }

    fn get_penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size: u8 = self.size;

        // Adjacent modules in row having same color, and finder-like patterns
        for y in 0..size {
            let mut runcolor = false;
            let mut runx: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for x in 0..size {
                if self.get_module_bounded(x, y) == runcolor {
                    runx += 1;
                    if runx == 5 {
                        result += PENALTY_N1;
                    } else if runx > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runx);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.get_module_bounded(x, y);
                    runx = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runx) * PENALTY_N3;
        }
        // Adjacent modules in column having same color, and finder-like patterns
        for x in 0..size {
            let mut runcolor = false;
            let mut runy: i32 = 0;
            let mut runhistory = FinderPenalty::new(size);
            for y in 0..size {
                if self.get_module_bounded(x, y) == runcolor {
                    runy += 1;
                    if runy == 5 {
                        result += PENALTY_N1;
                    } else if runy > 5 {
                        result += 1;
                    }
                } else {
                    runhistory.add_history(runy);
                    if !runcolor {
                        result += runhistory.count_patterns() * PENALTY_N3;
                    }
                    runcolor = self.get_module_bounded(x, y);
                    runy = 1;
                }
            }
            result += runhistory.terminate_and_count(runcolor, runy) * PENALTY_N3;
        }

        // 2*2 blocks of modules having same color
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color: bool = self.get_module_bounded(x, y);
                if color == self.get_module_bounded(x + 1, y)
                    && color == self.get_module_bounded(x, y + 1)
                    && color == self.get_module_bounded(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        // Balance of dark and light modules
        let dark = self.modules.iter().map(|x| x.count_ones()).sum::<u32>() as i32;
        let total = i32::from(size) * i32::from(size);
        // Smallest k such that (45-5k)% <= dark/total <= (55+5k)%
        let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }

    /// Ascending centre coordinates of the alignment patterns, empty for version 1.
    fn get_alignment_pattern_positions(&self) -> Vec<u8> {
        let ver: u8 = self.version().value();
        if ver == 1 {
            return Vec::new();
        }
        let numalign: u8 = ver / 7 + 2;
        let step: u8 = if ver == 32 {
            26
        } else {
            ((ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2)) * 2
        };
        let mut result: Vec<u8> = (0..numalign - 1).map(|i| self.size - 7 - i * step).collect();
        result.push(6);
        result.reverse();
        result
    }

    /// Number of data bits that fit in a symbol of this version, after all function modules
    /// are excluded. Includes remainder bits, so it may not be a multiple of 8.
    pub(crate) fn get_num_raw_data_modules(ver: Version) -> usize {
        let ver = usize::from(ver.value());
        let mut result: usize = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign: usize = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    /// Number of 8-bit data codewords (excluding error correction) at this version and level.
    pub(crate) fn get_num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
        Self::get_num_raw_data_modules(ver) / 8
            - Self::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl)
                * Self::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
    }

    pub(crate) fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
        table[ecl.ordinal()][usize::from(ver.value())] as usize
    }
}

/// Computes Reed–Solomon error correction codewords over GF(2^8/0x11D).
pub(crate) struct ReedSolomonGenerator {
    /// Coefficients of the generator polynomial, highest to lowest power, excluding the leading 1.
    divisor: [u8; 30],
    degree: usize,
}

impl ReedSolomonGenerator {
    pub(crate) fn new(degree: usize) -> Self {
        let mut result = Self {
            divisor: [0u8; 30],
            degree,
        };
        assert!((1..=result.divisor.len()).contains(&degree), "Degree out of range");
        let divisor: &mut [u8] = &mut result.divisor[..degree];
        divisor[degree - 1] = 1; // Start off with the monomial x^0

        // Multiply by (x - r^i) for i = 0..degree-1, where r = 0x02 generates the field
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        result
    }

    /// Writes the remainder of `data` times x^degree divided by the generator into `result`.
    pub(crate) fn compute_remainder(&self, data: &[u8], result: &mut [u8]) {
        assert_eq!(result.len(), self.degree);
        result.fill(0);
        for b in data {
            let factor: u8 = b ^ result[0];
            result.copy_within(1.., 0);
            result[self.degree - 1] = 0;
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= Self::multiply(y, factor);
            }
        }
    }

    fn multiply(x: u8, y: u8) -> u8 {
        // Russian peasant multiplication
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1d);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

/// Run-length history for the finder-like pattern penalty (rule 3).
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: u8) -> Self {
        Self {
            qr_size: i32::from(size),
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size; // Add light border to initial run
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Counts 1:1:3:1:1 dark-light patterns with 4 light modules on at least one side.
    /// Can only be called immediately after a light run is added.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        debug_assert!(n <= self.qr_size * 3);
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n) + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            // Terminate dark run
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size; // Add light border to final run
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

pub(crate) static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    // Version: (note that index 0 is for padding, and is set to an illegal value)
    //0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40
    [-1,  7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30], // Low
    [-1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28], // Medium
    [-1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30], // Quartile
    [-1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30], // High
];

pub(crate) static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    // Version: (note that index 0 is for padding, and is set to an illegal value)
    //0, 1, 2, 3, 4, 5, 6, 7, 8, 9,10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40
    [-1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4,  4,  4,  4,  4,  6,  6,  6,  6,  7,  8,  8,  9,  9, 10, 12, 12, 12, 13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25], // Low
    [-1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5,  5,  8,  9,  9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49], // Medium
    [-1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8,  8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68], // Quartile
    [-1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81], // High
];

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    fn ordinal(self) -> usize {
        use QrCodeEcc::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// The 2-bit value used in the format information.
    fn format_bits(self) -> u8 {
        use QrCodeEcc::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }

    pub(crate) fn from_format_bits(bits: u8) -> Self {
        use QrCodeEcc::*;
        match bits & 3 {
            1 => Low,
            0 => Medium,
            3 => Quartile,
            _ => High,
        }
    }

    /// The lowercase configuration name of this level.
    pub fn name(self) -> &'static str {
        use QrCodeEcc::*;
        match self {
            Low => "low",
            Medium => "medium",
            Quartile => "quartile",
            High => "high",
        }
    }
}

/// Error type for when data exceeds QR code capacity.
///
/// Ways to handle this error include:
///
/// - Decrease the error correction level if it was greater than `QrCodeEcc::Low`.
/// - Change the payload to be shorter.
/// - Propagate the error upward to the caller/user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataTooLong {
    /// A segment has more characters than its count field can express.
    #[error("Segment too long")]
    SegmentTooLong,
    /// Data length exceeds capacity.
    #[error("Data length = {0} bits, Max capacity = {1} bits")]
    DataOverCapacity(usize, usize),
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Side length in modules.
    pub const fn size(self) -> u8 {
        self.0 * 4 + 17
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this pattern flips the module at (x, y).
    pub(crate) fn inverts(self, x: i32, y: i32) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => x * y % 2 + x * y % 3 == 0,
            6 => (x * y % 2 + x * y % 3) % 2 == 0,
            7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}
