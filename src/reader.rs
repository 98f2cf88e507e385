//! Test-only symbol reader.
//!
//! Recovers the payload bytes from a module grid, checking format information, version
//! information and every Reed–Solomon block along the way. It does no error correction: a grid
//! with a single wrong module is rejected.

use crate::qrcode::{
    Mask, QrCode, QrCodeEcc, ReedSolomonGenerator, Version, ECC_CODEWORDS_PER_BLOCK,
    NUM_ERROR_CORRECTION_BLOCKS,
};
use crate::segment::{QrSegmentMode, ALPHANUMERIC_CHARSET};
use image::GrayImage;

type Grid = Vec<Vec<bool>>;

pub fn grid_from_symbol(qr: &QrCode) -> Grid {
    (0..qr.size())
        .map(|y| (0..qr.size()).map(|x| qr.get_module(x, y)).collect())
        .collect()
}

/// Samples the centre of every module of a rendered image. Pixels below 128 are dark.
pub fn grid_from_luma(img: &GrayImage, scale: u32, border: u32) -> Grid {
    let dimension = img.width() / scale;
    let side = dimension - 2 * border;
    (0..side)
        .map(|y| {
            (0..side)
                .map(|x| {
                    let px = (x + border) * scale + scale / 2;
                    let py = (y + border) * scale + scale / 2;
                    img.get_pixel(px, py).0[0] < 128
                })
                .collect()
        })
        .collect()
}

/// Rasterizes the path of an SVG document at one sample per module, using the nonzero rule.
pub fn grid_from_svg(svg: &str, border: usize) -> Result<Grid, String> {
    let dimension: usize = attribute(svg, "viewBox=\"0 0 ")?
        .split(' ')
        .next()
        .and_then(|d| d.parse().ok())
        .ok_or("bad viewBox")?;
    let path = attribute(svg, " d=\"")?;

    // crossings[y][x]: signed count of vertical edges at column x spanning row y
    let mut crossings = vec![vec![0i64; dimension + 1]; dimension];
    let mut add_edge = |x: i64, y0: i64, y1: i64| -> Result<(), String> {
        let sign = if y1 > y0 { 1 } else { -1 };
        for y in y0.min(y1)..y0.max(y1) {
            let row = crossings.get_mut(y as usize).ok_or("edge outside viewBox")?;
            *row.get_mut(x as usize).ok_or("edge outside viewBox")? += sign;
        }
        Ok(())
    };

    let mut chars = path.chars().peekable();
    let (mut cur, mut start) = ((0i64, 0i64), (0i64, 0i64));
    while let Some(c) = chars.next() {
        match c {
            ' ' => {}
            'M' => {
                let x = number(&mut chars)?;
                if chars.next() != Some(',') {
                    return Err("expected comma".to_string());
                }
                let y = number(&mut chars)?;
                cur = (x, y);
                start = cur;
            }
            'h' => cur.0 += number(&mut chars)?,
            'v' => {
                let dy = number(&mut chars)?;
                add_edge(cur.0, cur.1, cur.1 + dy)?;
                cur.1 += dy;
            }
            'z' => {
                if cur.0 != start.0 && cur.1 != start.1 {
                    return Err("diagonal close".to_string());
                }
                if cur.1 != start.1 {
                    add_edge(cur.0, cur.1, start.1)?;
                }
                cur = start;
            }
            other => return Err(format!("unexpected path command {other:?}")),
        }
    }

    let side = dimension - 2 * border;
    let mut grid = vec![vec![false; side]; side];
    for (y, row) in crossings.iter().enumerate() {
        // Winding number of a cell is the sum of crossings to the right of its centre
        let mut winding = 0;
        for x in (0..dimension).rev() {
            winding += row[x + 1];
            let in_symbol = (border..border + side).contains(&x) && (border..border + side).contains(&y);
            if in_symbol {
                grid[y - border][x - border] = winding != 0;
            }
        }
    }
    Ok(grid)
}

fn attribute<'a>(svg: &'a str, prefix: &str) -> Result<&'a str, String> {
    let begin = svg.find(prefix).ok_or(format!("missing {prefix}"))? + prefix.len();
    let len = svg[begin..].find('"').ok_or("unterminated attribute")?;
    Ok(&svg[begin..begin + len])
}

fn number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<i64, String> {
    let mut text = String::new();
    if chars.peek() == Some(&'-') {
        text.push('-');
        chars.next();
    }
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        text.push(c);
        chars.next();
    }
    text.parse().map_err(|_| format!("bad number {text:?}"))
}

/// Decodes a symbol grid (true = dark) back to its payload bytes.
pub fn decode_grid(grid: &[Vec<bool>]) -> Result<Vec<u8>, String> {
    let size = grid.len();
    if grid.iter().any(|row| row.len() != size) || size < 21 || (size - 17) % 4 != 0 {
        return Err(format!("not a symbol grid: {size} rows"));
    }
    let ver = u8::try_from((size - 17) / 4)
        .ok()
        .filter(|v| (1..=40).contains(v))
        .map(Version::new)
        .ok_or("version out of range")?;
    let module = |x: usize, y: usize| grid[y][x];

    let (ecl, mask) = read_format(grid)?;
    if ver.value() >= 7 {
        let expected = QrCode::version_bits(ver.value());
        for i in 0..18usize {
            let bit = (expected >> i) & 1 != 0;
            let (a, b) = (size - 11 + i % 3, i / 3);
            if module(a, b) != bit || module(b, a) != bit {
                return Err("version information mismatch".to_string());
            }
        }
    }

    // Zigzag read of every non-function module, unmasking as we go
    let function = QrCode::function_modules_marked(ver);
    let rawcodewords = QrCode::get_num_raw_data_modules(ver) / 8;
    let mut codewords = vec![0u8; rawcodewords];
    let mut i = 0usize;
    let mut right = size as i32 - 1;
    while right >= 1 {
        if right == 6 {
            right = 5;
        }
        let upward = ((right + 1) & 2) == 0;
        for vert in 0..size as i32 {
            for j in 0..2 {
                let x = right - j;
                let y = if upward { size as i32 - 1 - vert } else { vert };
                if function.get_module(x, y) || i >= rawcodewords * 8 {
                    continue;
                }
                let bit = module(x as usize, y as usize) ^ mask.inverts(x, y);
                if bit {
                    codewords[i >> 3] |= 0x80 >> (i & 7);
                }
                i += 1;
            }
        }
        right -= 2;
    }

    let data = deinterleave(&codewords, ver, ecl)?;
    parse_segments(&data, ver)
}

fn read_format(grid: &[Vec<bool>]) -> Result<(QrCodeEcc, Mask), String> {
    let module = |x: usize, y: usize| u32::from(grid[y][x]);
    let mut bits: u32 = 0;
    for i in 0..6 {
        bits |= module(8, i) << i;
    }
    bits |= module(8, 7) << 6;
    bits |= module(8, 8) << 7;
    bits |= module(7, 8) << 8;
    for i in 9..15 {
        bits |= module(14 - i, 8) << i;
    }
    for ecl in [QrCodeEcc::Low, QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
        for m in 0..8 {
            let mask = Mask::new(m);
            if QrCode::format_bits(ecl, mask) == bits {
                return Ok((ecl, mask));
            }
        }
    }
    Err(format!("invalid format information {bits:#06x}"))
}

fn deinterleave(codewords: &[u8], ver: Version, ecl: QrCodeEcc) -> Result<Vec<u8>, String> {
    let numblocks = QrCode::table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
    let blockecclen = QrCode::table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
    let numdata = QrCode::get_num_data_codewords(ver, ecl);
    let numshortblocks = numblocks - codewords.len() % numblocks;
    let shortblockdatalen = codewords.len() / numblocks - blockecclen;

    let rs = ReedSolomonGenerator::new(blockecclen);
    let mut remainder = vec![0u8; blockecclen];
    let mut data = Vec::with_capacity(numdata);
    for block in 0..numblocks {
        let datlen = shortblockdatalen + usize::from(block >= numshortblocks);
        let blockdata: Vec<u8> = (0..datlen)
            .map(|j| {
                if j < shortblockdatalen {
                    codewords[j * numblocks + block]
                } else {
                    codewords[shortblockdatalen * numblocks + block - numshortblocks]
                }
            })
            .collect();
        let ecc: Vec<u8> = (0..blockecclen)
            .map(|j| codewords[numdata + j * numblocks + block])
            .collect();
        rs.compute_remainder(&blockdata, &mut remainder);
        if remainder != ecc {
            return Err(format!("error correction mismatch in block {block}"));
        }
        data.extend(blockdata);
    }
    Ok(data)
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl BitReader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    fn read(&mut self, len: usize) -> Result<u32, String> {
        if len > self.remaining() {
            return Err("unexpected end of data".to_string());
        }
        let mut val = 0u32;
        for _ in 0..len {
            let bit = (self.data[self.pos >> 3] >> (7 - (self.pos & 7))) & 1;
            val = (val << 1) | u32::from(bit);
            self.pos += 1;
        }
        Ok(val)
    }
}

fn parse_segments(data: &[u8], ver: Version) -> Result<Vec<u8>, String> {
    let mut reader = BitReader { data, pos: 0 };
    let mut out = Vec::new();
    while reader.remaining() >= 4 {
        let bits = reader.read(4)?;
        if bits == 0 {
            break;
        }
        let mode = QrSegmentMode::from_mode_bits(bits).ok_or(format!("unknown mode {bits:#x}"))?;
        let count = reader.read(usize::from(mode.num_char_count_bits(ver)))? as usize;
        match mode {
            QrSegmentMode::Numeric => {
                let mut left = count;
                while left > 0 {
                    let (digits, width) = match left {
                        1 => (1, 4),
                        2 => (2, 7),
                        _ => (3, 10),
                    };
                    let val = reader.read(width)?;
                    out.extend(format!("{val:0digits$}").bytes());
                    left -= digits;
                }
            }
            QrSegmentMode::Alphanumeric => {
                let mut left = count;
                while left >= 2 {
                    let val = reader.read(11)? as usize;
                    out.push(ALPHANUMERIC_CHARSET[val / 45]);
                    out.push(ALPHANUMERIC_CHARSET[val % 45]);
                    left -= 2;
                }
                if left == 1 {
                    out.push(ALPHANUMERIC_CHARSET[reader.read(6)? as usize]);
                }
            }
            QrSegmentMode::Byte => {
                for _ in 0..count {
                    out.push(reader.read(8)? as u8);
                }
            }
            QrSegmentMode::Kanji => {
                for _ in 0..count {
                    let val = reader.read(13)?;
                    let packed = ((val / 0xC0) << 8) | (val % 0xC0);
                    let sjis = if packed < 0x1F00 { packed + 0x8140 } else { packed + 0xC140 };
                    out.extend([(sjis >> 8) as u8, sjis as u8]);
                }
            }
            QrSegmentMode::Eci => {
                let first = reader.read(8)?;
                if first & 0x80 != 0 {
                    let extra = if first & 0x40 == 0 { 8 } else { 16 };
                    reader.read(extra)?;
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::QrSegment;

    #[test]
    fn test_decodes_every_mode() {
        let cases: [&[u8]; 4] = [b"", b"31415926535", b"HELLO WORLD $%*+-./:", "héllo wörld".as_bytes()];
        for payload in cases {
            let qr = QrCode::encode_payload(payload, QrCodeEcc::Medium, true).unwrap();
            assert_eq!(decode_grid(&grid_from_symbol(&qr)).unwrap(), payload);
        }
    }

    #[test]
    fn test_decodes_mixed_segments() {
        let segs = vec![
            QrSegment::make_eci(26).unwrap(),
            QrSegment::make_kanji(&[0x93, 0x5F, 0xE4, 0xAA]).unwrap(),
            QrSegment::make_bytes(b"ab"),
            QrSegment::make_numeric(b"07").unwrap(),
        ];
        let qr =
            QrCode::encode_segments_advanced(&segs, QrCodeEcc::Low, Version::MIN, Version::MAX, None, false)
                .unwrap();
        assert_eq!(
            decode_grid(&grid_from_symbol(&qr)).unwrap(),
            [0x93, 0x5F, 0xE4, 0xAA, b'a', b'b', b'0', b'7']
        );
    }

    #[test]
    fn test_decodes_large_versions() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1500).collect();
        let qr = QrCode::encode_binary(&payload, QrCodeEcc::Low).unwrap();
        assert!(qr.version().value() >= 7);
        assert_eq!(decode_grid(&grid_from_symbol(&qr)).unwrap(), payload);
    }

    #[test]
    fn test_rejects_damaged_grid() {
        let qr = QrCode::encode_text("hello world", QrCodeEcc::Medium).unwrap();
        let mut grid = grid_from_symbol(&qr);
        // A data module far from every function pattern
        grid[20][20] = !grid[20][20];
        assert!(decode_grid(&grid).is_err());
    }
}
