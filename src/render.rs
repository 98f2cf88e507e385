//! Rendering of finished symbols to PNG bytes and SVG text.

use crate::config::SvgStyle;
use crate::error::Result;
use crate::qrcode::QrCode;
use image::error::{LimitError, LimitErrorKind};
use image::{GrayImage, ImageError, ImageFormat, Luma};
use std::io::Cursor;

/// Largest raster we agree to allocate, in pixels.
const MAX_IMAGE_PIXELS: u64 = 1 << 29;

const DARK: Luma<u8> = Luma([0u8]);
const LIGHT: Luma<u8> = Luma([255u8]);

/// Side length in modules of the symbol plus its quiet zone.
fn dimension(qr: &QrCode, border: u32) -> u64 {
    qr.size() as u64 + 2 * u64::from(border)
}

/// Rasterizes the symbol to an 8-bit grayscale image.
///
/// Every module becomes a `scale`×`scale` block. Dark modules are 0, light modules and the
/// `border`-module quiet zone are 255.
///
/// # Errors
///
/// Returns [`ImageError::Limits`] when the image would not fit in memory or its side overflows `u32`.
pub fn to_image(qr: &QrCode, scale: u32, border: u32) -> Result<GrayImage> {
    let side = dimension(qr, border)
        .checked_mul(u64::from(scale))
        .ok_or_else(|| ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)))?;
    if side.saturating_mul(side) > MAX_IMAGE_PIXELS {
        return Err(ImageError::Limits(LimitError::from_kind(LimitErrorKind::InsufficientMemory)).into());
    }
    let side = u32::try_from(side)
        .map_err(|_| ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)))?;

    let border = i64::from(border);
    let scale = scale.max(1);
    let img = GrayImage::from_fn(side, side, |x, y| {
        let qr_x = i64::from(x / scale) - border;
        let qr_y = i64::from(y / scale) - border;
        // Quiet zone coordinates fall outside the symbol and read as light
        let in_symbol = |v: i64| i32::try_from(v).unwrap_or(-1);
        if qr.get_module(in_symbol(qr_x), in_symbol(qr_y)) {
            DARK
        } else {
            LIGHT
        }
    });
    Ok(img)
}

/// Rasterizes the symbol and encodes it as PNG.
pub fn to_png(qr: &QrCode, scale: u32, border: u32) -> Result<Vec<u8>> {
    let img = to_image(qr, scale, border)?;
    let mut bytes: Vec<u8> = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Returns an SVG document depicting the symbol.
///
/// The `viewBox` is measured in modules while `width` and `height` are in pixels, so one module
/// spans `scale` user units. The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(qr: &QrCode, scale: u32, border: u32, style: &SvgStyle) -> String {
    let dimension = dimension(qr, border);
    // Wide enough that any u32 scale and border multiply without overflow
    let pixels = u128::from(dimension) * u128::from(scale);
    let mut result = String::new();
    if style.xml_header {
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
    }
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {1} {1}\" stroke=\"none\">\n",
        pixels, dimension
    );
    result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", style.light);
    result += "\t<path d=\"";
    let border = i64::from(border);
    if style.optimal {
        result += &outline_path(qr, border);
    } else {
        result += &module_path(qr, border);
    }
    result += &format!("\" fill=\"{}\"/>\n", style.dark);
    result += "</svg>\n";
    result
}

/// One unit-square subpath per dark module.
fn module_path(qr: &QrCode, border: i64) -> String {
    let mut path = String::new();
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if qr.get_module(x, y) {
                if !path.is_empty() {
                    path += " ";
                }
                path += &format!("M{},{}h1v1h-1z", i64::from(x) + border, i64::from(y) + border);
            }
        }
    }
    path
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    const ALL: [Direction; 4] = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Clockwise on screen, where y grows downward.
    fn turn_right(self) -> Self {
        Self::ALL[(self as usize + 1) % 4]
    }

    fn turn_left(self) -> Self {
        Self::ALL[(self as usize + 3) % 4]
    }

    fn step(self, x: usize, y: usize) -> (usize, usize) {
        match self {
            Direction::Right => (x + 1, y),
            Direction::Down => (x, y + 1),
            Direction::Left => (x - 1, y),
            Direction::Up => (x, y - 1),
        }
    }
}

/// Directed boundary edges between dark and light modules, stored as a bitmask of outgoing
/// directions per lattice vertex. Edges keep the dark side on their right, so outer outlines
/// run clockwise and holes run counterclockwise.
struct EdgeMap {
    width: usize,
    outgoing: Vec<u8>,
}

impl EdgeMap {
    fn new(qr: &QrCode) -> Self {
        let size = qr.size();
        let width = size as usize + 1;
        let mut map = Self {
            width,
            outgoing: vec![0u8; width * width],
        };
        for y in 0..size {
            for x in 0..size {
                if !qr.get_module(x, y) {
                    continue;
                }
                let (ux, uy) = (x as usize, y as usize);
                if !qr.get_module(x, y - 1) {
                    map.add(ux, uy, Direction::Right);
                }
                if !qr.get_module(x + 1, y) {
                    map.add(ux + 1, uy, Direction::Down);
                }
                if !qr.get_module(x, y + 1) {
                    map.add(ux + 1, uy + 1, Direction::Left);
                }
                if !qr.get_module(x - 1, y) {
                    map.add(ux, uy + 1, Direction::Up);
                }
            }
        }
        map
    }

    fn add(&mut self, x: usize, y: usize, dir: Direction) {
        self.outgoing[y * self.width + x] |= dir.bit();
    }

    /// Removes and returns an outgoing edge, preferring a right turn, then straight, then left.
    fn take_next(&mut self, x: usize, y: usize, heading: Direction) -> Option<Direction> {
        let cell = &mut self.outgoing[y * self.width + x];
        let found = [heading.turn_right(), heading, heading.turn_left()]
            .into_iter()
            .find(|d| *cell & d.bit() != 0)?;
        *cell &= !found.bit();
        Some(found)
    }

    /// Removes and returns the first outgoing edge at a vertex, in direction order.
    fn take_any(&mut self, x: usize, y: usize) -> Option<Direction> {
        let cell = &mut self.outgoing[y * self.width + x];
        let found = Direction::ALL.into_iter().find(|d| *cell & d.bit() != 0)?;
        *cell &= !found.bit();
        Some(found)
    }
}

fn push_run(path: &mut String, dir: Direction, len: usize) {
    let command = match dir {
        Direction::Right => format!("h{len}"),
        Direction::Left => format!("h-{len}"),
        Direction::Down => format!("v{len}"),
        Direction::Up => format!("v-{len}"),
    };
    path.push_str(&command);
}

/// Traces the outlines of dark regions into closed rectilinear subpaths with merged runs.
fn outline_path(qr: &QrCode, border: i64) -> String {
    let mut edges = EdgeMap::new(qr);
    let width = edges.width;
    let mut path = String::new();
    for start_y in 0..width {
        for start_x in 0..width {
            // A vertex can start several subpaths where two regions touch diagonally
            while let Some(first) = edges.take_any(start_x, start_y) {
                if !path.is_empty() {
                    path += " ";
                }
                path += &format!("M{},{}", start_x as i64 + border, start_y as i64 + border);

                let (mut x, mut y) = first.step(start_x, start_y);
                let mut heading = first;
                let mut run = 1usize;
                while (x, y) != (start_x, start_y) {
                    // Boundary vertices always have as many outgoing edges as incoming ones
                    let Some(next) = edges.take_next(x, y, heading) else {
                        break;
                    };
                    if next == heading {
                        run += 1;
                    } else {
                        push_run(&mut path, heading, run);
                        heading = next;
                        run = 1;
                    }
                    (x, y) = next.step(x, y);
                }
                path += "z";
            }
        }
    }
    path
}
