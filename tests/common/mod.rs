//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use zenpngwrite::PixelFormat;

/// Rows of a two-tone checkerboard in the packed layout of `format`.
pub fn checkerboard(format: PixelFormat, w: usize, h: usize) -> Vec<Vec<u8>> {
    (0..h)
        .map(|y| {
            let mut row = vec![0u8; format.row_bytes(w as u32).unwrap()];
            for x in 0..w {
                let on = (x + y) % 2 == 0;
                set_pixel(format, &mut row, x, on, (x * 31 + y * 17) as u16);
            }
            row
        })
        .collect()
}

/// Rows that all differ while `h <= w`, so a vertical flip is detectable.
pub fn staircase(format: PixelFormat, w: usize, h: usize) -> Vec<Vec<u8>> {
    (0..h)
        .map(|y| {
            let mut row = vec![0u8; format.row_bytes(w as u32).unwrap()];
            for x in 0..w {
                let on = x <= y;
                set_pixel(format, &mut row, x, on, (y * 997 + x) as u16);
            }
            row
        })
        .collect()
}

fn set_pixel(format: PixelFormat, row: &mut [u8], x: usize, on: bool, seed: u16) {
    let hi = if on { 220u8 } else { 15u8 };
    match format {
        PixelFormat::Rgb8 => {
            row[x * 3..x * 3 + 3].copy_from_slice(&[hi, seed as u8, hi ^ 0x5a]);
        }
        PixelFormat::Rgb16 => {
            let base = if on { 0xf00du16 } else { 0x0123 };
            for c in 0..3 {
                let v = base.wrapping_add(seed).wrapping_add(c as u16 * 0x1111);
                row[x * 6 + c * 2..x * 6 + c * 2 + 2].copy_from_slice(&v.to_be_bytes());
            }
        }
        PixelFormat::Rgba8 => {
            row[x * 4..x * 4 + 4].copy_from_slice(&[hi, seed as u8, 255 - hi, (seed >> 3) as u8]);
        }
        PixelFormat::Gray8 => row[x] = hi.wrapping_add(seed as u8),
        PixelFormat::Monochrome1 => {
            if on {
                row[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
}

pub struct Decoded {
    pub width: u32,
    pub height: u32,
    pub color_type: png::ColorType,
    pub bit_depth: png::BitDepth,
    pub line_size: usize,
    pub pixels: Vec<u8>,
}

impl Decoded {
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.pixels
            .chunks_exact(self.line_size)
            .map(<[u8]>::to_vec)
            .collect()
    }
}

/// Decode without any transformation: packed bits, big-endian 16-bit.
pub fn decode(bytes: &[u8]) -> Decoded {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("png header");
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).expect("png frame");
    buf.truncate(info.buffer_size());
    Decoded {
        width: info.width,
        height: info.height,
        color_type: info.color_type,
        bit_depth: info.bit_depth,
        line_size: info.line_size,
        pixels: buf,
    }
}

/// Walk the chunk list: (type, payload) pairs after the signature.
pub fn chunks(bytes: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n", "missing PNG signature");
    let mut out = Vec::new();
    let mut pos = 8;
    while pos + 12 <= bytes.len() {
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = bytes[pos + 4..pos + 8].try_into().unwrap();
        out.push((kind, bytes[pos + 8..pos + 8 + len].to_vec()));
        pos += 12 + len;
    }
    out
}

pub fn chunk<'a>(list: &'a [([u8; 4], Vec<u8>)], kind: &[u8; 4]) -> Option<&'a [u8]> {
    list.iter()
        .find(|(k, _)| k == kind)
        .map(|(_, data)| data.as_slice())
}

/// Minimal blob that passes ICC size checks.
pub fn fake_icc(len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    data[..4].copy_from_slice(&(len as u32).to_be_bytes());
    data[36..40].copy_from_slice(b"acsp");
    data
}

/// Sink that accepts `budget` bytes and then fails every write.
pub struct FailingSink {
    pub budget: usize,
}

impl Write for FailingSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::other("disk full"));
        }
        let n = data.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that accepts `budget` bytes and then panics on every write.
///
/// `panics` counts how often it was called after the budget ran out.
pub struct PanickingSink {
    pub budget: usize,
    pub panics: Rc<Cell<usize>>,
}

impl PanickingSink {
    pub fn new(budget: usize) -> (Self, Rc<Cell<usize>>) {
        let panics = Rc::new(Cell::new(0));
        (
            Self {
                budget,
                panics: panics.clone(),
            },
            panics,
        )
    }
}

impl Write for PanickingSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            self.panics.set(self.panics.get() + 1);
            panic!("sink exploded");
        }
        let n = data.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Deterministic incompressible bytes.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0xDEAD_BEEF;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}
