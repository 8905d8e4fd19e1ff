//! A hand-written PNG decoder: chunk framing, zlib/DEFLATE inflation, and
//! scanline defiltering, with no dependency on an external image or
//! compression crate.
//!
//! Only the subset of the format this engine's texture pipeline needs is
//! supported: 8-bit-per-channel, non-interlaced grayscale/RGB/RGBA (with or
//! without an alpha channel). Palette images, 16-bit channels, and Adam7
//! interlacing are rejected with `Unsupported` rather than silently
//! mis-decoded.

use crate::engine::Engine;
use crate::error::{set_err, EngineError, EngineResult};
use crate::texture::{Dim2, PixelFormat};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn crc32(data: &[u8]) -> u32 {
    let table = Engine::png_crc_table();
    let mut crc = 0xffff_ffffu32;
    for &b in data {
        crc = table[((crc ^ b as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    crc ^ 0xffff_ffff
}

fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65521;
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in data {
        a = (a + byte as u32) % MOD;
        b = (b + a) % MOD;
    }
    (b << 16) | a
}

struct Chunk<'a> {
    kind: [u8; 4],
    data: &'a [u8],
}

/// Walks the chunk stream, verifying each chunk's CRC-32 trailer against
/// [`Engine::png_crc_table`].
fn read_chunks(bytes: &[u8]) -> EngineResult<Vec<Chunk<'_>>> {
    if bytes.len() < 8 || bytes[..8] != SIGNATURE {
        return Err(set_err(EngineError::InvalidFile));
    }

    let mut chunks = Vec::new();
    let mut pos = 8usize;

    loop {
        if pos + 8 > bytes.len() {
            return Err(set_err(EngineError::InvalidFile));
        }
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = bytes[pos + 4..pos + 8].try_into().unwrap();
        let data_start = pos + 8;
        let data_end = data_start
            .checked_add(len)
            .ok_or_else(|| set_err(EngineError::InvalidFile))?;
        if data_end + 4 > bytes.len() {
            return Err(set_err(EngineError::InvalidFile));
        }
        let data = &bytes[data_start..data_end];
        let crc_stored = u32::from_be_bytes(bytes[data_end..data_end + 4].try_into().unwrap());

        let mut crc_input = Vec::with_capacity(4 + len);
        crc_input.extend_from_slice(&kind);
        crc_input.extend_from_slice(data);
        if crc32(&crc_input) != crc_stored {
            return Err(set_err(EngineError::InvalidFile));
        }

        chunks.push(Chunk { kind, data });
        pos = data_end + 4;

        if &kind == b"IEND" {
            break;
        }
        if pos >= bytes.len() {
            return Err(set_err(EngineError::InvalidFile));
        }
    }

    Ok(chunks)
}

#[derive(Debug, Clone, Copy)]
struct Header {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
}

fn parse_ihdr(data: &[u8]) -> EngineResult<Header> {
    if data.len() != 13 {
        return Err(set_err(EngineError::InvalidFile));
    }
    let width = u32::from_be_bytes(data[0..4].try_into().unwrap());
    let height = u32::from_be_bytes(data[4..8].try_into().unwrap());
    let bit_depth = data[8];
    let color_type = data[9];
    let compression = data[10];
    let filter = data[11];
    let interlace = data[12];

    if width == 0 || height == 0 || compression != 0 || filter != 0 {
        return Err(set_err(EngineError::InvalidFile));
    }
    if interlace != 0 {
        return Err(set_err(EngineError::Unsupported));
    }
    if bit_depth != 8 {
        return Err(set_err(EngineError::Unsupported));
    }
    if !matches!(color_type, 0 | 2 | 4 | 6) {
        return Err(set_err(EngineError::Unsupported));
    }

    Ok(Header { width, height, bit_depth, color_type })
}

fn channels_for(color_type: u8) -> usize {
    match color_type {
        0 => 1,
        2 => 3,
        4 => 2,
        6 => 4,
        _ => unreachable!("validated in parse_ihdr"),
    }
}

fn paeth(a: i32, b: i32, c: i32) -> u8 {
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

/// Reverses the per-scanline filter, returning tightly-packed pixel rows.
fn defilter(raw: &[u8], width: u32, height: u32, channels: usize) -> EngineResult<Vec<u8>> {
    let stride = width as usize * channels;
    let row_bytes = stride + 1;
    if raw.len() != row_bytes * height as usize {
        return Err(set_err(EngineError::InvalidFile));
    }

    let mut out = vec![0u8; stride * height as usize];
    let mut prev_row = vec![0u8; stride];

    for y in 0..height as usize {
        let row_start = y * row_bytes;
        let filter = raw[row_start];
        let src = &raw[row_start + 1..row_start + 1 + stride];
        let dst_start = y * stride;

        for x in 0..stride {
            let a = if x >= channels { out[dst_start + x - channels] as i32 } else { 0 };
            let b = prev_row[x] as i32;
            let c = if x >= channels { prev_row[x - channels] as i32 } else { 0 };

            let recon = match filter {
                0 => src[x],
                1 => src[x].wrapping_add(a as u8),
                2 => src[x].wrapping_add(b as u8),
                3 => src[x].wrapping_add(((a + b) / 2) as u8),
                4 => src[x].wrapping_add(paeth(a, b, c)),
                _ => return Err(set_err(EngineError::InvalidFile)),
            };
            out[dst_start + x] = recon;
        }

        prev_row.copy_from_slice(&out[dst_start..dst_start + stride]);
    }

    Ok(out)
}

/// Decodes a complete PNG file and returns a pixel format the atlas accepts
/// plus its dimensions and tightly-packed texel data.
pub fn decode(bytes: &[u8]) -> EngineResult<(PixelFormat, Dim2, Vec<u8>)> {
    let chunks = read_chunks(bytes)?;

    let mut header = None;
    let mut idat = Vec::new();
    let mut srgb = false;

    for chunk in &chunks {
        match &chunk.kind {
            b"IHDR" => header = Some(parse_ihdr(chunk.data)?),
            b"IDAT" => idat.extend_from_slice(chunk.data),
            b"sRGB" => srgb = true,
            _ => {}
        }
    }

    let header = header.ok_or_else(|| set_err(EngineError::InvalidFile))?;

    if idat.len() < 6 {
        return Err(set_err(EngineError::InvalidFile));
    }
    // zlib wrapper: 2-byte header, DEFLATE stream, 4-byte Adler-32 trailer.
    let cmf = idat[0];
    if cmf & 0x0f != 8 {
        return Err(set_err(EngineError::Unsupported));
    }
    let deflate_stream = &idat[2..idat.len() - 4];
    let adler_stored = u32::from_be_bytes(idat[idat.len() - 4..].try_into().unwrap());

    let inflated = inflate(deflate_stream)?;
    if adler32(&inflated) != adler_stored {
        return Err(set_err(EngineError::InvalidFile));
    }

    let channels = channels_for(header.color_type);
    let pixels = defilter(&inflated, header.width, header.height, channels)?;

    let dim = Dim2 { width: header.width, height: header.height };
    let (pixfmt, pixels) = match header.color_type {
        0 => (PixelFormat::R8Unorm, pixels),
        4 => (PixelFormat::Rg8Unorm, pixels),
        2 => {
            // Expand RGB to RGBA: the atlas has no 3-channel format.
            let mut rgba = Vec::with_capacity(pixels.len() / 3 * 4);
            for rgb in pixels.chunks_exact(3) {
                rgba.extend_from_slice(rgb);
                rgba.push(255);
            }
            let fmt = if srgb { PixelFormat::Rgba8Srgb } else { PixelFormat::Rgba8Unorm };
            (fmt, rgba)
        }
        6 => {
            let fmt = if srgb { PixelFormat::Rgba8Srgb } else { PixelFormat::Rgba8Unorm };
            (fmt, pixels)
        }
        _ => unreachable!("validated in parse_ihdr"),
    };

    Ok((pixfmt, dim, pixels))
}

struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, byte_pos: 0, bit_pos: 0 }
    }

    fn bit(&mut self) -> EngineResult<u32> {
        let byte = *self.data.get(self.byte_pos).ok_or_else(|| set_err(EngineError::InvalidFile))?;
        let bit = (byte >> self.bit_pos) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit as u32)
    }

    fn bits(&mut self, n: u32) -> EngineResult<u32> {
        let mut value = 0u32;
        for i in 0..n {
            value |= self.bit()? << i;
        }
        Ok(value)
    }

    fn align_to_byte(&mut self) {
        if self.bit_pos != 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }
}

/// A canonical Huffman decoding table: counts of codes per bit length plus
/// symbols sorted into (length, original-order) so that decoding can walk
/// bit-by-bit comparing against the running first-code-of-this-length value.
struct Huffman {
    counts: [u16; 16],
    symbols: Vec<u16>,
}

fn build_huffman(lengths: &[u8]) -> Huffman {
    let mut counts = [0u16; 16];
    for &len in lengths {
        counts[len as usize] += 1;
    }
    counts[0] = 0;

    let mut offsets = [0u16; 16];
    for len in 1..16 {
        offsets[len] = offsets[len - 1] + counts[len - 1];
    }

    let mut symbols = vec![0u16; lengths.len()];
    for (sym, &len) in lengths.iter().enumerate() {
        if len != 0 {
            symbols[offsets[len as usize] as usize] = sym as u16;
            offsets[len as usize] += 1;
        }
    }

    Huffman { counts, symbols }
}

fn decode_symbol(h: &Huffman, br: &mut BitReader) -> EngineResult<u16> {
    let mut code = 0i32;
    let mut first = 0i32;
    let mut index = 0i32;

    for len in 1..16usize {
        code |= br.bit()? as i32;
        let count = h.counts[len] as i32;
        if code - first < count {
            return Ok(h.symbols[(index + (code - first)) as usize]);
        }
        index += count;
        first += count;
        first <<= 1;
        code <<= 1;
    }

    Err(set_err(EngineError::InvalidFile))
}

const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13,
];
const CODE_LENGTH_ORDER: [usize; 19] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

fn fixed_huffman_tables() -> (Huffman, Huffman) {
    let mut lit_lengths = [0u8; 288];
    for (i, l) in lit_lengths.iter_mut().enumerate() {
        *l = match i {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
    }
    let dist_lengths = [5u8; 30];
    (build_huffman(&lit_lengths), build_huffman(&dist_lengths))
}

fn read_dynamic_tables(br: &mut BitReader) -> EngineResult<(Huffman, Huffman)> {
    let hlit = br.bits(5)? as usize + 257;
    let hdist = br.bits(5)? as usize + 1;
    let hclen = br.bits(4)? as usize + 4;

    let mut cl_lengths = [0u8; 19];
    for &order in CODE_LENGTH_ORDER.iter().take(hclen) {
        cl_lengths[order] = br.bits(3)? as u8;
    }
    let cl_huffman = build_huffman(&cl_lengths);

    let mut lengths = Vec::with_capacity(hlit + hdist);
    while lengths.len() < hlit + hdist {
        let sym = decode_symbol(&cl_huffman, br)?;
        match sym {
            0..=15 => lengths.push(sym as u8),
            16 => {
                let prev = *lengths.last().ok_or_else(|| set_err(EngineError::InvalidFile))?;
                let repeat = br.bits(2)? + 3;
                for _ in 0..repeat {
                    lengths.push(prev);
                }
            }
            17 => {
                let repeat = br.bits(3)? + 3;
                for _ in 0..repeat {
                    lengths.push(0);
                }
            }
            18 => {
                let repeat = br.bits(7)? + 11;
                for _ in 0..repeat {
                    lengths.push(0);
                }
            }
            _ => return Err(set_err(EngineError::InvalidFile)),
        }
    }
    if lengths.len() != hlit + hdist {
        return Err(set_err(EngineError::InvalidFile));
    }

    let lit_huffman = build_huffman(&lengths[..hlit]);
    let dist_huffman = build_huffman(&lengths[hlit..]);
    Ok((lit_huffman, dist_huffman))
}

/// A minimal RFC 1951 DEFLATE decoder: stored, fixed-Huffman, and
/// dynamic-Huffman blocks, with LZ77 back-reference copies against the
/// already-produced output.
fn inflate(data: &[u8]) -> EngineResult<Vec<u8>> {
    let mut br = BitReader::new(data);
    let mut out = Vec::new();

    loop {
        let bfinal = br.bits(1)?;
        let btype = br.bits(2)?;

        match btype {
            0 => {
                br.align_to_byte();
                if br.byte_pos + 4 > br.data.len() {
                    return Err(set_err(EngineError::InvalidFile));
                }
                let len = u16::from_le_bytes([br.data[br.byte_pos], br.data[br.byte_pos + 1]]) as usize;
                let nlen = u16::from_le_bytes([br.data[br.byte_pos + 2], br.data[br.byte_pos + 3]]);
                if len as u16 != !nlen {
                    return Err(set_err(EngineError::InvalidFile));
                }
                br.byte_pos += 4;
                if br.byte_pos + len > br.data.len() {
                    return Err(set_err(EngineError::InvalidFile));
                }
                out.extend_from_slice(&br.data[br.byte_pos..br.byte_pos + len]);
                br.byte_pos += len;
            }
            1 | 2 => {
                let (lit_huffman, dist_huffman) = if btype == 1 {
                    fixed_huffman_tables()
                } else {
                    read_dynamic_tables(&mut br)?
                };

                loop {
                    let sym = decode_symbol(&lit_huffman, &mut br)?;
                    if sym < 256 {
                        out.push(sym as u8);
                    } else if sym == 256 {
                        break;
                    } else {
                        let idx = sym as usize - 257;
                        if idx >= LENGTH_BASE.len() {
                            return Err(set_err(EngineError::InvalidFile));
                        }
                        let length = LENGTH_BASE[idx] as usize + br.bits(LENGTH_EXTRA[idx] as u32)? as usize;

                        let dist_sym = decode_symbol(&dist_huffman, &mut br)? as usize;
                        if dist_sym >= DIST_BASE.len() {
                            return Err(set_err(EngineError::InvalidFile));
                        }
                        let dist = DIST_BASE[dist_sym] as usize + br.bits(DIST_EXTRA[dist_sym] as u32)? as usize;

                        if dist > out.len() {
                            return Err(set_err(EngineError::InvalidFile));
                        }
                        let start = out.len() - dist;
                        for i in 0..length {
                            let byte = out[start + i];
                            out.push(byte);
                        }
                    }
                }
            }
            _ => return Err(set_err(EngineError::InvalidFile)),
        }

        if bfinal == 1 {
            break;
        }
    }

    Ok(out)
}

#[cfg(test)]
#[path = "png_tests.rs"]
mod tests;
