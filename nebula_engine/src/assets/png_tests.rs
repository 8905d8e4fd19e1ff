use super::*;

fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc_input = Vec::new();
    crc_input.extend_from_slice(kind);
    crc_input.extend_from_slice(data);
    out.extend_from_slice(&crc32(&crc_input).to_be_bytes());
    out
}

/// Wraps `raw` (filter-byte-prefixed scanlines) in a zlib stream using a
/// single uncompressed (stored) DEFLATE block — valid input, just not
/// compressed, which is all a decoder test needs.
fn zlib_stored(raw: &[u8]) -> Vec<u8> {
    let mut out = vec![0x78, 0x01]; // CMF/FLG: deflate, 32K window, no dict
    out.push(0x01); // BFINAL=1, BTYPE=00 (stored), rest of byte padding = 0
    let len = raw.len() as u16;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&(!len).to_le_bytes());
    out.extend_from_slice(raw);
    out.extend_from_slice(&adler32(raw).to_be_bytes());
    out
}

fn make_png(width: u32, height: u32, color_type: u8, channels: usize, pixels: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    let stride = width as usize * channels;
    for row in pixels.chunks_exact(stride) {
        raw.push(0); // filter type None
        raw.extend_from_slice(row);
    }

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(color_type);
    ihdr.push(0);
    ihdr.push(0);
    ihdr.push(0);

    let mut out = SIGNATURE.to_vec();
    out.extend(chunk(b"IHDR", &ihdr));
    out.extend(chunk(b"IDAT", &zlib_stored(&raw)));
    out.extend(chunk(b"IEND", &[]));
    out
}

#[test]
fn decodes_2x2_rgba() {
    let pixels: Vec<u8> = vec![
        255, 0, 0, 255, 0, 255, 0, 255, //
        0, 0, 255, 255, 255, 255, 0, 255,
    ];
    let file = make_png(2, 2, 6, 4, &pixels);

    let (fmt, dim, data) = decode(&file).unwrap();
    assert_eq!(fmt, PixelFormat::Rgba8Unorm);
    assert_eq!(dim, Dim2 { width: 2, height: 2 });
    assert_eq!(data, pixels);
}

#[test]
fn decodes_grayscale_as_r8() {
    let pixels: Vec<u8> = vec![10, 20, 30, 40];
    let file = make_png(2, 2, 0, 1, &pixels);

    let (fmt, _dim, data) = decode(&file).unwrap();
    assert_eq!(fmt, PixelFormat::R8Unorm);
    assert_eq!(data, pixels);
}

#[test]
fn expands_rgb_to_rgba_with_opaque_alpha() {
    let pixels: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
    let file = make_png(2, 2, 2, 3, &pixels);

    let (fmt, _dim, data) = decode(&file).unwrap();
    assert_eq!(fmt, PixelFormat::Rgba8Unorm);
    assert_eq!(data, vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255, 10, 11, 12, 255]);
}

#[test]
fn rejects_bad_signature() {
    let err = decode(&[0u8; 16]).unwrap_err();
    assert_eq!(err, EngineError::InvalidFile);
}

#[test]
fn rejects_interlaced_images() {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&2u32.to_be_bytes());
    ihdr.extend_from_slice(&2u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 1]);

    let mut file = SIGNATURE.to_vec();
    file.extend(chunk(b"IHDR", &ihdr));
    file.extend(chunk(b"IEND", &[]));

    let err = decode(&file).unwrap_err();
    assert_eq!(err, EngineError::Unsupported);
}

#[test]
fn defilters_each_filter_type_row_by_row() {
    // One grayscale channel, 4 pixels per row, one row per filter type 0-4,
    // hand-derived so the reconstructed pixels come out as 10,20,..,60.
    let rows: [(u8, [u8; 4]); 5] = [
        (0, [10, 20, 30, 40]),
        (1, [15, 10, 10, 10]),
        (2, [5, 5, 5, 5]),
        (3, [15, 8, 8, 8]),
        (4, [5, 5, 5, 5]),
    ];
    let mut raw = Vec::new();
    for (filter, row) in &rows {
        raw.push(*filter);
        raw.extend_from_slice(row);
    }

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&4u32.to_be_bytes());
    ihdr.extend_from_slice(&5u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 0, 0, 0, 0]); // bit depth 8, greyscale, no interlace

    let mut file = SIGNATURE.to_vec();
    file.extend(chunk(b"IHDR", &ihdr));
    file.extend(chunk(b"IDAT", &zlib_stored(&raw)));
    file.extend(chunk(b"IEND", &[]));

    let (fmt, dim, data) = decode(&file).unwrap();
    assert_eq!(fmt, PixelFormat::R8Unorm);
    assert_eq!(dim, Dim2 { width: 4, height: 5 });
    #[rustfmt::skip]
    assert_eq!(
        data,
        vec![
            10, 20, 30, 40,
            15, 25, 35, 45,
            20, 30, 40, 50,
            25, 35, 45, 55,
            30, 40, 50, 60,
        ]
    );
}

#[test]
fn corrupted_chunk_crc_is_rejected() {
    let pixels: Vec<u8> = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
    let mut file = make_png(2, 2, 6, 4, &pixels);
    let last = file.len() - 1;
    file[last] ^= 0xff;

    let err = decode(&file).unwrap_err();
    assert_eq!(err, EngineError::InvalidFile);
}
