#![no_main]
use libfuzzer_sys::fuzz_target;
use zenpngwrite::*;

fuzz_target!(|data: &[u8]| {
    // Layout: format, width, height, dpi selector, then pixel bytes.
    let [format, w, h, dpi, pixels @ ..] = data else {
        return;
    };
    let format = PixelFormat::ALL[*format as usize % PixelFormat::ALL.len()];
    let width = u32::from(*w % 64) + 1;
    let height = u32::from(*h % 64) + 1;
    let dpi = f64::from(*dpi as i8) * 7.5;

    let Some(row_bytes) = format.row_bytes(width) else {
        return;
    };
    let needed = row_bytes * height as usize;
    if pixels.is_empty() {
        return;
    }
    let buffer: Vec<u8> = pixels.iter().copied().cycle().take(needed).collect();

    let encoded = match EncodeRequest::new(format)
        .with_dpi(dpi, dpi)
        .encode(&buffer, width, height, enough::Unstoppable)
    {
        Ok(encoded) => encoded,
        Err(PngWriteError::InvalidResolution { .. }) => {
            assert!(dpi < 0.0);
            return;
        }
        Err(e) => panic!("encode failed: {e}"),
    };

    // Whatever was encoded must decode to the same packed rows.
    let mut decoder = png::Decoder::new(encoded.as_slice());
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("re-encoded header");
    let mut out = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut out).expect("re-encoded frame");
    assert_eq!(info.width, width);
    assert_eq!(info.height, height);
    assert_eq!(&out[..info.buffer_size()], &buffer[..], "roundtrip pixel mismatch");
});
