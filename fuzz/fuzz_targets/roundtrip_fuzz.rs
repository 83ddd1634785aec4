#![no_main]
use libfuzzer_sys::fuzz_target;
use zdelta::codec::{CodecOptions, Compressor, Decompressor};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte: bit 0 selects a source, bits 4..8 pick the level,
    // bits 1..4 pick a (tiny to default) buffer size.
    let flags = data[0];
    let payload = &data[1..];
    let use_source = flags & 1 != 0;
    let level = u32::from(flags >> 4) % 10;
    let buffer_size = match (flags >> 1) & 0b111 {
        0 => 0,
        n => 64usize << n,
    };

    let split = payload.len() / 2;
    let (source, target) = if use_source {
        payload.split_at(split)
    } else {
        (&[] as &[u8], payload)
    };

    let opts = CodecOptions {
        level,
        buffer_size,
        ..CodecOptions::default()
    };
    let delta = Compressor::with_options(opts.clone())
        .create_delta(source, target)
        .unwrap();
    let decoded = Decompressor::with_options(opts)
        .apply_delta(source, &delta)
        .unwrap();
    assert_eq!(decoded, target);
});
