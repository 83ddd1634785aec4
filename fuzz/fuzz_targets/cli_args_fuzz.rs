#![no_main]
use libfuzzer_sys::fuzz_target;

// Argument vectors are split on NUL so tokens may contain whitespace.
fuzz_target!(|data: &[u8]| {
    let args: Vec<String> = data
        .split(|&b| b == 0)
        .take(16)
        .map(|token| String::from_utf8_lossy(token).into_owned())
        .collect();
    zdelta::cli::fuzz_try_parse_args(&args);
});
