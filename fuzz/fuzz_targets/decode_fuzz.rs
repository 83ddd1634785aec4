#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary deltas must never panic or trip the session's progress
    // checks; the engine rejects them with an error.
    if let Err(e) = zdelta::apply_delta(&[], data) {
        assert!(e.is_engine_error(), "{e:?}");
    }

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (source, delta) = data.split_at(split);
        if let Err(e) = zdelta::apply_delta(source, delta) {
            assert!(e.is_engine_error(), "{e:?}");
        }
    }
});
