#![no_main]
use libfuzzer_sys::fuzz_target;
use station_core::{Cleaner, NullSink};

fuzz_target!(|data: &str| {
    let Ok(batch) = station_config::parse_batch_json(data) else {
        return;
    };
    let cleaner = Cleaner::default();
    let out = cleaner.clean_batch(&batch, &NullSink);
    for sensors in out.categories.values() {
        for pair in sensors.values() {
            assert!(pair.clipped.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            assert!(pair.filtered.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }
    }
});
