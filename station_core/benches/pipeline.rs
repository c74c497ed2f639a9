use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use station_core::{Cleaner, NullSink};
use station_traits::{RawBatch, RawRow};

// Synthetic station day: slow sine with noise, rare spikes and a few outages.
fn synth_rows(n: usize, base: f64, amp: f64, seed: u32) -> Vec<RawRow> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut t = t0;
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        let outage = next_f64() < 0.002;
        t += TimeDelta::minutes(if outage { 120 } else { 5 });
        let s = (i as f64 / 144.0).sin() * amp;
        let noise = (next_f64() * 2.0 - 1.0) * amp * 0.05;
        let spike = if next_f64() < 0.01 { amp * 3.0 } else { 0.0 };
        v.push(RawRow::new(
            t.format("%Y-%m-%dT%H:%M:%S").to_string(),
            base + s + noise + spike,
        ));
    }
    v
}

fn synth_batch(n: usize) -> RawBatch {
    let mut b = RawBatch::new();
    let temp = b.entry("temperature_celsius".into()).or_default();
    temp.insert("dht22 indoor".into(), synth_rows(n, 21.0, 2.0, 0xC0FFEE));
    temp.insert("dht22 outdoor".into(), synth_rows(n, 8.0, 6.0, 0xBEEF));
    temp.insert("bmp280 outdoor".into(), synth_rows(n, 8.5, 6.0, 0xFACE));
    b.entry("relative_humidity_percent".into())
        .or_default()
        .insert("dht22 outdoor".into(), synth_rows(n, 60.0, 15.0, 0xD00D));
    b.entry("air_pressure_pa".into())
        .or_default()
        .insert("bmp280 outdoor".into(), synth_rows(n, 101_000.0, 800.0, 0xF00D));
    b
}

pub fn bench_clean(c: &mut Criterion) {
    let mut g = c.benchmark_group("clean_batch");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p station_core --bench pipeline
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(30);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let cleaner = Cleaner::default();
    for &n in &[2_000usize, 20_000] {
        let batch = synth_batch(n);
        g.bench_function(format!("sequential_{n}"), |b| {
            b.iter_batched(
                || batch.clone(),
                |raw| black_box(cleaner.clean_batch(black_box(&raw), &NullSink)),
                BatchSize::LargeInput,
            )
        });
        g.bench_function(format!("parallel_{n}"), |b| {
            b.iter_batched(
                || batch.clone(),
                |raw| black_box(cleaner.clean_batch_parallel(black_box(&raw), &NullSink)),
                BatchSize::LargeInput,
            )
        });
    }
    g.finish();
}

criterion_group!(pipeline, bench_clean);
criterion_main!(pipeline);
