//! A deterministic fake station.
//!
//! Produces the same sensors the real station has, with a daily cycle, sensor
//! noise and the faults the cleaner exists for: single-sample spikes,
//! out-of-range hardware glitches and multi-hour outages.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use station_traits::{BatchSource, RawBatch, RawRow, SourceError};

/// xorshift32; good enough for test data and stable across platforms.
#[derive(Debug, Clone)]
struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_f64(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    }

    /// Uniform in `[-1, 1)`.
    fn signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Profile {
    category: &'static str,
    sensor: &'static str,
    base: f64,
    daily_amplitude: f64,
    noise: f64,
    /// What the sensor reports when it glitches.
    glitch: f64,
    clamp: Option<(f64, f64)>,
}

const PROFILES: [Profile; 6] = [
    Profile {
        category: "temperature_celsius",
        sensor: "dht22 indoor",
        base: 21.0,
        daily_amplitude: 1.5,
        noise: 0.1,
        glitch: -999.0,
        clamp: None,
    },
    Profile {
        category: "temperature_celsius",
        sensor: "dht22 outdoor",
        base: 10.0,
        daily_amplitude: 6.0,
        noise: 0.2,
        glitch: -999.0,
        clamp: None,
    },
    Profile {
        category: "temperature_celsius",
        sensor: "bmp280 outdoor",
        base: 10.5,
        daily_amplitude: 6.0,
        noise: 0.05,
        glitch: 180.0,
        clamp: None,
    },
    Profile {
        category: "relative_humidity_percent",
        sensor: "dht22 indoor",
        base: 45.0,
        daily_amplitude: -5.0,
        noise: 0.5,
        glitch: 3276.7,
        clamp: Some((0.0, 100.0)),
    },
    Profile {
        category: "relative_humidity_percent",
        sensor: "dht22 outdoor",
        base: 70.0,
        daily_amplitude: -15.0,
        noise: 1.0,
        glitch: 3276.7,
        clamp: Some((0.0, 100.0)),
    },
    Profile {
        category: "air_pressure_pa",
        sensor: "bmp280 outdoor",
        base: 101_300.0,
        daily_amplitude: 150.0,
        noise: 8.0,
        glitch: 0.0,
        clamp: None,
    },
];

/// Knobs for [`SimulatedStation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Timestamp of the last reading.
    pub end: DateTime<Utc>,
    pub hours: u32,
    pub interval: TimeDelta,
    pub seed: u32,
    /// Per reading probability of an in-range spike.
    pub spike_rate: f64,
    /// Per reading probability of an out-of-range glitch value.
    pub glitch_rate: f64,
    /// Per reading probability of an outage starting.
    pub outage_rate: f64,
    pub outage: TimeDelta,
}

impl SimConfig {
    pub fn new(end: DateTime<Utc>, hours: u32, seed: u32) -> Self {
        Self {
            end,
            hours,
            interval: TimeDelta::minutes(5),
            seed,
            spike_rate: 0.01,
            glitch_rate: 0.003,
            outage_rate: 0.002,
            outage: TimeDelta::minutes(150),
        }
    }

    /// No spikes, glitches or outages: just cycle and noise.
    pub fn clean(mut self) -> Self {
        self.spike_rate = 0.0;
        self.glitch_rate = 0.0;
        self.outage_rate = 0.0;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedStation {
    cfg: SimConfig,
}

impl SimulatedStation {
    pub fn new(cfg: SimConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    fn series(&self, profile: &Profile, rng: &mut Xorshift32) -> Vec<RawRow> {
        let cfg = &self.cfg;
        let step = cfg.interval.num_seconds().max(1);
        let span = i64::from(cfg.hours) * 3600;
        let n = span / step;
        let start = cfg.end - TimeDelta::seconds(n * step);

        let mut rows = Vec::with_capacity(usize::try_from(n + 1).unwrap_or(0));
        let mut down_until: Option<DateTime<Utc>> = None;
        for i in 0..=n {
            let t = start + TimeDelta::seconds(i * step);
            if down_until.is_some_and(|u| t < u) {
                continue;
            }
            if rng.next_f64() < cfg.outage_rate {
                down_until = Some(t + cfg.outage);
                continue;
            }
            let minute_of_day = f64::from(t.num_seconds_from_midnight()) / 60.0;
            // Peak around 15:00.
            let phase = (minute_of_day / 1440.0 - 0.375) * std::f64::consts::TAU;
            let mut v = profile.base
                + profile.daily_amplitude * phase.sin()
                + profile.noise * rng.signed();
            if let Some((lo, hi)) = profile.clamp {
                v = v.clamp(lo, hi);
            }
            let roll = rng.next_f64();
            if roll < cfg.glitch_rate {
                v = profile.glitch;
            } else if roll < cfg.glitch_rate + cfg.spike_rate {
                let size = (profile.daily_amplitude.abs() + profile.noise) * 2.0;
                v += if rng.next_f64() < 0.5 { -size } else { size };
                if let Some((lo, hi)) = profile.clamp {
                    v = v.clamp(lo, hi);
                }
            }
            rows.push(RawRow::new(t.format("%Y-%m-%dT%H:%M:%S").to_string(), v));
        }
        rows
    }

    pub fn generate(&self) -> RawBatch {
        let mut batch = RawBatch::new();
        for (i, profile) in PROFILES.iter().enumerate() {
            let mut rng = Xorshift32::new(
                self.cfg
                    .seed
                    .wrapping_mul(0x9E37_79B9)
                    .wrapping_add(u32::try_from(i).unwrap_or(0) + 1),
            );
            let rows = self.series(profile, &mut rng);
            batch
                .entry(profile.category.to_string())
                .or_default()
                .insert(profile.sensor.to_string(), rows);
        }
        let rows: usize = batch.values().flat_map(|c| c.values()).map(Vec::len).sum();
        tracing::debug!(
            hours = self.cfg.hours,
            seed = self.cfg.seed,
            rows,
            "simulated batch generated"
        );
        batch
    }
}

impl BatchSource for SimulatedStation {
    fn fetch(&mut self) -> Result<RawBatch, SourceError> {
        Ok(self.generate())
    }

    fn describe(&self) -> String {
        format!("simulated:{}h seed={}", self.cfg.hours, self.cfg.seed)
    }
}
