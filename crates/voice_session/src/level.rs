use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::platform::LevelMeter;

const FREQUENCY_BINS: usize = 128;

/// Per-frame input level in `0.0..=1.0`.
pub(crate) enum LevelSource {
    Meter(Box<dyn LevelMeter>),
    Synthetic(StdRng),
}

impl LevelSource {
    pub(crate) fn synthetic() -> Self {
        Self::Synthetic(StdRng::from_entropy())
    }

    pub(crate) fn sample(&mut self) -> f32 {
        match self {
            Self::Meter(meter) => {
                let mut bins = [0u8; FREQUENCY_BINS];
                meter.frequency_data(&mut bins);
                average_level(&bins)
            }
            Self::Synthetic(rng) => rng.gen_range(0.2..0.7),
        }
    }

    pub(crate) fn release(self) {
        if let Self::Meter(mut meter) = self {
            meter.release();
        }
    }
}

fn average_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&bin| u32::from(bin)).sum();
    sum as f32 / bins.len() as f32 / 255.0
}
