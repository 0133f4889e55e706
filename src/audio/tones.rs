use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

use super::CueAsset;

/// Struck-bell style tone: a few harmonic partials under an exponential decay.
pub struct CueTone {
    partials: &'static [(f32, f32)],
    decay_per_sec: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

const BELL: &[(f32, f32)] = &[(880.0, 1.0), (1760.0, 0.5), (2640.0, 0.25)];
const CHIME: &[(f32, f32)] = &[(1046.5, 1.0), (1568.0, 0.6), (2093.0, 0.2)];
const SERVICE_BELL: &[(f32, f32)] = &[(2093.0, 1.0), (4186.0, 0.3)];

impl CueTone {
    pub fn new(asset: CueAsset) -> Self {
        let (partials, decay_per_sec, length) = match asset {
            CueAsset::Bell => (BELL, 3.0, Duration::from_millis(1500)),
            CueAsset::Chime => (CHIME, 2.0, Duration::from_millis(2000)),
            CueAsset::ServiceBell => (SERVICE_BELL, 6.0, Duration::from_millis(800)),
        };
        let sample_rate = 44100;
        Self {
            partials,
            decay_per_sec,
            sample_rate,
            num_sample: 0,
            total_samples: length.as_millis() as usize * sample_rate as usize / 1000,
        }
    }
}

impl Iterator for CueTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let envelope = (-self.decay_per_sec * t).exp();
        let norm: f32 = self.partials.iter().map(|(_, amp)| amp).sum();
        let sample: f32 = self
            .partials
            .iter()
            .map(|(freq, amp)| amp * (2.0 * PI * freq * t).sin())
            .sum();

        Some(sample / norm * envelope * 0.4)
    }
}

impl Source for CueTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / self.sample_rate as f32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_is_finite_and_bounded() {
        let tone = CueTone::new(CueAsset::ServiceBell);
        let samples: Vec<f32> = tone.collect();
        assert_eq!(samples.len(), 35280);
        assert!(samples.iter().all(|s| s.abs() <= 0.4 + 1e-6));
    }
}
