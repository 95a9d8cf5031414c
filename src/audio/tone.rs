use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const START_GAIN: f32 = 0.3;
const END_GAIN: f32 = 0.01;

/// Mono sine beep whose gain ramps exponentially from 0.3 down to 0.01
pub struct DecayingSine {
    frequency: f32,
    total_samples: usize,
    num_sample: usize,
    decay_per_sample: f32,
}

impl DecayingSine {
    pub fn new(frequency: f32, duration: Duration) -> Self {
        let total_samples = ((duration.as_secs_f32() * SAMPLE_RATE as f32) as usize).max(1);
        // gain(n) = START * r^n, with gain(total) = END
        let decay_per_sample = (END_GAIN / START_GAIN).powf(1.0 / total_samples as f32);
        Self {
            frequency,
            total_samples,
            num_sample: 0,
            decay_per_sample,
        }
    }
}

impl Iterator for DecayingSine {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        let gain = START_GAIN * self.decay_per_sample.powi(self.num_sample as i32);
        self.num_sample += 1;
        Some((2.0 * PI * self.frequency * t).sin() * gain)
    }
}

impl Source for DecayingSine {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.total_samples as f32 / SAMPLE_RATE as f32,
        ))
    }
}
