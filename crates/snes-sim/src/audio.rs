//! Sample clock and sound buffer.
//!
//! Nothing is ever played. The core still accounts for every sample a
//! frame would produce, as a real core's timing model does, which is why
//! both stages refuse to initialise from a zeroed settings record.

/// Samples produced per frame, derived from the playback rate and frame
/// time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AudioClock {
    rate: u32,
    frame_time_us: u32,
}

impl AudioClock {
    pub fn new(rate: u32, frame_time_us: u32) -> Option<Self> {
        (rate != 0 && frame_time_us != 0).then_some(Self {
            rate,
            frame_time_us,
        })
    }

    /// Whole samples for one frame. `remainder` carries the fractional part
    /// (in sample-microseconds) between frames.
    pub fn samples_this_frame(self, remainder: &mut u32) -> usize {
        let total = u64::from(self.rate) * u64::from(self.frame_time_us) + u64::from(*remainder);
        *remainder = (total % 1_000_000) as u32;
        (total / 1_000_000) as usize
    }
}

/// Ring of interleaved samples.
pub(crate) struct SoundBuffer {
    samples: Vec<i16>,
    write: usize,
    channels: usize,
}

impl SoundBuffer {
    /// A buffer holding 100 ms at `input_rate`.
    pub fn new(input_rate: u32, stereo: bool) -> Option<Self> {
        let channels = if stereo { 2 } else { 1 };
        let frames = (input_rate / 10) as usize;
        (frames != 0).then(|| Self {
            samples: vec![0; frames * channels],
            write: 0,
            channels,
        })
    }

    /// Account for `count` silent sample frames.
    pub fn push_silence(&mut self, count: usize) {
        let len = self.samples.len();
        let mut remaining = count * self.channels;
        while remaining > 0 {
            let run = remaining.min(len - self.write);
            self.samples[self.write..self.write + run].fill(0);
            self.write = (self.write + run) % len;
            remaining -= run;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_refuses() {
        assert!(AudioClock::new(0, 16_667).is_none());
        assert!(AudioClock::new(32_000, 0).is_none());
        assert!(SoundBuffer::new(0, true).is_none());
    }

    #[test]
    fn fractional_samples_carry() {
        let clock = AudioClock::new(32_000, 16_667).expect("valid");
        let mut remainder = 0;
        // 32,000 × 16,667 µs = 533.344 samples per frame.
        let total: usize = (0..3).map(|_| clock.samples_this_frame(&mut remainder)).sum();
        assert_eq!(total, 1600);
    }

    #[test]
    fn ring_wraps() {
        let mut ring = SoundBuffer::new(100, false).expect("valid");
        ring.push_silence(25);
        assert_eq!(ring.write, 5);
    }
}
