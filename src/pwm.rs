//! PWM outputs: the three channels of the fixture.
//!
//! Everything that lights the LEDs goes through [`PwmSink`]. The sink is a
//! plain owned value; whoever holds it is the only writer (see
//! [`crate::supervisor`]).

use crate::color::Rgb;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// One of the three outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        })
    }
}

/// Three independently settable duty-cycle outputs.
///
/// Intensities are fractions in `0.0..=1.0`; implementations clamp anything
/// outside that range. `Send + 'static` because a running pattern task takes
/// the sink with it.
pub trait PwmSink: Send + 'static {
    fn set_channel(&mut self, channel: Channel, intensity: f64);

    /// Write all three channels, red first.
    fn set_rgb(&mut self, rgb: Rgb) {
        self.set_channel(Channel::Red, rgb.r);
        self.set_channel(Channel::Green, rgb.g);
        self.set_channel(Channel::Blue, rgb.b);
    }

    fn off(&mut self) {
        self.set_rgb(Rgb::default());
    }
}

fn clamp_intensity(intensity: f64) -> f64 {
    intensity.clamp(0.0, 1.0)
}

// ── In-memory sink ───────────────────────────────────────────────────

/// A single recorded channel write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PwmWrite {
    pub channel: Channel,
    pub intensity: f64,
}

/// Sink that records every write instead of driving hardware.
///
/// Clones share the same log, so a test can keep one clone and hand the
/// other to the supervisor.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<PwmWrite>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every write so far, oldest first.
    pub fn writes(&self) -> Vec<PwmWrite> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Writes grouped into red/green/blue triples.
    ///
    /// Only meaningful when every write came through [`PwmSink::set_rgb`];
    /// see [`RecordingSink::is_frame_aligned`]. A trailing partial triple is
    /// dropped.
    pub fn frames(&self) -> Vec<Rgb> {
        self.writes()
            .chunks_exact(3)
            .map(|w| Rgb::new(w[0].intensity, w[1].intensity, w[2].intensity))
            .collect()
    }

    /// True when the log is a clean sequence of red, green, blue triples.
    pub fn is_frame_aligned(&self) -> bool {
        let writes = self.writes();
        writes.len() % 3 == 0
            && writes.chunks_exact(3).all(|w| {
                w[0].channel == Channel::Red
                    && w[1].channel == Channel::Green
                    && w[2].channel == Channel::Blue
            })
    }

    /// What the outputs show right now: the last value written per channel.
    pub fn current(&self) -> Rgb {
        let mut rgb = Rgb::default();
        for write in self.writes() {
            match write.channel {
                Channel::Red => rgb.r = write.intensity,
                Channel::Green => rgb.g = write.intensity,
                Channel::Blue => rgb.b = write.intensity,
            }
        }
        rgb
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PwmSink for RecordingSink {
    fn set_channel(&mut self, channel: Channel, intensity: f64) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PwmWrite {
                channel,
                intensity: clamp_intensity(intensity),
            });
    }
}

// ── GPIO sink ────────────────────────────────────────────────────────

/// Software PWM on three Raspberry Pi GPIO pins.
#[cfg(feature = "hardware")]
pub struct GpioPwm {
    red: rppal::gpio::OutputPin,
    green: rppal::gpio::OutputPin,
    blue: rppal::gpio::OutputPin,
    frequency: f64,
}

#[cfg(feature = "hardware")]
impl GpioPwm {
    /// Claim the three pins (BCM numbering) and drive them low.
    ///
    /// Fails when GPIO is unavailable (not a Pi, missing permissions) or a
    /// pin is already in use.
    pub fn new(pins: crate::config::PinConfig, frequency: f64) -> Result<Self, rppal::gpio::Error> {
        let gpio = rppal::gpio::Gpio::new()?;
        let output = |pin: u8| -> Result<rppal::gpio::OutputPin, rppal::gpio::Error> {
            Ok(gpio.get(pin)?.into_output_low())
        };

        Ok(Self {
            red: output(pins.red)?,
            green: output(pins.green)?,
            blue: output(pins.blue)?,
            frequency,
        })
    }

    fn pin_mut(&mut self, channel: Channel) -> &mut rppal::gpio::OutputPin {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        }
    }
}

#[cfg(feature = "hardware")]
impl PwmSink for GpioPwm {
    fn set_channel(&mut self, channel: Channel, intensity: f64) {
        let frequency = self.frequency;
        let duty = clamp_intensity(intensity);
        if let Err(e) = self.pin_mut(channel).set_pwm_frequency(frequency, duty) {
            tracing::warn!("Failed to set {} channel to {:.3}: {}", channel, duty, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn set_rgb_writes_red_green_blue_in_order() {
        let mut sink = RecordingSink::new();
        sink.set_rgb(Rgb::new(1.0, 0.5, 0.0));

        assert_eq!(
            sink.writes(),
            vec![
                PwmWrite { channel: Channel::Red, intensity: 1.0 },
                PwmWrite { channel: Channel::Green, intensity: 0.5 },
                PwmWrite { channel: Channel::Blue, intensity: 0.0 },
            ]
        );
        assert!(sink.is_frame_aligned());
    }

    #[rstest]
    #[case(-0.5, 0.0)]
    #[case(0.25, 0.25)]
    #[case(1.5, 1.0)]
    fn intensity_is_clamped(#[case] input: f64, #[case] expected: f64) {
        let mut sink = RecordingSink::new();
        sink.set_channel(Channel::Green, input);
        assert_eq!(sink.writes()[0].intensity, expected);
    }

    #[test]
    fn clones_share_the_log() {
        let observer = RecordingSink::new();
        let mut writer = observer.clone();
        writer.set_rgb(Rgb::new(0.0, 0.0, 1.0));

        assert_eq!(observer.len(), 3);
        assert_eq!(observer.current(), Rgb::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn current_tracks_last_write_per_channel() {
        let mut sink = RecordingSink::new();
        assert_eq!(sink.current(), Rgb::default());

        sink.set_rgb(Rgb::new(1.0, 1.0, 1.0));
        sink.set_channel(Channel::Green, 0.2);
        assert_eq!(sink.current(), Rgb::new(1.0, 0.2, 1.0));
        assert!(!sink.is_frame_aligned());
    }

    #[test]
    fn off_zeroes_every_channel() {
        let mut sink = RecordingSink::new();
        sink.set_rgb(Rgb::new(0.3, 0.6, 0.9));
        sink.off();

        assert_eq!(sink.current(), Rgb::default());
        assert_eq!(sink.frames().len(), 2);
    }
}
