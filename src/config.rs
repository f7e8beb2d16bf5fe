//! Daemon configuration from the command line and environment.

use clap::Parser;
use std::fmt;

/// UDP-controlled RGB LED daemon
#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "rgbled-daemon")]
#[command(about = "Drive a PWM RGB LED fixture from UDP commands")]
#[command(version)]
pub struct Config {
    /// Address to listen on
    #[arg(short, long, env = "LISTEN_ADDRESS", default_value = "127.0.0.1")]
    pub address: String,

    /// UDP port to listen on
    #[arg(short, long, env = "LISTEN_PORT", default_value_t = 5807)]
    pub port: u16,

    /// BCM GPIO pin driving the red channel
    #[arg(long, env = "GPIO_RED")]
    pub red_pin: u8,

    /// BCM GPIO pin driving the green channel
    #[arg(long, env = "GPIO_GREEN")]
    pub green_pin: u8,

    /// BCM GPIO pin driving the blue channel
    #[arg(long, env = "GPIO_BLUE")]
    pub blue_pin: u8,

    /// Software PWM frequency in Hz
    #[arg(long, env = "PWM_FREQUENCY", default_value_t = 100.0, value_parser = parse_frequency)]
    pub pwm_frequency: f64,
}

impl Config {
    /// Bind target, in the form tokio's `ToSocketAddrs` accepts.
    pub fn listen_addr(&self) -> (&str, u16) {
        (self.address.as_str(), self.port)
    }

    /// The three output pins; each must be distinct.
    pub fn pins(&self) -> Result<PinConfig, PinConflict> {
        PinConfig::new(self.red_pin, self.green_pin, self.blue_pin)
    }
}

fn parse_frequency(s: &str) -> Result<f64, String> {
    let hz: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    if hz.is_finite() && hz > 0.0 {
        Ok(hz)
    } else {
        Err(format!("frequency must be a positive number of Hz, got {hz}"))
    }
}

// ── Pins ─────────────────────────────────────────────────────────────

/// BCM pin numbers of the three channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinConfig {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl PinConfig {
    pub fn new(red: u8, green: u8, blue: u8) -> Result<Self, PinConflict> {
        if red == green || red == blue {
            return Err(PinConflict(red));
        }
        if green == blue {
            return Err(PinConflict(green));
        }
        Ok(Self { red, green, blue })
    }
}

impl fmt::Display for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "red={} green={} blue={}", self.red, self.green, self.blue)
    }
}

/// The same GPIO pin was assigned to more than one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinConflict(pub u8);

impl fmt::Display for PinConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO pin {} is assigned to more than one channel", self.0)
    }
}

impl std::error::Error for PinConflict {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(extra: &[&str]) -> Result<Config, clap::Error> {
        let args = ["rgbled-daemon", "--red-pin", "17", "--green-pin", "27", "--blue-pin", "22"];
        Config::try_parse_from(args.iter().chain(extra))
    }

    #[test]
    fn defaults_match_controller() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.listen_addr(), ("127.0.0.1", 5807));
        assert_eq!(config.pwm_frequency, 100.0);
        assert_eq!(config.pins(), Ok(PinConfig { red: 17, green: 27, blue: 22 }));
    }

    #[test]
    fn address_and_port_flags() {
        let config = parse(&["-a", "0.0.0.0", "--port", "6000"]).unwrap();
        assert_eq!(config.listen_addr(), ("0.0.0.0", 6000));
    }

    #[test]
    fn pins_are_required() {
        assert!(Config::try_parse_from(["rgbled-daemon", "--red-pin", "17"]).is_err());
    }

    #[rstest]
    #[case("0")]
    #[case("-50")]
    #[case("fast")]
    #[case("inf")]
    fn rejects_bad_frequency(#[case] hz: &str) {
        assert!(parse(&["--pwm-frequency", hz]).is_err());
    }

    #[rstest]
    #[case(17, 17, 22, 17)]
    #[case(17, 27, 17, 17)]
    #[case(17, 22, 22, 22)]
    fn rejects_shared_pins(#[case] red: u8, #[case] green: u8, #[case] blue: u8, #[case] pin: u8) {
        assert_eq!(PinConfig::new(red, green, blue), Err(PinConflict(pin)));
    }

    #[test]
    fn pin_config_display() {
        let pins = PinConfig::new(17, 27, 22).unwrap();
        assert_eq!(pins.to_string(), "red=17 green=27 blue=22");
    }
}
