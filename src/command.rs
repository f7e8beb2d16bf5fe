//! Wire protocol: one datagram, one command.
//!
//! ```text
//! single,<RRGGBB>
//! strobe,<period>,<RRGGBB>[,<RRGGBB>...]
//! fade,<period>,<RRGGBB>,<RRGGBB>[,<RRGGBB>...]
//! breathe,<period>,<RRGGBB>[,<RRGGBB>...]
//! ```
//!
//! `<period>` is a decimal number of seconds. Whitespace around the payload
//! and around each field is ignored, so `echo single,FF0000 | nc -u` works.

use crate::color::{Color, ColorFormatError, GRADIENT_STEPS};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ── Commands ─────────────────────────────────────────────────────────

/// A decoded datagram.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Show one static color; no task keeps running afterwards.
    SetColor(Color),
    /// Start a looping pattern.
    Pattern(Pattern),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetColor(color) => write!(f, "single {color}"),
            Command::Pattern(pattern) => fmt::Display::fmt(pattern, f),
        }
    }
}

impl FromStr for Command {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut fields = text.split(',').map(str::trim);
        // split always yields at least one field
        let tag = fields.next().unwrap_or_default();
        let rest: Vec<&str> = fields.collect();

        if tag == "single" {
            return match rest.as_slice() {
                [hex] => Ok(Command::SetColor(parse_color(0, hex)?)),
                _ => Err(DecodeError::WrongArity {
                    tag: "single",
                    expected: "exactly 1 color",
                    got: rest.len(),
                }),
            };
        }

        let kind = PatternKind::from_tag(tag)
            .ok_or_else(|| DecodeError::UnknownTag(tag.to_string()))?;

        let Some((period, hexes)) = rest.split_first().filter(|(_, hexes)| !hexes.is_empty())
        else {
            return Err(DecodeError::WrongArity {
                tag: kind.name(),
                expected: "a period followed by colors",
                got: rest.len(),
            });
        };

        let period = parse_period(period)?;
        let colors = hexes
            .iter()
            .enumerate()
            .map(|(index, hex)| parse_color(index, hex))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Command::Pattern(Pattern::new(kind, period, colors)?))
    }
}

/// Decode a raw datagram payload.
pub fn decode(payload: &[u8]) -> Result<Command, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotText)?;
    text.parse()
}

fn parse_color(index: usize, hex: &str) -> Result<Color, DecodeError> {
    Color::from_hex(hex).map_err(|source| DecodeError::Color { index, source })
}

/// Parse a period in seconds. Must be finite and strictly positive.
pub fn parse_period(s: &str) -> Result<Duration, PeriodError> {
    let secs: f64 = s
        .parse()
        .map_err(|_| PeriodError::NotANumber(s.to_string()))?;

    // also catches NaN
    if !(secs > 0.0) {
        return Err(PeriodError::NotPositive(secs));
    }

    Duration::try_from_secs_f64(secs).map_err(|_| PeriodError::OutOfRange(secs))
}

// ── Patterns ─────────────────────────────────────────────────────────

/// The three time-varying behaviors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternKind {
    Strobe,
    Fade,
    Breathe,
}

impl PatternKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "strobe" => Some(Self::Strobe),
            "fade" => Some(Self::Fade),
            "breathe" => Some(Self::Breathe),
            _ => None,
        }
    }

    /// Wire tag, also used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Strobe => "strobe",
            Self::Fade => "fade",
            Self::Breathe => "breathe",
        }
    }

    /// Fades need a pair of stops; the others work with one color.
    pub fn min_colors(self) -> usize {
        match self {
            Self::Fade => 2,
            Self::Strobe | Self::Breathe => 1,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated pattern: non-zero period and enough colors for its kind.
///
/// Fields are private so every `Pattern` went through [`Pattern::new`];
/// the executors rely on that and never see an empty color list.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    kind: PatternKind,
    period: Duration,
    colors: Vec<Color>,
}

impl Pattern {
    pub fn new(
        kind: PatternKind,
        period: Duration,
        colors: Vec<Color>,
    ) -> Result<Self, PatternError> {
        if period.is_zero() {
            return Err(PatternError::ZeroPeriod);
        }
        if colors.len() < kind.min_colors() {
            return Err(PatternError::TooFewColors {
                kind,
                min: kind.min_colors(),
                got: colors.len(),
            });
        }
        Ok(Self {
            kind,
            period,
            colors,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Delay between two consecutive PWM writes.
    ///
    /// Strobe holds each color for the whole period; fade and breathe spread
    /// the period over the gradient samples.
    pub fn step_delay(&self) -> Duration {
        match self.kind {
            PatternKind::Strobe => self.period,
            PatternKind::Fade | PatternKind::Breathe => self.period / GRADIENT_STEPS as u32,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} [", self.kind, self.period)?;
        for (i, color) in self.colors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{color}")?;
        }
        f.write_str("]")
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Why a datagram was rejected. Always local to that one datagram.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// Payload is not valid UTF-8.
    NotText,
    /// Nothing but whitespace.
    Empty,
    UnknownTag(String),
    WrongArity {
        tag: &'static str,
        expected: &'static str,
        got: usize,
    },
    Period(PeriodError),
    /// Color at `index` (0-based, counting colors only) is malformed.
    Color {
        index: usize,
        source: ColorFormatError,
    },
    Pattern(PatternError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotText => f.write_str("payload is not valid UTF-8"),
            Self::Empty => f.write_str("empty command"),
            Self::UnknownTag(tag) => write!(f, "unknown command {tag:?}"),
            Self::WrongArity { tag, expected, got } => {
                write!(f, "{tag}: expected {expected}, got {got} fields")
            }
            Self::Period(e) => write!(f, "bad period: {e}"),
            Self::Color { index, source } => write!(f, "bad color #{}: {source}", index + 1),
            Self::Pattern(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Period(e) => Some(e),
            Self::Color { source, .. } => Some(source),
            Self::Pattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PeriodError> for DecodeError {
    fn from(e: PeriodError) -> Self {
        Self::Period(e)
    }
}

impl From<PatternError> for DecodeError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PeriodError {
    NotANumber(String),
    /// Zero, negative or NaN.
    NotPositive(f64),
    /// Infinite or too large for a `Duration`.
    OutOfRange(f64),
}

impl fmt::Display for PeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber(s) => write!(f, "{s:?} is not a number"),
            Self::NotPositive(secs) => write!(f, "{secs} is not a positive number of seconds"),
            Self::OutOfRange(secs) => write!(f, "{secs} seconds is out of range"),
        }
    }
}

impl std::error::Error for PeriodError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternError {
    ZeroPeriod,
    TooFewColors {
        kind: PatternKind,
        min: usize,
        got: usize,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriod => f.write_str("pattern period must be non-zero"),
            Self::TooFewColors { kind, min, got } => {
                write!(f, "{kind} needs at least {min} colors, got {got}")
            }
        }
    }
}

impl std::error::Error for PatternError {}
