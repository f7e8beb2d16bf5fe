//! Pattern executors: strobe, fade and breathe.
//!
//! Each executor is an endless loop of "write a color, then hold it". The
//! hold doubles as the cancellation point: it races the step delay against
//! the task's [`StopSignal`], so a stop request is observed right after the
//! current write instead of at the end of a full cycle.
//!
//! A running [`PatternTask`] owns the PWM sink. Stopping the task joins it
//! and hands the sink back, which is what guarantees that a stopped pattern
//! can never write again.

use crate::color::{Color, GRADIENT_STEPS, Rgb, build_gradient};
use crate::command::{Pattern, PatternKind};
use crate::pwm::PwmSink;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

// ── Cancellation ─────────────────────────────────────────────────────

/// Receiving end of a stop request, handed to one pattern task.
///
/// Both an explicit stop and a dropped sender count as "stop".
pub struct StopSignal {
    rx: oneshot::Receiver<()>,
    stopped: bool,
}

impl StopSignal {
    /// Create a connected sender/signal pair.
    pub fn channel() -> (oneshot::Sender<()>, StopSignal) {
        let (tx, rx) = oneshot::channel();
        (tx, StopSignal { rx, stopped: false })
    }

    /// Sleep for `delay`. Returns `false` as soon as a stop is requested,
    /// without waiting out the rest of the delay.
    pub async fn pause(&mut self, delay: Duration) -> bool {
        if self.stopped {
            return false;
        }

        tokio::select! {
            biased;
            _ = &mut self.rx => {
                // the receiver must not be polled again after completing
                self.stopped = true;
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Show `rgb`, then hold it for `delay`. `false` once stopped.
async fn hold<S: PwmSink>(sink: &mut S, rgb: Rgb, delay: Duration, stop: &mut StopSignal) -> bool {
    sink.set_rgb(rgb);
    stop.pause(delay).await
}

// ── Executors ────────────────────────────────────────────────────────

/// Drive `sink` with `pattern` until `stop` fires, then give the sink back.
pub async fn run<S: PwmSink>(pattern: Pattern, mut sink: S, mut stop: StopSignal) -> S {
    let delay = pattern.step_delay();
    match pattern.kind() {
        PatternKind::Strobe => strobe(pattern.colors(), delay, &mut sink, &mut stop).await,
        PatternKind::Fade => fade(pattern.colors(), delay, &mut sink, &mut stop).await,
        PatternKind::Breathe => breathe(pattern.colors(), delay, &mut sink, &mut stop).await,
    }
    sink
}

/// Hard cuts through the color list, one color per period.
async fn strobe<S: PwmSink>(colors: &[Color], delay: Duration, sink: &mut S, stop: &mut StopSignal) {
    loop {
        for color in colors {
            if !hold(sink, color.to_rgb(), delay, stop).await {
                return;
            }
        }
    }
}

/// Gradient from each color to the next, wrapping from the last back to the
/// first so the cycle is seamless.
async fn fade<S: PwmSink>(colors: &[Color], delay: Duration, sink: &mut S, stop: &mut StopSignal) {
    loop {
        for (i, from) in colors.iter().enumerate() {
            let to = colors[(i + 1) % colors.len()];
            for rgb in build_gradient(from.to_rgb(), to.to_rgb(), GRADIENT_STEPS) {
                if !hold(sink, rgb, delay, stop).await {
                    return;
                }
            }
        }
    }
}

/// Each color ramps up from black and back down before the next one starts.
/// Unlike fade there is no link from the last color back to the first.
async fn breathe<S: PwmSink>(colors: &[Color], delay: Duration, sink: &mut S, stop: &mut StopSignal) {
    let black = Color::BLACK.to_rgb();
    loop {
        for color in colors {
            let ramp = build_gradient(black, color.to_rgb(), GRADIENT_STEPS);
            for &rgb in ramp.iter().chain(ramp.iter().rev()) {
                if !hold(sink, rgb, delay, stop).await {
                    return;
                }
            }
        }
    }
}

// ── Tasks ────────────────────────────────────────────────────────────

/// A pattern running on its own tokio task.
///
/// Dropping a `PatternTask` without calling [`PatternTask::stop`] still
/// stops the pattern (the stop sender is dropped), but nobody waits for it
/// and the sink is dropped with the task.
pub struct PatternTask<S> {
    kind: PatternKind,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<S>,
}

impl<S: PwmSink> PatternTask<S> {
    /// Start `pattern` on a new task, moving `sink` into it.
    pub fn spawn(pattern: Pattern, sink: S) -> Self {
        let kind = pattern.kind();
        let (stop_tx, stop) = StopSignal::channel();
        tracing::debug!("Starting pattern: {}", pattern);

        let handle = tokio::spawn(run(pattern, sink, stop));

        Self {
            kind,
            stop_tx,
            handle,
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Request a stop and wait until the task has exited.
    ///
    /// Returns the sink once the task is gone. Fails only if the task
    /// panicked, in which case the sink went down with it.
    pub async fn stop(self) -> Result<S, JoinError> {
        let PatternTask {
            kind,
            stop_tx,
            handle,
        } = self;

        // an Err here means the task already ended; the join below reports why
        let _ = stop_tx.send(());
        let sink = handle.await?;
        tracing::debug!("Stopped {} pattern", kind);
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pwm::RecordingSink;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    const RED: Color = Color::new(255, 0, 0);
    const GREEN: Color = Color::new(0, 255, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    fn pattern(kind: PatternKind, period: Duration, colors: &[Color]) -> Pattern {
        Pattern::new(kind, period, colors.to_vec()).unwrap()
    }

    /// Poll until the sink has at least `frames` complete frames.
    async fn wait_for_frames(sink: &RecordingSink, frames: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while sink.frames().len() < frames {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pattern produced too few frames");
    }

    // ── StopSignal ─────────────────────────────────────────────────

    #[tokio::test]
    async fn pause_runs_full_delay_without_stop() {
        let (_tx, mut stop) = StopSignal::channel();
        assert!(stop.pause(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn pause_returns_early_on_stop() {
        let (tx, mut stop) = StopSignal::channel();
        tx.send(()).unwrap();

        let started = Instant::now();
        assert!(!stop.pause(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
        // stays stopped on later calls
        assert!(!stop.pause(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn dropped_sender_counts_as_stop() {
        let (tx, mut stop) = StopSignal::channel();
        drop(tx);
        assert!(!stop.pause(Duration::from_secs(30)).await);
    }

    // ── Executors ──────────────────────────────────────────────────

    #[tokio::test]
    async fn strobe_alternates_colors() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Strobe, Duration::from_millis(10), &[RED, GREEN]),
            sink.clone(),
        );

        wait_for_frames(&sink, 4).await;
        task.stop().await.unwrap();

        let frames = sink.frames();
        assert!(sink.is_frame_aligned());
        for (i, frame) in frames.iter().enumerate() {
            let expected = if i % 2 == 0 { RED } else { GREEN };
            assert_eq!(*frame, expected.to_rgb(), "frame {i}");
        }
    }

    #[tokio::test]
    async fn fade_walks_each_segment_and_wraps_to_first_color() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Fade, Duration::from_millis(100), &[RED, BLUE]),
            sink.clone(),
        );

        wait_for_frames(&sink, 2 * GRADIENT_STEPS + 1).await;
        task.stop().await.unwrap();

        let frames = sink.frames();
        let red_to_blue = build_gradient(RED.to_rgb(), BLUE.to_rgb(), GRADIENT_STEPS);
        let blue_to_red = build_gradient(BLUE.to_rgb(), RED.to_rgb(), GRADIENT_STEPS);

        assert_eq!(&frames[..100], red_to_blue.as_slice());
        assert_eq!(&frames[100..200], blue_to_red.as_slice());
        // second cycle starts over at red
        assert_eq!(frames[200], RED.to_rgb());
    }

    #[tokio::test]
    async fn breathe_ramps_up_and_down_per_color_without_wrapping() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Breathe, Duration::from_millis(100), &[RED, BLUE]),
            sink.clone(),
        );

        wait_for_frames(&sink, 4 * GRADIENT_STEPS + 1).await;
        task.stop().await.unwrap();

        let frames = sink.frames();
        let black = Color::BLACK.to_rgb();
        let red_ramp = build_gradient(black, RED.to_rgb(), GRADIENT_STEPS);
        let blue_ramp = build_gradient(black, BLUE.to_rgb(), GRADIENT_STEPS);
        let red_down: Vec<Rgb> = red_ramp.iter().rev().copied().collect();
        let blue_down: Vec<Rgb> = blue_ramp.iter().rev().copied().collect();

        assert_eq!(&frames[..100], red_ramp.as_slice());
        assert_eq!(&frames[100..200], red_down.as_slice());
        assert_eq!(&frames[200..300], blue_ramp.as_slice());
        assert_eq!(&frames[300..400], blue_down.as_slice());
        // after the last color it goes back to the first, starting from black
        assert_eq!(frames[400], black);
    }

    // ── Tasks ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn stop_interrupts_a_long_hold() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Strobe, Duration::from_secs(60), &[RED, GREEN]),
            sink.clone(),
        );
        assert_eq!(task.kind(), PatternKind::Strobe);

        wait_for_frames(&sink, 1).await;
        let started = Instant::now();
        let returned = tokio::time::timeout(Duration::from_secs(5), task.stop())
            .await
            .expect("stop did not finish")
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sink.frames(), vec![RED.to_rgb()]);
        // the sink we got back is the one the task was writing to
        assert_eq!(returned.len(), 3);
    }

    #[tokio::test]
    async fn no_writes_after_stop_returns() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Fade, Duration::from_millis(50), &[RED, GREEN, BLUE]),
            sink.clone(),
        );

        wait_for_frames(&sink, 10).await;
        task.stop().await.unwrap();
        let count = sink.len();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.len(), count);
    }

    #[tokio::test]
    async fn dropping_the_task_stops_the_pattern() {
        let sink = RecordingSink::new();
        let task = PatternTask::spawn(
            pattern(PatternKind::Strobe, Duration::from_millis(5), &[RED]),
            sink.clone(),
        );

        wait_for_frames(&sink, 1).await;
        drop(task);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let count = sink.len();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.len(), count);
    }
}
