//! Live progress display: a shared byte counter written by the request
//! body stream, sampled on a fixed tick to derive speed and ETA.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

/// How often the reporter samples the byte counter.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// One speed/ETA reading. Recomputed on every sample, never persisted.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    /// Bytes per second over the last sampling window.
    pub speed_bps: f64,
    /// None until there is a measurable speed.
    pub eta: Option<Duration>,
}

/// Computes speed over the delta since the previous sample:
/// speed = (bytes since last sample) / (seconds since last sample),
/// eta = (total - loaded) / speed. Both non-negative by construction.
pub struct SpeedEstimator {
    last_bytes: u64,
    last_at: Instant,
}

impl SpeedEstimator {
    pub fn new(start: Instant) -> Self {
        Self {
            last_bytes: 0,
            last_at: start,
        }
    }

    pub fn sample(&mut self, loaded: u64, total: u64, now: Instant) -> Sample {
        let elapsed = now.duration_since(self.last_at).as_secs_f64();
        let delta = loaded.saturating_sub(self.last_bytes);
        let speed_bps = if elapsed > 0.0 {
            delta as f64 / elapsed
        } else {
            0.0
        };

        self.last_bytes = loaded;
        self.last_at = now;

        let remaining = total.saturating_sub(loaded);
        let eta = if speed_bps > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / speed_bps))
        } else {
            None
        };

        Sample { speed_bps, eta }
    }
}

pub fn upload_bar(total: u64, file_name: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("=>-"),
    );
    bar.set_prefix(file_name.to_string());
    bar
}

/// Background task that drives the bar off the shared counter until the
/// whole file has been pulled through the stream. The engine aborts it
/// if the request ends first.
pub fn spawn_reporter(
    bar: ProgressBar,
    counter: Arc<AtomicU64>,
    total: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut estimator = SpeedEstimator::new(Instant::now());
        let mut tick = tokio::time::interval(SAMPLE_INTERVAL);
        // first tick fires immediately; skip it so the window is non-empty
        tick.tick().await;
        loop {
            tick.tick().await;
            let loaded = counter.load(Ordering::Relaxed).min(total);
            let sample = estimator.sample(loaded, total, Instant::now());
            bar.set_position(loaded);
            bar.set_message(format_sample(&sample));
            if loaded >= total {
                break;
            }
        }
    })
}

fn format_sample(sample: &Sample) -> String {
    match sample.eta {
        Some(eta) => format!(
            "{}/s, {} left",
            HumanBytes(sample.speed_bps as u64),
            HumanDuration(eta)
        ),
        None => format!("{}/s", HumanBytes(sample.speed_bps as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_is_delta_over_window() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        let sample = est.sample(1000, 10_000, start + Duration::from_secs(1));
        assert!((sample.speed_bps - 1000.0).abs() < 1e-6);

        // next window only counts bytes since the previous sample
        let sample = est.sample(1500, 10_000, start + Duration::from_secs(2));
        assert!((sample.speed_bps - 500.0).abs() < 1e-6);
    }

    #[test]
    fn eta_is_remaining_over_speed() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        let sample = est.sample(2000, 10_000, start + Duration::from_secs(1));
        // 8000 bytes left at 2000 B/s
        assert_eq!(sample.eta, Some(Duration::from_secs(4)));
    }

    #[test]
    fn zero_speed_has_no_eta() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        let sample = est.sample(0, 10_000, start + Duration::from_secs(1));
        assert_eq!(sample.speed_bps, 0.0);
        assert!(sample.eta.is_none());
    }

    #[test]
    fn zero_elapsed_does_not_divide_by_zero() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        let sample = est.sample(500, 1000, start);
        assert_eq!(sample.speed_bps, 0.0);
        assert!(sample.eta.is_none());
    }

    #[test]
    fn loaded_past_total_clamps_eta_to_zero() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        // counter can briefly run ahead of total when the service reads
        // trailing multipart framing; eta must stay non-negative
        let sample = est.sample(1100, 1000, start + Duration::from_secs(1));
        assert_eq!(sample.eta, Some(Duration::ZERO));
    }

    #[test]
    fn counter_going_backwards_is_treated_as_stalled() {
        let start = Instant::now();
        let mut est = SpeedEstimator::new(start);

        est.sample(1000, 10_000, start + Duration::from_secs(1));
        let sample = est.sample(900, 10_000, start + Duration::from_secs(2));
        assert_eq!(sample.speed_bps, 0.0);
    }

    #[test]
    fn format_has_speed_and_eta() {
        let text = format_sample(&Sample {
            speed_bps: 1024.0,
            eta: Some(Duration::from_secs(90)),
        });
        assert!(text.contains("/s"));
        assert!(text.contains("left"));
    }
}
