use crate::circular_array::{CircularArray, MAX_CIRCULAR_ARRAY_CAPACITY};
use crate::data_point::{AccelerationTriplet, DataPoint};

pub const DEFAULT_WINDOW_TOLERANCE: f32 = 0.1;

/// Outcome of feeding one sample to the [`LaunchDetector`].
///
/// Everything except `LaunchDetected` means "try again next tick".
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDetectorStatus {
    LaunchDetected,
    AlreadyLaunched,
    /// Sample is older than the newest sample in the window.
    YoungerTimestamp,
    /// Window is still filling.
    InitialPopulation,
    /// Sample arrived before `window_interval - tolerance` elapsed. Dropped.
    DataTooFast,
    /// Sample arrived after `window_interval + tolerance`. The window was cleared.
    WindowDataStale,
    WindowTimeRangeTooSmall,
    WindowTimeRangeTooLarge,
    AccelerationTooLow,
}

impl LaunchDetectorStatus {
    /// Numeric status as logged by the flight computer: 0 on detection,
    /// negative for warnings, positive for conditions that reset state.
    pub fn code(&self) -> i8 {
        match self {
            Self::LaunchDetected => 0,
            Self::AlreadyLaunched => -1,
            Self::YoungerTimestamp => -2,
            Self::InitialPopulation => -3,
            Self::DataTooFast => -4,
            Self::WindowDataStale => 1,
            Self::WindowTimeRangeTooSmall => -5,
            Self::WindowTimeRangeTooLarge => -6,
            Self::AccelerationTooLow => -8,
        }
    }
}

/// Detects a sustained acceleration above a threshold.
///
/// Keeps a window of squared acceleration magnitudes sampled every
/// `window_interval_ms` and compares the window median to the squared
/// threshold. Short spikes cannot move the median, the cost is a detection
/// delay of about half the window.
#[derive(Debug, Clone)]
pub struct LaunchDetector {
    window: CircularArray<DataPoint>,
    threshold_squared: f32,
    window_interval_ms: u16,
    acceptable_time_difference_ms: u16,
    min_window_span_ms: u32,
    max_window_span_ms: u32,
    launched: bool,
    launched_time_ms: u32,
    median_acceleration_squared: f32,
}

impl LaunchDetector {
    pub fn new(acceleration_threshold_ms2: f32, window_size_ms: u16, window_interval_ms: u16) -> Self {
        Self::with_tolerance(
            acceleration_threshold_ms2,
            window_size_ms,
            window_interval_ms,
            DEFAULT_WINDOW_TOLERANCE,
        )
    }

    /// `tolerance` is the accepted sample jitter as a fraction of `window_interval_ms`.
    pub fn with_tolerance(
        acceleration_threshold_ms2: f32,
        window_size_ms: u16,
        window_interval_ms: u16,
        tolerance: f32,
    ) -> Self {
        let window_interval_ms = window_interval_ms.max(1);
        let capacity = ((window_size_ms / window_interval_ms) as usize)
            .clamp(1, MAX_CIRCULAR_ARRAY_CAPACITY);
        let acceptable_time_difference_ms =
            (window_interval_ms as f32 * tolerance.max(0.0)) as u16;

        let gaps = capacity as u32 - 1;
        let min_window_span_ms =
            window_interval_ms.saturating_sub(acceptable_time_difference_ms) as u32 * gaps;
        let max_window_span_ms =
            (window_interval_ms as u32 + acceptable_time_difference_ms as u32) * gaps;

        Self {
            window: CircularArray::new(capacity),
            threshold_squared: acceleration_threshold_ms2 * acceleration_threshold_ms2,
            window_interval_ms,
            acceptable_time_difference_ms,
            min_window_span_ms,
            max_window_span_ms,
            launched: false,
            launched_time_ms: 0,
            median_acceleration_squared: 0.0,
        }
    }

    pub fn update(&mut self, acceleration: &AccelerationTriplet) -> LaunchDetectorStatus {
        if self.launched {
            return LaunchDetectorStatus::AlreadyLaunched;
        }

        let sample = DataPoint::new(
            acceleration.average_timestamp_ms(),
            acceleration.magnitude_squared(),
        );
        let head = self.window.get_from_head(0);

        if !self.window.is_empty() && sample.timestamp_ms < head.timestamp_ms {
            log_trace!(
                "Launch detector: sample at {}ms is older than head at {}ms",
                sample.timestamp_ms,
                head.timestamp_ms
            );
            return LaunchDetectorStatus::YoungerTimestamp;
        }

        if self.window.is_full() {
            let time_diff = sample.timestamp_ms - head.timestamp_ms;
            if time_diff < self.min_interval_ms() {
                return LaunchDetectorStatus::DataTooFast;
            }
            if time_diff > self.max_interval_ms() {
                log_trace!(
                    "Launch detector: {}ms gap exceeds interval, clearing window",
                    time_diff
                );
                self.window.clear();
                return LaunchDetectorStatus::WindowDataStale;
            }
            self.window.push(sample);
        } else {
            self.window.push(sample);
            if !self.window.is_full() {
                return LaunchDetectorStatus::InitialPopulation;
            }
        }

        self.evaluate_window(sample.timestamp_ms)
    }

    fn evaluate_window(&mut self, timestamp_ms: u32) -> LaunchDetectorStatus {
        let head = self.window.get_from_head(0);
        let tail = self.window.get_from_head(self.window.max_size() as usize - 1);
        let span_ms = head.timestamp_ms - tail.timestamp_ms;

        if span_ms < self.min_window_span_ms {
            log_trace!("Launch detector: window span {}ms too small", span_ms);
            return LaunchDetectorStatus::WindowTimeRangeTooSmall;
        }
        if span_ms > self.max_window_span_ms {
            log_trace!("Launch detector: window span {}ms too large", span_ms);
            return LaunchDetectorStatus::WindowTimeRangeTooLarge;
        }

        self.median_acceleration_squared = self.window.median().map_or(0.0, |m| m.data);
        if self.median_acceleration_squared > self.threshold_squared {
            self.launched = true;
            self.launched_time_ms = timestamp_ms;
            log_info!(
                "Launch detected at {}ms, median a^2 = {}",
                timestamp_ms,
                self.median_acceleration_squared
            );
            return LaunchDetectorStatus::LaunchDetected;
        }
        LaunchDetectorStatus::AccelerationTooLow
    }

    /// Back to the freshly constructed state, configuration kept.
    pub fn reset(&mut self) {
        self.launched = false;
        self.launched_time_ms = 0;
        self.median_acceleration_squared = 0.0;
        self.window.clear();
    }

    fn min_interval_ms(&self) -> u32 {
        self.window_interval_ms
            .saturating_sub(self.acceptable_time_difference_ms) as u32
    }

    fn max_interval_ms(&self) -> u32 {
        self.window_interval_ms as u32 + self.acceptable_time_difference_ms as u32
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn launched_time_ms(&self) -> u32 {
        self.launched_time_ms
    }

    pub fn median_acceleration_squared(&self) -> f32 {
        self.median_acceleration_squared
    }

    pub fn threshold_squared(&self) -> f32 {
        self.threshold_squared
    }

    pub fn window_interval_ms(&self) -> u16 {
        self.window_interval_ms
    }

    pub fn acceptable_time_difference_ms(&self) -> u16 {
        self.acceptable_time_difference_ms
    }

    pub fn window(&self) -> &CircularArray<DataPoint> {
        &self.window
    }
}
