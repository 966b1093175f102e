//! VU level detection engine
//!
//! Rectifies the incoming signal, averages it across channels and runs it
//! through a one-pole integrator with a 300 ms time constant:
//!
//! ```text
//! y[n] = a * y[n-1] + (1 - a) * mean(|x_ch[n]|),   a = exp(-1 / (tau * fs))
//! ```
//!
//! Attack and release share the same coefficient. After each block the
//! integrator is converted to dBFS, shifted so that -18 dBFS reads 0 VU,
//! clamped to [-20, +3] VU and published together with the peak flag.
//!
//! `process_block` and `process_interleaved` run on the audio thread: they
//! never allocate, lock, log or fail.

use std::sync::Arc;

use crate::constants::{
    INTEGRATION_TIME_CONSTANT_SECS, LOG_EPSILON, PEAK_THRESHOLD_VU, VU_CEILING, VU_FLOOR,
    VU_REFERENCE_OFFSET_DB,
};
use crate::error::MeterError;
use crate::meter::publisher::{Reading, ReadingHandle, ReadingPublisher};

/// Stream parameters the filter coefficient is derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz, must be positive
    pub sample_rate_hz: f64,

    /// Integration time constant in seconds
    pub time_constant_secs: f64,
}

impl EngineConfig {
    /// Config for the given sample rate with the standard 300 ms integration
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            time_constant_secs: INTEGRATION_TIME_CONSTANT_SECS,
        }
    }

    /// Reject rates and time constants that would make the coefficient undefined
    pub fn validate(&self) -> Result<(), MeterError> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(MeterError::InvalidSampleRate(self.sample_rate_hz));
        }
        if !self.time_constant_secs.is_finite() || self.time_constant_secs <= 0.0 {
            return Err(MeterError::InvalidTimeConstant(self.time_constant_secs));
        }
        Ok(())
    }

    /// Per-sample smoothing coefficient, in (0, 1)
    pub fn smoothing_coefficient(&self) -> f32 {
        (-1.0 / (self.time_constant_secs * self.sample_rate_hz)).exp() as f32
    }
}

/// Filter state owned by the producer thread
#[derive(Debug, Clone, Copy, Default)]
struct FilterState {
    smoothing_coefficient: f32,
    /// Always >= 0: it integrates a rectified signal
    integrator: f32,
}

impl FilterState {
    #[inline(always)]
    fn step(&mut self, rectified_mean: f32) {
        let a = self.smoothing_coefficient;
        self.integrator = a * self.integrator + (1.0 - a) * rectified_mean;
    }
}

/// Convert a linear rectified level to a clamped VU value
pub fn vu_from_level(level: f32) -> f32 {
    if level.is_nan() {
        return VU_FLOOR;
    }
    let dbfs = 20.0 * (level.max(0.0) + LOG_EPSILON).log10();
    (dbfs + VU_REFERENCE_OFFSET_DB).clamp(VU_FLOOR, VU_CEILING)
}

/// Peak decision on a clamped VU value (inclusive threshold)
#[inline]
pub fn is_peak(vu: f32) -> bool {
    vu >= PEAK_THRESHOLD_VU
}

/// Full reading for a linear integrator level
pub fn reading_for_level(level: f32) -> Reading {
    let vu_value = vu_from_level(level);
    Reading {
        vu_value,
        peak_hit: is_peak(vu_value),
    }
}

/// Stateful VU detector, one per metered stream
pub struct LevelDetector {
    config: Option<EngineConfig>,
    state: FilterState,
    publisher: Arc<ReadingPublisher>,
}

impl LevelDetector {
    /// Create a detector with its own publisher.
    ///
    /// The coefficient is zero until [`reset`](Self::reset) is called, so the
    /// detector tracks the input instantly rather than integrating it.
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(ReadingPublisher::new()))
    }

    /// Create a detector that writes into an existing publisher
    pub fn with_publisher(publisher: Arc<ReadingPublisher>) -> Self {
        Self {
            config: None,
            state: FilterState::default(),
            publisher,
        }
    }

    /// Derive the coefficient for a new stream and discard accumulated state.
    ///
    /// Must not run concurrently with block processing; call it from the
    /// host's stream (re)configuration point.
    pub fn reset(&mut self, config: EngineConfig) -> Result<(), MeterError> {
        config.validate()?;

        self.state = FilterState {
            smoothing_coefficient: config.smoothing_coefficient(),
            integrator: 0.0,
        };
        self.config = Some(config);
        self.publisher.publish(Reading::FLOOR);

        tracing::debug!(
            "Level detector reset: {} Hz, tau {} s, coefficient {}",
            config.sample_rate_hz,
            config.time_constant_secs,
            self.state.smoothing_coefficient
        );
        Ok(())
    }

    /// Host entry point at stream start. The channel count is informational;
    /// the detector adapts to whatever each block carries.
    pub fn reset_for_stream(
        &mut self,
        sample_rate_hz: f64,
        channels_hint: u16,
    ) -> Result<(), MeterError> {
        self.reset(EngineConfig::new(sample_rate_hz))?;
        tracing::info!(
            "Metering stream prepared: {} Hz, {} channel(s)",
            sample_rate_hz,
            channels_hint
        );
        Ok(())
    }

    /// Integrate one block of planar audio and publish the resulting reading.
    ///
    /// Processes `num_frames` frames, or fewer if a channel slice is shorter.
    /// With no channels the integrator is left as is.
    pub fn process_block(&mut self, channels: &[&[f32]], num_frames: usize) {
        if !channels.is_empty() {
            let frames = channels
                .iter()
                .map(|ch| ch.len())
                .fold(num_frames, usize::min);
            let count = channels.len() as f32;

            for n in 0..frames {
                let sum: f32 = channels.iter().map(|ch| ch[n].abs()).sum();
                self.state.step(sum / count);
            }
        }

        self.finish_block();
    }

    /// Integrate one block of interleaved audio (`L R L R ...`).
    ///
    /// A trailing partial frame is ignored. `channels == 0` leaves the
    /// integrator as is.
    pub fn process_interleaved(&mut self, samples: &[f32], channels: usize) {
        if channels > 0 {
            let count = channels as f32;
            for frame in samples.chunks_exact(channels) {
                let sum: f32 = frame.iter().map(|s| s.abs()).sum();
                self.state.step(sum / count);
            }
        }

        self.finish_block();
    }

    fn finish_block(&mut self) {
        let reading = reading_for_level(self.state.integrator);

        // Infinite or NaN input would poison the recursion for good.
        if !self.state.integrator.is_finite() {
            self.state.integrator = 0.0;
        }

        self.publisher.publish(reading);
    }

    /// Most recently published reading
    pub fn reading(&self) -> Reading {
        self.publisher.load()
    }

    /// Read-side handle for a consumer thread
    pub fn handle(&self) -> ReadingHandle {
        ReadingHandle::new(self.publisher.clone())
    }

    /// Config of the last successful reset
    pub fn config(&self) -> Option<EngineConfig> {
        self.config
    }

    /// Current per-sample smoothing coefficient
    pub fn smoothing_coefficient(&self) -> f32 {
        self.state.smoothing_coefficient
    }

    /// Current linear integrator value
    pub fn integrator(&self) -> f32 {
        self.state.integrator
    }
}

impl Default for LevelDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(sample_rate: f64) -> LevelDetector {
        let mut detector = LevelDetector::new();
        detector.reset(EngineConfig::new(sample_rate)).unwrap();
        detector
    }

    #[test]
    fn test_coefficient_matches_time_constant() {
        let config = EngineConfig::new(48_000.0);
        let expected = (-1.0f64 / (0.3 * 48_000.0)).exp() as f32;
        assert_eq!(config.smoothing_coefficient(), expected);
        assert!(expected > 0.0 && expected < 1.0);
    }

    #[test]
    fn test_coefficient_grows_with_sample_rate() {
        let low = EngineConfig::new(22_050.0).smoothing_coefficient();
        let high = EngineConfig::new(96_000.0).smoothing_coefficient();
        assert!(low < high);
    }

    #[test]
    fn test_reset_rejects_bad_rates() {
        let mut detector = LevelDetector::new();
        assert_eq!(
            detector.reset(EngineConfig::new(0.0)),
            Err(MeterError::InvalidSampleRate(0.0))
        );
        assert!(detector.reset(EngineConfig::new(-44_100.0)).is_err());
        assert!(detector.reset(EngineConfig::new(f64::NAN)).is_err());
        assert!(detector.config().is_none());

        let config = EngineConfig {
            sample_rate_hz: 44_100.0,
            time_constant_secs: 0.0,
        };
        assert_eq!(
            detector.reset(config),
            Err(MeterError::InvalidTimeConstant(0.0))
        );
    }

    #[test]
    fn test_reset_clears_state_and_reading() {
        let mut detector = prepared(44_100.0);
        let loud = vec![1.0f32; 44_100];
        detector.process_block(&[&loud[..]], loud.len());
        assert!(detector.integrator() > 0.0);
        assert!(detector.reading().peak_hit);

        detector.reset(EngineConfig::new(44_100.0)).unwrap();
        assert_eq!(detector.integrator(), 0.0);
        assert_eq!(detector.reading(), Reading::FLOOR);
    }

    #[test]
    fn test_vu_mapping() {
        // -18 dBFS is 0 VU
        let level = 10f32.powf(-18.0 / 20.0);
        assert!(vu_from_level(level).abs() < 1e-3);

        assert_eq!(vu_from_level(0.0), VU_FLOOR);
        assert_eq!(vu_from_level(1.0), VU_CEILING);
        assert_eq!(vu_from_level(f32::INFINITY), VU_CEILING);
        assert_eq!(vu_from_level(f32::NAN), VU_FLOOR);
        assert_eq!(vu_from_level(-1.0), VU_FLOOR);
    }

    #[test]
    fn test_peak_threshold_is_inclusive() {
        assert!(is_peak(0.0));
        assert!(is_peak(2.0));
        assert!(!is_peak(-0.001));
        assert!(!is_peak(-f32::EPSILON));
    }

    #[test]
    fn test_silence_reads_floor() {
        let mut detector = prepared(44_100.0);
        let silence = vec![0.0f32; 1024];
        for _ in 0..10 {
            detector.process_block(&[&silence[..], &silence[..]], silence.len());
        }
        assert_eq!(detector.integrator(), 0.0);
        assert_eq!(detector.reading(), Reading::FLOOR);
    }

    #[test]
    fn test_zero_channels_leave_integrator_unchanged() {
        let mut detector = prepared(44_100.0);
        let tone = vec![0.25f32; 4096];
        detector.process_block(&[&tone[..]], tone.len());
        let before = detector.integrator();
        let reading_before = detector.reading();

        detector.process_block(&[], 512);
        assert_eq!(detector.integrator().to_bits(), before.to_bits());
        assert_eq!(detector.reading(), reading_before);

        detector.process_interleaved(&tone, 0);
        assert_eq!(detector.integrator().to_bits(), before.to_bits());
    }

    #[test]
    fn test_mean_across_channels() {
        // One silent channel halves the rectified mean.
        let mut stereo = prepared(44_100.0);
        let mut mono = prepared(44_100.0);
        let full = vec![0.5f32; 2048];
        let half = vec![0.25f32; 2048];
        let silent = vec![0.0f32; 2048];

        stereo.process_block(&[&full[..], &silent[..]], 2048);
        mono.process_block(&[&half[..]], 2048);
        assert_eq!(stereo.integrator(), mono.integrator());
    }

    #[test]
    fn test_rectification() {
        let mut positive = prepared(48_000.0);
        let mut negative = prepared(48_000.0);
        let pos = vec![0.3f32; 1000];
        let neg = vec![-0.3f32; 1000];
        positive.process_block(&[&pos[..]], 1000);
        negative.process_block(&[&neg[..]], 1000);
        assert_eq!(positive.integrator(), negative.integrator());
    }

    #[test]
    fn test_interleaved_matches_planar() {
        let left: Vec<f32> = (0..960).map(|i| (i as f32 * 0.05).sin()).collect();
        let right: Vec<f32> = (0..960).map(|i| (i as f32 * 0.03).cos() * 0.5).collect();
        let interleaved: Vec<f32> = left
            .iter()
            .zip(&right)
            .flat_map(|(l, r)| [*l, *r])
            .collect();

        let mut planar = prepared(48_000.0);
        let mut packed = prepared(48_000.0);
        planar.process_block(&[&left[..], &right[..]], 960);
        packed.process_interleaved(&interleaved, 2);

        assert_eq!(planar.integrator().to_bits(), packed.integrator().to_bits());
        assert_eq!(planar.reading(), packed.reading());
    }

    #[test]
    fn test_short_channel_limits_frames() {
        let mut detector = prepared(44_100.0);
        let long = vec![1.0f32; 100];
        let short = vec![1.0f32; 10];
        detector.process_block(&[&long[..], &short[..]], 100);

        let mut reference = prepared(44_100.0);
        reference.process_block(&[&short[..], &short[..]], 10);
        assert_eq!(detector.integrator(), reference.integrator());
    }

    #[test]
    fn test_step_response_reaches_63_percent_at_tau() {
        let sample_rate = 10_000.0;
        let mut detector = prepared(sample_rate);
        let ones = vec![1.0f32; 3000]; // 0.3 s
        detector.process_block(&[&ones[..]], ones.len());
        let expected = 1.0 - (-1.0f32).exp();
        assert!((detector.integrator() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_input_recovers() {
        let mut detector = prepared(44_100.0);
        let bad = [f32::INFINITY, 0.0, 0.0];
        detector.process_block(&[&bad[..]], bad.len());
        assert_eq!(detector.reading().vu_value, VU_CEILING);
        assert_eq!(detector.integrator(), 0.0);

        let nan = [f32::NAN];
        detector.process_block(&[&nan[..]], 1);
        assert_eq!(detector.reading(), Reading::FLOOR);
        assert_eq!(detector.integrator(), 0.0);
    }

    #[test]
    fn test_handle_tracks_detector() {
        let mut detector = prepared(44_100.0);
        let handle = detector.handle();
        let loud = vec![1.0f32; 88_200];
        detector.process_block(&[&loud[..], &loud[..]], loud.len());
        assert_eq!(handle.get(), detector.reading());
        assert_eq!(handle.get().vu_value, VU_CEILING);
    }
}
