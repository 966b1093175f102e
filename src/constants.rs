//! Fixed metering constants and runtime defaults

/// VU integration time constant in seconds (classic 300 ms ballistics)
pub const INTEGRATION_TIME_CONSTANT_SECS: f64 = 0.300;

/// Offset added to dBFS to get VU units (0 VU = -18 dBFS)
pub const VU_REFERENCE_OFFSET_DB: f32 = 18.0;

/// Lowest displayable VU value, also the reading after reset
pub const VU_FLOOR: f32 = -20.0;

/// Highest displayable VU value
pub const VU_CEILING: f32 = 3.0;

/// Readings at or above this value raise the peak flag
pub const PEAK_THRESHOLD_VU: f32 = 0.0;

/// Added to the integrator before taking the logarithm
pub const LOG_EPSILON: f32 = 1.0e-9;

/// Default sample rate used before a stream reports its own
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default consumer poll rate in Hz
pub const DEFAULT_POLL_HZ: u32 = 30;

/// Default HTTP port for the web display
pub const DEFAULT_HTTP_PORT: u16 = 8090;

/// Pass-through ring buffer capacity (in callback blocks)
pub const RING_BUFFER_CAPACITY: usize = 64;

/// Scale ticks drawn on both display modes
pub const SCALE_TICKS_VU: [f32; 6] = [-20.0, -10.0, -5.0, -3.0, 0.0, 3.0];

/// Needle angle at the VU floor, in degrees
pub const NEEDLE_ANGLE_FLOOR_DEG: f32 = 230.0;

/// Needle angle at the VU ceiling, in degrees
pub const NEEDLE_ANGLE_CEILING_DEG: f32 = -50.0;
