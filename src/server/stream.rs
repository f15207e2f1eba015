//! Per-stream playback/record state, buffer-attribute negotiation, and the
//! credit/prebuf/cork/drain bookkeeping that drives the data path.
//!
//! Grounded on the example server's `PlaybackStream`/`StreamState`/
//! `play_samples`/`apply_buffer_defaults` (`examples/server.rs`), generalized
//! to the negotiation rules below instead of that example's flat constants.

use std::time::Duration;

use crate::protocol::{BufferAttr, ChannelMap, ChannelVolume, SampleSpec, StreamFlags};

/// Historical default cap on buffer size, used whenever `maxlength` is the
/// all-ones sentinel.
const DEFAULT_MAX_LENGTH: u32 = 4 * 1024 * 1024;

/// Default target fill, in milliseconds of the negotiated sample spec.
const DEFAULT_TLENGTH_MS: u32 = 250;

fn bytes_per_second(spec: &SampleSpec) -> u32 {
    spec.sample_rate * spec.channels as u32 * spec.format.bytes_per_sample() as u32
}

fn ms_to_bytes(ms: u32, spec: &SampleSpec) -> u32 {
    let frame_size = spec.channels as u32 * spec.format.bytes_per_sample() as u32;
    let bytes = (bytes_per_second(spec) as u64 * ms as u64) / 1000;
    // Round up to a whole number of frames.
    let frames = (bytes + frame_size as u64 - 1) / frame_size as u64;
    (frames * frame_size as u64) as u32
}

/// Direction-specific negotiation: whether this is a playback or record stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Playback,
    Record,
}

/// Negotiates buffer attributes, filling in any all-ones sentinel field per
/// the default rules, then applying the `PULSE_LATENCY_MSEC` override (which
/// unconditionally wins over anything the client set explicitly).
///
/// Returns the negotiated attrs and whether ADJUST_LATENCY should be forced
/// on as a result of the environment override.
pub fn negotiate_buffer_attr(
    requested: BufferAttr,
    direction: Direction,
    spec: &SampleSpec,
    latency_override_ms: Option<u32>,
    min_request_fraction: u32,
) -> (BufferAttr, bool) {
    let mut attr = requested;
    const SENTINEL: u32 = u32::MAX;

    if attr.max_length == SENTINEL {
        attr.max_length = DEFAULT_MAX_LENGTH;
    }

    let mut force_adjust_latency = false;

    if let Some(latency_ms) = latency_override_ms {
        attr.target_length = ms_to_bytes(latency_ms, spec);
        force_adjust_latency = true;
    } else if attr.target_length == SENTINEL {
        attr.target_length = ms_to_bytes(DEFAULT_TLENGTH_MS, spec);
    }

    attr.target_length = attr.target_length.min(attr.max_length);

    if attr.minimum_request_length == SENTINEL {
        let floor = attr.target_length / min_request_fraction.max(1);
        attr.minimum_request_length = attr.target_length.max(floor);
    }

    match direction {
        Direction::Playback => {
            if attr.pre_buffering == SENTINEL {
                attr.pre_buffering = attr.target_length;
            }
        }
        Direction::Record => {
            if attr.pre_buffering == SENTINEL {
                attr.pre_buffering = 0;
            }
            if attr.fragment_size == SENTINEL {
                attr.fragment_size = attr.target_length;
            }
        }
    }

    (attr, force_adjust_latency)
}

/// Lifecycle state of a single stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for `available` to reach `prebuf` before the engine is fed.
    Prebuffering,
    /// Actively playing/recording.
    Running,
    /// Corked; the engine side is inactive.
    Corked,
    /// Draining; will transition to gone once the engine reports empty.
    Draining,
}

/// A server-side playback or record stream.
#[derive(Debug)]
pub struct Stream {
    pub channel_id: u32,
    pub engine_node_id: u32,
    pub direction: Direction,
    pub sample_spec: SampleSpec,
    pub channel_map: ChannelMap,
    pub buffer_attr: BufferAttr,
    pub flags: StreamFlags,
    pub volume: ChannelVolume,
    pub muted: bool,
    pub state: StreamState,

    /// Monotonic byte offset the client has written up to (playback only).
    write_index: u64,
    /// Monotonic byte offset the engine has consumed up to (playback only).
    read_index: u64,
    /// Bytes requested from the client but not yet received.
    requested: u32,
    /// Tag of a pending DRAIN request, answered once the ring empties.
    pub pending_drain_tag: Option<u32>,
    /// Last time an UNDERFLOW event was emitted, for rate limiting.
    last_underflow: Option<Duration>,
}

impl Stream {
    pub fn new(
        channel_id: u32,
        engine_node_id: u32,
        direction: Direction,
        sample_spec: SampleSpec,
        channel_map: ChannelMap,
        buffer_attr: BufferAttr,
        flags: StreamFlags,
        volume: ChannelVolume,
    ) -> Self {
        let state = if flags.start_corked {
            StreamState::Corked
        } else if direction == Direction::Playback && buffer_attr.pre_buffering > 0 {
            StreamState::Prebuffering
        } else {
            StreamState::Running
        };

        Self {
            channel_id,
            engine_node_id,
            direction,
            sample_spec,
            channel_map,
            buffer_attr,
            flags,
            volume,
            muted: flags.start_muted.unwrap_or(false),
            state,
            write_index: 0,
            read_index: 0,
            requested: 0,
            pending_drain_tag: None,
            last_underflow: None,
        }
    }

    /// Bytes currently available in the ring (write_index - read_index);
    /// may be negative in the underflowed case, represented as 0 here since
    /// indices are unsigned — callers should rely on `requested`/emitted
    /// UNDERFLOW events to detect that condition.
    pub fn available(&self) -> u64 {
        self.write_index.saturating_sub(self.read_index)
    }

    /// How many bytes the server should currently ask the client for, or
    /// `None` if no REQUEST should be emitted yet.
    pub fn missing(&self) -> Option<u32> {
        if self.direction != Direction::Playback {
            return None;
        }
        let tlength = self.buffer_attr.target_length as u64;
        let available = self.available();
        let outstanding = self.requested as u64 + available;
        if outstanding >= tlength {
            return None;
        }
        let missing = (tlength - outstanding) as u32;

        let prebuf_drained = self.buffer_attr.pre_buffering == 0 || self.available() == 0;
        if missing >= self.buffer_attr.minimum_request_length || prebuf_drained {
            Some(missing)
        } else {
            None
        }
    }

    /// Records that a REQUEST for `amount` bytes was just sent.
    pub fn note_requested(&mut self, amount: u32) {
        self.requested += amount;
    }

    /// Applies a WRITE from the client: advances the write index and clears
    /// the matching amount from `requested`. Returns `Err(())` (an OVERFLOW)
    /// if the ring has no room for `len` bytes.
    pub fn apply_write(&mut self, len: u32) -> Result<(), ()> {
        let would_be = self.available() + len as u64;
        if would_be > self.buffer_attr.max_length as u64 {
            return Err(());
        }

        self.write_index += len as u64;
        self.requested = self.requested.saturating_sub(len);

        if self.state == StreamState::Prebuffering && self.available() >= self.buffer_attr.pre_buffering as u64 {
            self.state = StreamState::Running;
        }

        Ok(())
    }

    /// Advances the read index as the engine consumes bytes. Returns `Some`
    /// with the starvation offset if this consumption ran past the write
    /// index (an underflow), subject to the one-per-second rate limit
    /// tracked by `now`.
    pub fn note_engine_consumed(&mut self, len: u64, now: Duration) -> Option<u64> {
        let starved = self.read_index + len > self.write_index;
        self.read_index = (self.read_index + len).min(self.write_index.max(self.read_index + len));
        if !starved {
            return None;
        }

        if self.buffer_attr.pre_buffering > 0 {
            self.state = StreamState::Prebuffering;
        }

        let should_emit = match self.last_underflow {
            Some(last) if now.saturating_sub(last) < Duration::from_secs(1) => false,
            _ => true,
        };
        if should_emit {
            self.last_underflow = Some(now);
            Some(self.write_index)
        } else {
            None
        }
    }

    pub fn cork(&mut self) {
        self.state = StreamState::Corked;
    }

    pub fn uncork(&mut self) {
        if self.available() < self.buffer_attr.pre_buffering as u64 && self.buffer_attr.pre_buffering > 0 {
            self.state = StreamState::Prebuffering;
        } else {
            self.state = StreamState::Running;
        }
    }

    /// Marks a drain as pending; call [`Stream::ring_is_empty`] on each
    /// engine tick to know when to answer it.
    pub fn start_drain(&mut self, tag: u32) {
        self.state = StreamState::Draining;
        self.pending_drain_tag = Some(tag);
    }

    pub fn ring_is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running
    }

    /// Current (write, read) ring offsets, for `GET_*_LATENCY` replies.
    pub fn offsets(&self) -> (i64, i64) {
        (self.write_index as i64, self.read_index as i64)
    }

    /// Buffered latency in microseconds, derived from `available()` and the
    /// stream's sample spec.
    pub fn latency_usec(&self) -> u64 {
        let bps = bytes_per_second(&self.sample_spec) as u64;
        if bps == 0 {
            return 0;
        }
        self.available() * 1_000_000 / bps
    }

    /// Simulates the engine draining the ring at a steady per-tick rate,
    /// the way a real playback graph pulls data at the device rate.
    ///
    /// Grounded on the example server's `play_samples`, which discards
    /// `bytes_per_second / CLOCK_SPEED_HZ` bytes from the buffer on every
    /// clock tick while playing. Returns the starvation offset if this tick
    /// underflowed (subject to the one-per-second rate limit).
    pub fn simulate_consumption(&mut self, tick_hz: u64, now: Duration) -> Option<u64> {
        if self.direction != Direction::Playback {
            return None;
        }
        if !matches!(self.state, StreamState::Running | StreamState::Draining) {
            return None;
        }

        let bytes_per_tick = bytes_per_second(&self.sample_spec) as u64 / tick_hz.max(1);
        self.note_engine_consumed(bytes_per_tick, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SampleFormat;

    fn spec() -> SampleSpec {
        SampleSpec {
            format: SampleFormat::S16Le,
            channels: 2,
            sample_rate: 48000,
        }
    }

    #[test]
    fn negotiation_fills_sentinels_with_250ms_tlength() {
        let (attr, forced) = negotiate_buffer_attr(BufferAttr::default(), Direction::Playback, &spec(), None, 8);
        assert!(!forced);
        assert_eq!(attr.max_length, DEFAULT_MAX_LENGTH);

        let expected_tlength = ms_to_bytes(250, &spec());
        assert_eq!(attr.target_length, expected_tlength);
        assert_eq!(attr.pre_buffering, expected_tlength);
        assert_eq!(attr.minimum_request_length, expected_tlength / 8);
    }

    #[test]
    fn record_defaults_prebuf_to_zero_and_fragsize_to_tlength() {
        let (attr, _) = negotiate_buffer_attr(BufferAttr::default(), Direction::Record, &spec(), None, 8);
        assert_eq!(attr.pre_buffering, 0);
        assert_eq!(attr.fragment_size, attr.target_length);
    }

    #[test]
    fn latency_override_forces_adjust_latency_and_wins_over_explicit_attr() {
        let mut requested = BufferAttr::default();
        requested.target_length = ms_to_bytes(1000, &spec());

        let (attr, forced) = negotiate_buffer_attr(requested, Direction::Playback, &spec(), Some(20), 8);
        assert!(forced);
        assert_eq!(attr.target_length, ms_to_bytes(20, &spec()));
    }

    #[test]
    fn tlength_is_bounded_by_maxlength() {
        let mut requested = BufferAttr::default();
        requested.max_length = 100;
        let (attr, _) = negotiate_buffer_attr(requested, Direction::Playback, &spec(), Some(5000), 8);
        assert_eq!(attr.target_length, 100);
    }

    fn make_stream(attr: BufferAttr) -> Stream {
        Stream::new(
            1,
            1,
            Direction::Playback,
            spec(),
            ChannelMap::default(),
            attr,
            StreamFlags::default(),
            ChannelVolume::norm(2),
        )
    }

    #[test]
    fn missing_is_none_once_tlength_is_covered() {
        let (attr, _) = negotiate_buffer_attr(BufferAttr::default(), Direction::Playback, &spec(), None, 8);
        let mut stream = make_stream(attr);
        stream.note_requested(attr.target_length);
        assert_eq!(stream.missing(), None);
    }

    #[test]
    fn write_past_maxlength_is_an_overflow() {
        let mut attr = BufferAttr::default();
        attr.max_length = 10;
        attr.target_length = 10;
        attr.pre_buffering = 0;
        attr.minimum_request_length = 1;
        let mut stream = make_stream(attr);
        assert!(stream.apply_write(20).is_err());
    }

    #[test]
    fn underflow_is_rate_limited_to_once_per_second() {
        let mut attr = BufferAttr::default();
        attr.max_length = 1000;
        attr.target_length = 100;
        attr.pre_buffering = 0;
        attr.minimum_request_length = 1;
        let mut stream = make_stream(attr);
        stream.apply_write(10).unwrap();

        let t0 = Duration::from_secs(0);
        let first = stream.note_engine_consumed(20, t0);
        assert!(first.is_some());

        let t1 = Duration::from_millis(500);
        let second = stream.note_engine_consumed(5, t1);
        assert_eq!(second, None);
    }

    #[test]
    fn prebuf_leaves_once_available_reaches_prebuf_level() {
        let mut attr = BufferAttr::default();
        attr.max_length = 1000;
        attr.target_length = 100;
        attr.pre_buffering = 50;
        attr.minimum_request_length = 1;
        let mut stream = make_stream(attr);
        assert_eq!(stream.state, StreamState::Prebuffering);

        stream.apply_write(50).unwrap();
        assert_eq!(stream.state, StreamState::Running);
    }
}
