//! The boundary between the server and the graph/DSP engine that actually
//! moves audio frames.
//!
//! The real engine (node/port/link creation, resampling, mixing) lives
//! outside this crate entirely; everything here talks to it only through
//! the [`Engine`] trait, so the rest of the server can be unit-tested
//! against [`TestEngine`] without a running graph.

use std::ffi::CString;

use crate::protocol::{ChannelVolume, SampleSpec};

/// A single object the mirror learns about from the engine's registry.
///
/// This is deliberately coarse: the mirror (`server::mirror`) is responsible
/// for classifying these into sinks/sources/streams/cards/modules/clients
/// using `media.class` and friends, the same way the grounding source's
/// `manager.c` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineObject {
    /// Stable id assigned by the engine.
    pub id: u32,

    /// The id of the parent object, if any (e.g. a port's owning node).
    pub parent_id: Option<u32>,

    /// Raw properties as reported by the engine (`media.class`, `node.name`, ...).
    pub props: Vec<(CString, CString)>,
}

/// A change in the engine's registry, as observed by [`Engine::poll_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A new object appeared.
    ObjectAdded(EngineObject),
    /// An existing object's properties changed.
    ObjectChanged(EngineObject),
    /// An object disappeared.
    ObjectRemoved(u32),
}

/// A timestamp sample used to drive the record-side clock model (`server::clock`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimestamp {
    /// The device-reported time, in nanoseconds.
    pub now_ns: u64,
    /// The number of audio frames elapsed since some fixed point.
    pub ticks: u64,
    /// Sample rate numerator/denominator at the time of the sample.
    pub rate: (u32, u32),
}

/// The out-of-scope graph engine, reached only through this trait.
///
/// All methods are non-blocking: the server's main loop never waits on the
/// engine, it only polls it for progress (`poll_events`) and issues
/// fire-and-forget requests. A real implementation would be backed by a
/// socket or shared memory to an external media server; see §1/§5 for why
/// that's deliberately not implemented here.
pub trait Engine {
    /// Drains and returns any pending registry events since the last call.
    fn poll_events(&mut self) -> Vec<EngineEvent>;

    /// Creates a playback node attached to `device_id`, with the given
    /// format. Returns the new node's engine id.
    fn create_playback_node(&mut self, device_id: Option<u32>, spec: SampleSpec) -> u32;

    /// Creates a record node attached to `device_id`.
    fn create_record_node(&mut self, device_id: Option<u32>, spec: SampleSpec) -> u32;

    /// Destroys a previously created node.
    fn destroy_node(&mut self, node_id: u32);

    /// Pushes playback frames for a node into the engine's buffer.
    fn write(&mut self, node_id: u32, data: &[u8]);

    /// Pulls any record frames the engine has produced for a node since the
    /// last call.
    fn read(&mut self, node_id: u32) -> Vec<u8>;

    /// Sets the volume for a node.
    fn set_volume(&mut self, node_id: u32, volume: ChannelVolume);

    /// Sets the muted state for a node.
    fn set_muted(&mut self, node_id: u32, muted: bool);

    /// Sets whether a node is corked (inactive).
    fn set_corked(&mut self, node_id: u32, corked: bool);

    /// Returns the most recent device timestamp sample for a node, if any.
    fn timestamp(&mut self, node_id: u32) -> Option<EngineTimestamp>;
}

/// An in-memory [`Engine`] double used by tests and by `spawn_test_server`.
///
/// It never produces record data or consumes playback data on its own;
/// tests drive it explicitly by calling [`TestEngine::push_record_data`] or
/// inspecting [`TestEngine::written`].
#[derive(Debug, Default)]
pub struct TestEngine {
    events: Vec<EngineEvent>,
    next_node_id: u32,
    written: std::collections::HashMap<u32, Vec<u8>>,
    pending_record: std::collections::HashMap<u32, Vec<u8>>,
    volumes: std::collections::HashMap<u32, ChannelVolume>,
    muted: std::collections::HashMap<u32, bool>,
    corked: std::collections::HashMap<u32, bool>,
}

impl TestEngine {
    /// Creates an empty test engine.
    pub fn new() -> Self {
        Self {
            next_node_id: 1,
            ..Default::default()
        }
    }

    /// Queues a registry event to be returned by the next [`Engine::poll_events`] call.
    pub fn queue_event(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Returns everything written to a playback node so far.
    pub fn written(&self, node_id: u32) -> &[u8] {
        self.written.get(&node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Queues bytes to be returned from a record node on the next `read`.
    pub fn push_record_data(&mut self, node_id: u32, data: &[u8]) {
        self.pending_record
            .entry(node_id)
            .or_default()
            .extend_from_slice(data);
    }

    /// Returns whether a node is currently corked, per the last `set_corked` call.
    pub fn is_corked(&self, node_id: u32) -> bool {
        self.corked.get(&node_id).copied().unwrap_or(false)
    }
}

impl Engine for TestEngine {
    fn poll_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn create_playback_node(&mut self, _device_id: Option<u32>, _spec: SampleSpec) -> u32 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    fn create_record_node(&mut self, _device_id: Option<u32>, _spec: SampleSpec) -> u32 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    fn destroy_node(&mut self, node_id: u32) {
        self.written.remove(&node_id);
        self.pending_record.remove(&node_id);
    }

    fn write(&mut self, node_id: u32, data: &[u8]) {
        self.written.entry(node_id).or_default().extend_from_slice(data);
    }

    fn read(&mut self, node_id: u32) -> Vec<u8> {
        self.pending_record.remove(&node_id).unwrap_or_default()
    }

    fn set_volume(&mut self, node_id: u32, volume: ChannelVolume) {
        self.volumes.insert(node_id, volume);
    }

    fn set_muted(&mut self, node_id: u32, muted: bool) {
        self.muted.insert(node_id, muted);
    }

    fn set_corked(&mut self, node_id: u32, corked: bool) {
        self.corked.insert(node_id, corked);
    }

    fn timestamp(&mut self, _node_id: u32) -> Option<EngineTimestamp> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SampleFormat;

    #[test]
    fn test_engine_round_trips_playback_data() {
        let mut engine = TestEngine::new();
        let node = engine.create_playback_node(
            None,
            SampleSpec {
                format: SampleFormat::S16Le,
                channels: 2,
                sample_rate: 48000,
            },
        );

        engine.write(node, &[1, 2, 3, 4]);
        engine.write(node, &[5, 6]);

        assert_eq!(engine.written(node), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_engine_record_data_is_drained_once() {
        let mut engine = TestEngine::new();
        let node = engine.create_record_node(
            None,
            SampleSpec {
                format: SampleFormat::S16Le,
                channels: 1,
                sample_rate: 44100,
            },
        );

        engine.push_record_data(node, &[9, 9, 9]);
        assert_eq!(engine.read(node), vec![9, 9, 9]);
        assert_eq!(engine.read(node), Vec::<u8>::new());
    }
}
