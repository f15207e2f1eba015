//! A single-threaded mio event loop that accepts PulseAudio native protocol
//! connections and dispatches them against the session/mirror/stream/engine
//! components in this module.
//!
//! Grounded on the accept/read/dispatch loop in `examples/server.rs`: a fixed
//! `ACCEPT` token, a timerfd-driven `CLOCK` token, and one mio token per
//! connected client, all polled from a single [`mio::Poll`]. Where that
//! example kept a flat `Client`/`ServerState` pair, this loop delegates to
//! [`session::Session`] for per-connection state, [`mirror::Mirror`] for the
//! registry snapshot, and an [`engine::Engine`] for the actual audio data
//! path.

pub mod clock;
pub mod engine;
pub mod extension;
pub mod introspect;
pub mod listener;
pub mod mirror;
pub mod pool;
pub mod remap;
pub mod sandbox;
pub mod session;
pub mod stream;

use std::collections::HashMap;
use std::ffi::CString;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use mio::net::{UnixListener, UnixStream};
use mio::{Events, Interest, Poll, Token};

use crate::protocol::{
    self, Command, CommandReply, Descriptor, ProtocolError, PulseError, Request, SubscriptionEvent,
    SubscriptionEventFacility, SubscriptionEventType, SubscriptionMask, Underflow,
};
use engine::Engine;
use listener::{verify_cookie, LabelResolver, UnconfinedResolver};
use mirror::{Mirror, ObjectClass};
use pool::Pool;
use sandbox::resolve;
use session::{Session, SessionState};
use stream::{Direction as StreamDirection, Stream};

const ACCEPT: Token = Token(0);
const CLOCK: Token = Token(1);
const FIRST_CLIENT_TOKEN: usize = 1024;
const CLOCK_SPEED_HZ: u64 = 100;

/// Runtime configuration for a [`Server`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the UNIX socket to listen on.
    pub socket_path: PathBuf,
    /// Auth cookie clients must present (empty disables the check).
    pub cookie: Vec<u8>,
    /// Reported in `GET_SERVER_INFO`.
    pub server_name: String,
    /// `PULSE_LATENCY_MSEC`-equivalent override, applied to every stream.
    pub latency_override_ms: Option<u32>,
    /// Denominator used to floor `minreq` from `tlength` when unset.
    pub min_request_fraction: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/pulseaudio.sock"),
            cookie: Vec::new(),
            server_name: "pulseaudio".to_string(),
            latency_override_ms: std::env::var("PULSE_LATENCY_MSEC")
                .ok()
                .and_then(|v| v.parse().ok()),
            min_request_fraction: 8,
        }
    }
}

struct Connection {
    socket: UnixStream,
    session: Session,
    pending_write: Option<(Vec<u8>, usize)>,
    writable_registered: bool,
}

/// Owns the listening socket, the registry mirror, and every connected
/// session, and drives them from a single mio poll loop.
pub struct Server<E: Engine> {
    poll: Poll,
    listener: UnixListener,
    clock: mio_timerfd::TimerFd,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    next_client_id: u32,
    mirror: Mirror,
    engine: E,
    pool: Pool,
    label_resolver: Box<dyn LabelResolver>,
    config: Config,
    /// Reference instant the per-tick playback/record simulation runs
    /// against, so consumption rates don't depend on wall-clock time.
    started: Instant,
}

impl<E: Engine> Server<E> {
    /// Binds the listening socket and the clock timer, but accepts no
    /// connections until [`Server::run`] is called.
    pub fn bind(config: Config, engine: E) -> anyhow::Result<Self> {
        let poll = Poll::new()?;

        let mut listener = UnixListener::bind(&config.socket_path)?;
        poll.registry()
            .register(&mut listener, ACCEPT, Interest::READABLE)?;

        let mut clock = mio_timerfd::TimerFd::new(mio_timerfd::ClockId::Monotonic)?;
        clock.set_timeout_interval(&Duration::from_nanos(1_000_000_000 / CLOCK_SPEED_HZ))?;
        poll.registry().register(&mut clock, CLOCK, Interest::READABLE)?;

        Ok(Self {
            poll,
            listener,
            clock,
            connections: HashMap::new(),
            next_token: FIRST_CLIENT_TOKEN,
            next_client_id: 1,
            mirror: Mirror::new(),
            engine,
            pool: Pool::default(),
            label_resolver: Box::new(UnconfinedResolver),
            config,
            started: Instant::now(),
        })
    }

    /// Runs the event loop forever (or until a fatal I/O error occurs).
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = Events::with_capacity(256);

        loop {
            self.poll.poll(&mut events, None)?;

            let tokens: Vec<Token> = events.iter().map(|e| e.token()).collect();
            for token in tokens {
                match token {
                    ACCEPT => self.accept()?,
                    CLOCK => self.tick_clock()?,
                    token => self.service(token)?,
                }
            }
        }
    }

    fn accept(&mut self) -> anyhow::Result<()> {
        loop {
            let (mut socket, _addr) = match self.listener.accept() {
                Ok(v) => v,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let token = Token(self.next_token);
            self.next_token += 1;
            self.poll
                .registry()
                .register(&mut socket, token, Interest::READABLE)?;

            let client_id = self.next_client_id;
            self.next_client_id += 1;

            // SO_PEERCRED isn't read here; confinement is resolved purely
            // from whatever the configured resolver reports for an unknown
            // pid, matching `UnconfinedResolver`'s default-open behavior.
            let label = self.label_resolver.resolve(0);
            let capability = resolve(&label);
            let session = Session::new(client_id, capability);

            log::info!("client {} connected (token {:?})", client_id, token);
            self.connections.insert(
                token,
                Connection {
                    socket,
                    session,
                    pending_write: None,
                    writable_registered: false,
                },
            );
        }
    }

    fn tick_clock(&mut self) -> anyhow::Result<()> {
        self.clock.read()?;

        for event in self.mirror.apply_events(self.engine.poll_events()) {
            self.broadcast_subscription_event(event);
        }

        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.pump_streams(token)?;
            self.pump_record_streams(token);
            self.flush(token)?;
        }

        Ok(())
    }

    fn broadcast_subscription_event(&mut self, change: mirror::MirrorChange) {
        let facility = match change.class {
            ObjectClass::Sink => SubscriptionEventFacility::Sink,
            ObjectClass::Source => SubscriptionEventFacility::Source,
            ObjectClass::SinkInput => SubscriptionEventFacility::SinkInput,
            ObjectClass::SourceOutput => SubscriptionEventFacility::SourceOutput,
            ObjectClass::Card => SubscriptionEventFacility::Card,
            ObjectClass::Module => SubscriptionEventFacility::Module,
            ObjectClass::Client => SubscriptionEventFacility::Client,
        };
        let mask_bit = subscription_mask_for(facility);

        let event = Command::SubscribeEvent(SubscriptionEvent {
            event_facility: facility,
            event_type: change.kind,
            index: Some(change.id),
        });

        for conn in self.connections.values_mut() {
            if conn.session.state != SessionState::Ready {
                continue;
            }
            if !conn.session.subscription_mask.contains(mask_bit) {
                continue;
            }
            enqueue_command(&mut conn.session, u32::MAX, &event);
        }
    }

    /// Requests more data for prebuffered/running playback streams whose
    /// ring has fallen below `tlength`, matching the example's per-tick
    /// request bookkeeping.
    fn pump_streams(&mut self, token: Token) -> anyhow::Result<()> {
        let now = self.started.elapsed();
        let conn = match self.connections.get_mut(&token) {
            Some(c) => c,
            None => return Ok(()),
        };

        let mut requests = Vec::new();
        let mut underflows = Vec::new();
        let mut drained = Vec::new();
        for stream in conn.session.streams.values_mut() {
            if let Some(missing) = stream.missing() {
                stream.note_requested(missing);
                requests.push(Request {
                    channel: stream.channel_id,
                    length: missing,
                });
            }

            if let Some(offset) = stream.simulate_consumption(CLOCK_SPEED_HZ, now) {
                underflows.push(Underflow {
                    channel: stream.channel_id,
                    offset: offset as i64,
                });
            }

            if stream.pending_drain_tag.is_some() && stream.ring_is_empty() {
                drained.push((stream.pending_drain_tag.take().unwrap(), stream.channel_id));
            }
        }

        for request in requests {
            enqueue_command(&mut conn.session, u32::MAX, &Command::Request(request));
        }
        for underflow in underflows {
            enqueue_command(&mut conn.session, u32::MAX, &Command::Underflow(underflow));
        }
        for (tag, _channel) in drained {
            enqueue_ack(&mut conn.session, tag);
        }

        Ok(())
    }

    /// Delivers any engine-produced record data, split into `fragsize`
    /// chunks and framed as raw channel data (not a `Command`).
    fn pump_record_streams(&mut self, token: Token) {
        let targets: Vec<(u32, u32, usize)> = match self.connections.get(&token) {
            Some(conn) => conn
                .session
                .streams
                .values()
                .filter(|s| s.direction == StreamDirection::Record)
                .map(|s| (s.channel_id, s.engine_node_id, s.buffer_attr.fragment_size.max(1) as usize))
                .collect(),
            None => return,
        };

        for (channel, node_id, fragsize) in targets {
            let data = self.engine.read(node_id);
            if data.is_empty() {
                continue;
            }

            let conn = match self.connections.get_mut(&token) {
                Some(c) => c,
                None => return,
            };
            for chunk in data.chunks(fragsize) {
                let mut buf = Vec::new();
                if protocol::write_memblock(&mut buf, channel, chunk, 0).is_ok() {
                    conn.session.enqueue(buf);
                }
            }
        }
    }

    fn service(&mut self, token: Token) -> anyhow::Result<()> {
        if !self.connections.contains_key(&token) {
            return Ok(());
        }

        if let Err(e) = self.readable(token) {
            log::warn!("client error, disconnecting: {:#}", e);
            self.disconnect(token)?;
            return Ok(());
        }

        if self.flush(token).is_err() {
            self.disconnect(token)?;
        }

        Ok(())
    }

    fn disconnect(&mut self, token: Token) -> anyhow::Result<()> {
        if let Some(mut conn) = self.connections.remove(&token) {
            self.poll.registry().deregister(&mut conn.socket)?;
            for (channel_id, stream) in conn.session.streams.drain() {
                self.engine.destroy_node(stream.engine_node_id);
                let _ = channel_id;
            }
            log::info!("client {} disconnected", conn.session.client_id);
        }
        Ok(())
    }

    fn readable(&mut self, token: Token) -> anyhow::Result<()> {
        loop {
            let protocol_version = self.connections[&token].session.protocol_version;

            let desc = {
                let conn = self.connections.get_mut(&token).unwrap();
                match protocol::read_descriptor(&mut conn.socket) {
                    Ok(v) => v,
                    Err(ProtocolError::Io(e)) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                    Err(ProtocolError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                        anyhow::bail!("connection closed")
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            let mut payload = self.pool.acquire(desc.length as usize);
            self.connections
                .get_mut(&token)
                .unwrap()
                .socket
                .read_exact(&mut payload)?;

            if desc.channel == u32::MAX {
                let result =
                    Command::read_tag_prefixed(&mut Cursor::new(&payload[..]), protocol_version);
                self.pool.release(payload);

                match result {
                    Ok((seq, cmd)) => self.handle_command(token, seq, cmd)?,
                    Err(e) => {
                        log::warn!("malformed command: {:?}", e);
                        let conn = self.connections.get_mut(&token).unwrap();
                        enqueue_error(&mut conn.session, u32::MAX, PulseError::Protocol);
                    }
                }
            } else {
                self.handle_stream_write(token, desc, &payload)?;
                self.pool.release(payload);
            }
        }
    }

    fn handle_command(&mut self, token: Token, seq: u32, cmd: Command) -> anyhow::Result<()> {
        let tag = cmd.tag();
        log::debug!("client {:?}: {:?}", token, tag);

        let conn = self.connections.get_mut(&token).unwrap();
        let session = &mut conn.session;

        match (session.state, cmd) {
            (SessionState::Accepted, Command::Auth(params)) => {
                if !verify_cookie(&params.cookie, &self.config.cookie) {
                    enqueue_error(session, seq, PulseError::AccessDenied);
                    return Ok(());
                }
                match session.handle_auth(params.version, protocol::MAX_VERSION) {
                    Ok(reply) => enqueue_reply(session, seq, &reply),
                    Err(e) => enqueue_error(session, seq, e),
                }
            }
            (SessionState::Accepted, _) => {
                enqueue_error(session, seq, PulseError::AccessDenied);
            }
            (SessionState::Authenticated, Command::SetClientName(props)) => {
                match session.handle_set_client_name(props) {
                    Ok(reply) => enqueue_reply(session, seq, &reply),
                    Err(e) => enqueue_error(session, seq, e),
                }
            }
            (SessionState::Authenticated, _) => {
                enqueue_error(session, seq, PulseError::Protocol);
            }
            (SessionState::Closing, _) => {}
            (SessionState::Ready, cmd) => self.handle_ready_command(token, seq, cmd)?,
        }

        Ok(())
    }

    fn handle_ready_command(&mut self, token: Token, seq: u32, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::SetClientName(props) => {
                let conn = self.connections.get_mut(&token).unwrap();
                match conn.session.handle_set_client_name(props) {
                    Ok(reply) => enqueue_reply(&mut conn.session, seq, &reply),
                    Err(e) => enqueue_error(&mut conn.session, seq, e),
                }
            }
            Command::GetServerInfo => {
                let info = introspect::server_info(&self.mirror, &self.config.server_name, env!("CARGO_PKG_VERSION"));
                enqueue_reply(&mut self.connections.get_mut(&token).unwrap().session, seq, &info);
            }
            Command::GetSinkInfoList => {
                let sinks = introspect::list_sinks(&self.mirror);
                enqueue_reply(&mut self.connections.get_mut(&token).unwrap().session, seq, &sinks);
            }
            Command::GetSinkInfo(params) => {
                let info = params
                    .index
                    .and_then(|i| introspect::sink_by_index(&self.mirror, i))
                    .or_else(|| {
                        params
                            .name
                            .as_ref()
                            .and_then(|n| introspect::sink_by_name(&self.mirror, &n.to_string_lossy()))
                    });
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match info {
                    Some(info) => enqueue_reply(conn, seq, &info),
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::GetSourceInfoList => {
                let sources = introspect::list_sources(&self.mirror);
                enqueue_reply(&mut self.connections.get_mut(&token).unwrap().session, seq, &sources);
            }
            Command::GetSourceInfo(params) => {
                let info = params
                    .index
                    .and_then(|i| introspect::source_by_index(&self.mirror, i))
                    .or_else(|| {
                        params
                            .name
                            .as_ref()
                            .and_then(|n| introspect::source_by_name(&self.mirror, &n.to_string_lossy()))
                    });
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match info {
                    Some(info) => enqueue_reply(conn, seq, &info),
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::GetClientInfoList => {
                let clients = introspect::list_clients(&self.mirror);
                enqueue_reply(&mut self.connections.get_mut(&token).unwrap().session, seq, &clients);
            }
            Command::LookupSink(params) => {
                let found = self.mirror.find_by_name(ObjectClass::Sink, &params.name.to_string_lossy());
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match found {
                    Some(obj) => enqueue_reply(conn, seq, &Session::lookup_reply(obj.id)),
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::LookupSource(params) => {
                let found = self.mirror.find_by_name(ObjectClass::Source, &params.name.to_string_lossy());
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match found {
                    Some(obj) => enqueue_reply(conn, seq, &Session::lookup_reply(obj.id)),
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::Subscribe(mask) => {
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match conn.handle_subscribe(mask) {
                    Ok(()) => enqueue_ack(conn, seq),
                    Err(e) => enqueue_error(conn, seq, e),
                }
            }
            Command::GetPlaybackLatency(params) => {
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match conn.streams.get(&params.channel) {
                    Some(stream) => {
                        let (write_offset, read_offset) = stream.offsets();
                        let now = SystemTime::now();
                        let reply = protocol::PlaybackLatency {
                            sink_usec: stream.latency_usec(),
                            source_usec: 0,
                            playing: stream.is_running(),
                            local_time: now,
                            remote_time: now,
                            write_offset,
                            read_offset,
                            underrun_for: 0,
                            playing_for: read_offset.max(0) as u64,
                        };
                        enqueue_reply(conn, seq, &reply);
                    }
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::GetRecordLatency(params) => {
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match conn.streams.get(&params.channel) {
                    Some(stream) => {
                        let (write_offset, read_offset) = stream.offsets();
                        let now = SystemTime::now();
                        let reply = protocol::RecordLatency {
                            sink_usec: 0,
                            source_usec: stream.latency_usec(),
                            playing: stream.is_running(),
                            local_time: now,
                            remote_time: now,
                            write_offset,
                            read_offset,
                        };
                        enqueue_reply(conn, seq, &reply);
                    }
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::CreatePlaybackStream(params) => self.create_playback_stream(token, seq, params)?,
            Command::CreateRecordStream(params) => self.create_record_stream(token, seq, params)?,
            Command::DeletePlaybackStream(channel) | Command::DeleteRecordStream(channel) => {
                let removed = self
                    .connections
                    .get_mut(&token)
                    .unwrap()
                    .session
                    .remove_stream(channel);
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match removed {
                    Some(stream) => {
                        self.engine.destroy_node(stream.engine_node_id);
                        enqueue_ack(conn, seq);
                    }
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::DrainPlaybackStream(channel) => {
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match conn.streams.get_mut(&channel) {
                    Some(stream) if stream.ring_is_empty() => enqueue_ack(conn, seq),
                    Some(stream) => stream.start_drain(seq),
                    None => enqueue_error(conn, seq, PulseError::NoEntity),
                }
            }
            Command::CorkPlaybackStream(params) => {
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                if let Some(stream) = conn.streams.get_mut(&params.channel) {
                    if params.cork {
                        stream.cork();
                    } else {
                        stream.uncork();
                    }
                    enqueue_ack(conn, seq);
                } else {
                    enqueue_error(conn, seq, PulseError::NoEntity);
                }
            }
            Command::Extension(params) => {
                let found = extension::find(params.index, params.name.as_deref().map(|s| s.to_str().unwrap_or("")));
                let conn = &mut self.connections.get_mut(&token).unwrap().session;
                match found {
                    Some(_) => enqueue_ack(conn, seq),
                    None => enqueue_error(conn, seq, PulseError::NoExtension),
                }
            }
            _ => {
                log::debug!("ignoring unimplemented command {:?}", cmd.tag());
                enqueue_error(&mut self.connections.get_mut(&token).unwrap().session, seq, PulseError::NotImplemented);
            }
        }

        Ok(())
    }

    fn create_playback_stream(
        &mut self,
        token: Token,
        seq: u32,
        mut params: protocol::PlaybackStreamParams,
    ) -> anyhow::Result<()> {
        let device_id = params
            .sink_name
            .as_ref()
            .and_then(|n| self.mirror.find_by_name(ObjectClass::Sink, &n.to_string_lossy()))
            .or_else(|| params.sink_index.and_then(|i| self.mirror.get(i)))
            .map(|o| o.id);

        let (buffer_attr, force_adjust_latency) = stream::negotiate_buffer_attr(
            params.buffer_attr,
            StreamDirection::Playback,
            &params.sample_spec,
            self.config.latency_override_ms,
            self.config.min_request_fraction,
        );
        params.buffer_attr = buffer_attr;
        if force_adjust_latency {
            params.flags.adjust_latency = true;
        }

        let node_id = self.engine.create_playback_node(device_id, params.sample_spec.clone());
        let conn = &mut self.connections.get_mut(&token).unwrap().session;
        let channel = conn.allocate_channel_id();
        let volume = params.cvolume.clone().unwrap_or_else(|| {
            crate::protocol::ChannelVolume::norm(params.sample_spec.channels as usize)
        });

        let stream = Stream::new(
            channel,
            node_id,
            StreamDirection::Playback,
            params.sample_spec.clone(),
            params.channel_map.clone(),
            params.buffer_attr.clone(),
            params.flags.clone(),
            volume.clone(),
        );

        let requested = stream.missing().unwrap_or(0);
        conn.insert_stream(stream);

        let reply = protocol::CreatePlaybackStreamReply {
            channel,
            stream_index: node_id,
            requested_bytes: requested,
            buffer_attr: params.buffer_attr,
            sample_spec: params.sample_spec,
            channel_map: params.channel_map,
            sink_index: device_id.unwrap_or(0),
            sink_name: device_id
                .and_then(|id| self.mirror.get(id))
                .and_then(|o| o.prop("node.name"))
                .map(|s| CString::new(s).unwrap_or_default()),
            ..Default::default()
        };
        enqueue_reply(conn, seq, &reply);

        Ok(())
    }

    fn create_record_stream(
        &mut self,
        token: Token,
        seq: u32,
        mut params: protocol::RecordStreamParams,
    ) -> anyhow::Result<()> {
        let device_id = params
            .source_name
            .as_ref()
            .and_then(|n| self.mirror.find_by_name(ObjectClass::Source, &n.to_string_lossy()))
            .or_else(|| params.source_index.and_then(|i| self.mirror.get(i)))
            .map(|o| o.id);

        let (buffer_attr, force_adjust_latency) = stream::negotiate_buffer_attr(
            params.buffer_attr,
            StreamDirection::Record,
            &params.sample_spec,
            self.config.latency_override_ms,
            self.config.min_request_fraction,
        );
        params.buffer_attr = buffer_attr;
        if force_adjust_latency {
            params.flags.adjust_latency = true;
        }

        let node_id = self.engine.create_record_node(device_id, params.sample_spec.clone());
        let conn = &mut self.connections.get_mut(&token).unwrap().session;
        let channel = conn.allocate_channel_id();
        let volume = params.cvolume.clone().unwrap_or_else(|| {
            crate::protocol::ChannelVolume::norm(params.sample_spec.channels as usize)
        });

        let stream = Stream::new(
            channel,
            node_id,
            StreamDirection::Record,
            params.sample_spec.clone(),
            params.channel_map.clone(),
            params.buffer_attr.clone(),
            params.flags.clone(),
            volume,
        );
        conn.insert_stream(stream);

        let reply = protocol::CreateRecordStreamReply {
            channel_index: channel,
            stream_index: node_id,
            buffer_attr: params.buffer_attr,
            sample_spec: params.sample_spec,
            channel_map: params.channel_map,
            ..Default::default()
        };
        enqueue_reply(conn, seq, &reply);

        Ok(())
    }

    fn handle_stream_write(&mut self, token: Token, desc: Descriptor, payload: &[u8]) -> anyhow::Result<()> {
        let conn = match self.connections.get_mut(&token) {
            Some(c) => c,
            None => return Ok(()),
        };

        let (max_length, available) = match conn.session.streams.get(&desc.channel) {
            Some(s) => (s.buffer_attr.max_length as usize, s.available() as usize),
            None => return Ok(()),
        };

        let remaining = max_length.saturating_sub(available);
        let overflow = payload.len().saturating_sub(remaining);
        if overflow > 0 {
            enqueue_command(&mut conn.session, u32::MAX, &Command::Overflow(desc.channel));
        }
        let to_write = &payload[..payload.len() - overflow];

        let engine_node_id = {
            let stream = conn.session.streams.get_mut(&desc.channel).unwrap();
            if stream.apply_write(to_write.len() as u32).is_ok() {
                Some(stream.engine_node_id)
            } else {
                None
            }
        };

        if let Some(node_id) = engine_node_id {
            self.engine.write(node_id, to_write);
        }

        Ok(())
    }

    fn flush(&mut self, token: Token) -> anyhow::Result<()> {
        let conn = match self.connections.get_mut(&token) {
            Some(c) => c,
            None => return Ok(()),
        };

        loop {
            if conn.pending_write.is_none() {
                match conn.session.pop_outbound() {
                    Some(frame) => conn.pending_write = Some((frame, 0)),
                    None => break,
                }
            }

            let (frame, offset) = conn.pending_write.as_mut().unwrap();
            match conn.socket.write(&frame[*offset..]) {
                Ok(0) => break,
                Ok(n) => {
                    *offset += n;
                    if *offset >= frame.len() {
                        conn.pending_write = None;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if !conn.writable_registered {
                        self.poll.registry().reregister(
                            &mut conn.socket,
                            token,
                            Interest::READABLE | Interest::WRITABLE,
                        )?;
                        conn.writable_registered = true;
                    }
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        if conn.writable_registered {
            self.poll
                .registry()
                .reregister(&mut conn.socket, token, Interest::READABLE)?;
            conn.writable_registered = false;
        }

        Ok(())
    }
}

fn subscription_mask_for(facility: SubscriptionEventFacility) -> SubscriptionMask {
    match facility {
        SubscriptionEventFacility::Sink => SubscriptionMask::SINK,
        SubscriptionEventFacility::Source => SubscriptionMask::SOURCE,
        SubscriptionEventFacility::SinkInput => SubscriptionMask::SINK_INPUT,
        SubscriptionEventFacility::SourceOutput => SubscriptionMask::SOURCE_OUTPUT,
        SubscriptionEventFacility::Module => SubscriptionMask::MODULE,
        SubscriptionEventFacility::Client => SubscriptionMask::CLIENT,
        SubscriptionEventFacility::SampleCache => SubscriptionMask::SAMPLE_CACHE,
        SubscriptionEventFacility::Server => SubscriptionMask::SERVER,
        SubscriptionEventFacility::Card => SubscriptionMask::CARD,
        #[allow(deprecated)]
        SubscriptionEventFacility::Autoload => SubscriptionMask::AUTOLOAD,
    }
}

fn enqueue_reply<R: CommandReply>(session: &mut Session, seq: u32, reply: &R) {
    let mut buf = Vec::new();
    if protocol::write_reply_message(&mut buf, seq, reply, session.protocol_version).is_ok() {
        session.enqueue(buf);
    }
}

fn enqueue_command(session: &mut Session, seq: u32, cmd: &Command) {
    let mut buf = Vec::new();
    if protocol::write_command_message(&mut buf, seq, cmd, session.protocol_version).is_ok() {
        session.enqueue(buf);
    }
}

fn enqueue_error(session: &mut Session, seq: u32, error: PulseError) {
    let mut buf = Vec::new();
    if protocol::write_error(&mut buf, seq, &error).is_ok() {
        session.enqueue(buf);
    }
}

fn enqueue_ack(session: &mut Session, seq: u32) {
    let mut buf = Vec::new();
    if protocol::write_ack_message(&mut buf, seq).is_ok() {
        session.enqueue(buf);
    }
}
