//! Per-connection client session: the state machine, subscription mask, and
//! table-driven command dispatch described in the design's client session
//! component.
//!
//! Grounded on the example server's `Client` struct (`examples/server.rs`)
//! for the overall shape (per-connection fields, stream map, outbound
//! queue), generalized to the full state machine and capability model.

use std::collections::{HashMap, VecDeque};

use crate::protocol::{
    AuthReply, LookupReply, Props, PulseError, SetClientNameReply, SubscriptionMask,
};
use crate::server::sandbox::Capability;
use crate::server::stream::Stream;

/// Lifecycle state of a client connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Just accepted; no AUTH received yet.
    Accepted,
    /// AUTH received and acknowledged; waiting for SET_CLIENT_NAME.
    Authenticated,
    /// SET_CLIENT_NAME received; ready to serve any request.
    Ready,
    /// Tearing down: draining pending replies before the socket closes.
    Closing,
}

/// A single client connection's state.
///
/// Field-for-field modeled on the per-connection state described in the
/// design: protocol version, property list, capability set, stream map,
/// outbound queue, subscription mask. The pending-operations FIFO is
/// represented implicitly by each [`Stream`]'s own `pending_drain_tag`
/// rather than a separate global map, since drain is currently the only
/// multi-step operation that needs one.
#[derive(Debug)]
pub struct Session {
    /// This session's id in the manager mirror (== its PulseAudio client index).
    pub client_id: u32,
    pub state: SessionState,
    pub protocol_version: u16,
    pub props: Props,
    pub capability: Capability,
    pub streams: HashMap<u32, Stream>,
    pub subscription_mask: SubscriptionMask,

    next_channel_id: u32,
    /// Serialized frames waiting to be written to the socket.
    outbound: VecDeque<Vec<u8>>,
}

impl Session {
    pub fn new(client_id: u32, capability: Capability) -> Self {
        Self {
            client_id,
            state: SessionState::Accepted,
            protocol_version: 0,
            props: Props::new(),
            capability,
            streams: HashMap::new(),
            subscription_mask: SubscriptionMask::empty(),
            next_channel_id: 0,
            outbound: VecDeque::new(),
        }
    }

    /// Handles the AUTH command: negotiates the protocol version and moves
    /// to [`SessionState::Authenticated`].
    ///
    /// Cookie verification itself happens in `server::listener` before the
    /// session is even constructed (or is a no-op under creds auth); this
    /// only handles version negotiation, matching the AUTH reply semantics.
    pub fn handle_auth(
        &mut self,
        client_version: u16,
        server_version: u16,
    ) -> Result<AuthReply, PulseError> {
        if self.state != SessionState::Accepted {
            return Err(PulseError::BadState);
        }

        let negotiated = client_version.min(server_version);
        if negotiated < crate::protocol::MIN_VERSION {
            return Err(PulseError::Version);
        }

        self.protocol_version = negotiated;
        self.state = SessionState::Authenticated;

        Ok(AuthReply {
            version: server_version,
            use_memfd: false,
            use_shm: false,
        })
    }

    /// Handles SET_CLIENT_NAME: records the property list and moves to
    /// [`SessionState::Ready`].
    pub fn handle_set_client_name(&mut self, props: Props) -> Result<SetClientNameReply, PulseError> {
        if self.state != SessionState::Authenticated && self.state != SessionState::Ready {
            return Err(PulseError::BadState);
        }

        self.props = props;
        self.state = SessionState::Ready;

        Ok(SetClientNameReply::new(self.client_id))
    }

    /// Returns an error unless the session is ready to serve stream and
    /// introspection commands.
    pub fn require_ready(&self) -> Result<(), PulseError> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(PulseError::BadState),
        }
    }

    /// Handles SUBSCRIBE: updates this session's event mask.
    pub fn handle_subscribe(&mut self, mask: SubscriptionMask) -> Result<(), PulseError> {
        self.require_ready()?;
        self.subscription_mask = mask;
        Ok(())
    }

    /// Allocates a fresh, connection-scoped channel id for a new stream.
    pub fn allocate_channel_id(&mut self) -> u32 {
        let id = self.next_channel_id;
        self.next_channel_id += 1;
        id
    }

    /// Registers a newly created stream under its channel id.
    pub fn insert_stream(&mut self, stream: Stream) {
        self.streams.insert(stream.channel_id, stream);
    }

    /// Removes a stream, e.g. on DELETE_PLAYBACK_STREAM/DELETE_RECORD_STREAM.
    pub fn remove_stream(&mut self, channel_id: u32) -> Option<Stream> {
        self.streams.remove(&channel_id)
    }

    /// Wraps a lookup-by-name result (sink or source) into the reply form.
    pub fn lookup_reply(index: u32) -> LookupReply {
        LookupReply::new(index)
    }

    /// Queues a serialized frame for delivery to the client.
    pub fn enqueue(&mut self, frame: Vec<u8>) {
        self.outbound.push_back(frame);
    }

    /// Pops the next frame to write, if any.
    pub fn pop_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbound.pop_front()
    }

    /// Whether there's anything left to write.
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Begins graceful teardown: subsequent command processing should be
    /// rejected, and the transport should flush pending replies then close.
    pub fn begin_close(&mut self) {
        self.state = SessionState::Closing;
    }

    pub fn is_closing(&self) -> bool {
        self.state == SessionState::Closing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_then_name_reaches_ready() {
        let mut session = Session::new(7, Capability::all());
        let auth = session.handle_auth(35, 35).unwrap();
        assert_eq!(auth.version, 35);
        assert_eq!(session.state, SessionState::Authenticated);

        let reply = session.handle_set_client_name(Props::new()).unwrap();
        assert_eq!(session.state, SessionState::Ready);
        let _ = reply;
    }

    #[test]
    fn stream_commands_rejected_before_ready() {
        let session = Session::new(1, Capability::all());
        assert_eq!(session.require_ready(), Err(PulseError::BadState));
    }

    #[test]
    fn auth_negotiates_min_of_client_and_server_version() {
        let mut session = Session::new(1, Capability::all());
        let auth = session.handle_auth(20, 35).unwrap();
        assert_eq!(auth.version, 35);
        assert_eq!(session.protocol_version, 20);
    }

    #[test]
    fn auth_rejects_version_below_minimum() {
        let mut session = Session::new(1, Capability::all());
        assert_eq!(session.handle_auth(5, 35), Err(PulseError::Version));
    }

    #[test]
    fn double_auth_is_a_bad_state() {
        let mut session = Session::new(1, Capability::all());
        session.handle_auth(35, 35).unwrap();
        assert_eq!(session.handle_auth(35, 35), Err(PulseError::BadState));
    }

    #[test]
    fn channel_ids_increase_monotonically() {
        let mut session = Session::new(1, Capability::all());
        assert_eq!(session.allocate_channel_id(), 0);
        assert_eq!(session.allocate_channel_id(), 1);
    }
}
