//! Accepting new connections: cookie/creds authentication and sandbox label
//! resolution, ahead of handing a fresh socket off to a new
//! [`crate::server::session::Session`].
//!
//! Grounded on the example server's accept loop (`examples/server.rs`, the
//! `ACCEPT` token arm) for the mio registration shape; cookie verification
//! follows the historical PulseAudio auth cookie scheme (a shared random
//! file, compared byte-for-byte).

use std::path::Path;

use crate::server::sandbox::Label;

/// Compares a client-supplied auth cookie against the server's own.
///
/// An empty client cookie is accepted outright: per the design, creds-based
/// (`SO_PEERCRED`) authentication is allowed to carry a zero-length cookie
/// instead, since the kernel has already told us who's on the other end of
/// the socket.
pub fn verify_cookie(provided: &[u8], expected: &[u8]) -> bool {
    provided.is_empty() || provided == expected
}

/// Resolves the confinement [`Label`] of a peer, so the listener can compute
/// its [`crate::server::sandbox::Capability`] before the session is allowed
/// to do anything.
///
/// The real implementation reads `/proc/<pid>/attr/current` (via
/// `SO_PEERCRED` for the pid) and asks snapd's `connected-plugs` API; that
/// I/O is deliberately kept behind this trait so the accept path is
/// testable without a running AppArmor/snapd stack.
pub trait LabelResolver {
    fn resolve(&self, peer_pid: u32) -> Label;
}

/// A resolver that always reports an unconfined peer, used when the server
/// isn't running under a sandboxing LSM at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfinedResolver;

impl LabelResolver for UnconfinedResolver {
    fn resolve(&self, _peer_pid: u32) -> Label {
        Label::NotASandbox
    }
}

/// Loads the server's own auth cookie from disk, matching the format written
/// by a real PulseAudio/PipeWire install: a fixed-length binary blob, with
/// no trailing newline.
pub fn load_cookie(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cookie_is_always_accepted() {
        assert!(verify_cookie(&[], &[1, 2, 3]));
    }

    #[test]
    fn matching_cookie_is_accepted() {
        assert!(verify_cookie(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn mismatched_cookie_is_rejected() {
        assert!(!verify_cookie(&[1, 2, 4], &[1, 2, 3]));
    }

    #[test]
    fn unconfined_resolver_always_grants_not_a_sandbox() {
        let resolver = UnconfinedResolver;
        assert_eq!(resolver.resolve(1234), Label::NotASandbox);
    }
}
