//! Client capability policy, grounded on the original `snap-policy.c`'s
//! AppArmor/snapd query.
//!
//! The production binary would obtain a [`Label`] via `SO_PEERSEC` /
//! `getsockopt` on the accepted socket; [`resolve`] itself stays a pure
//! function over that label so the policy is unit-testable without a real
//! AppArmor/snapd stack.

use bitflags::bitflags;

bitflags! {
    /// What a client is allowed to do.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Capability: u8 {
        /// May create/use playback streams.
        const PLAYBACK = 0x01;
        /// May create/use record streams.
        const RECORD = 0x02;
    }
}

/// The peer's confinement label, as read from the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// The peer is unconfined, or confined in classic/devmode confinement.
    NotASandbox,
    /// The peer is confined under AppArmor with the given snap instance name
    /// and a set of snapd plug names already determined to be connected.
    Snap {
        /// The part of `snap.<name>.<app>` between the two dots.
        instance: String,
        /// Plug names (`audio-playback`, `audio-record`, `pulseaudio`)
        /// connected to a matching slot.
        connected_plugs: Vec<String>,
    },
}

/// Resolves a confinement label to the capability set it grants.
///
/// Mirrors `pw_snap_get_audio_permissions`: an unconfined peer gets
/// everything; a confined snap gets the union of whatever audio plugs are
/// connected (`pulseaudio` implies both).
pub fn resolve(label: &Label) -> Capability {
    match label {
        Label::NotASandbox => Capability::all(),
        Label::Snap { connected_plugs, .. } => {
            let mut cap = Capability::empty();
            for plug in connected_plugs {
                match plug.as_str() {
                    "audio-playback" => cap |= Capability::PLAYBACK,
                    "audio-record" => cap |= Capability::RECORD,
                    "pulseaudio" => cap = Capability::all(),
                    _ => {}
                }
            }
            cap
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_sandbox_gets_everything() {
        assert_eq!(resolve(&Label::NotASandbox), Capability::all());
    }

    #[test]
    fn no_connected_plugs_gets_nothing() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec![],
        };
        assert_eq!(resolve(&label), Capability::empty());
    }

    #[test]
    fn playback_only_plug() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec!["audio-playback".into()],
        };
        assert_eq!(resolve(&label), Capability::PLAYBACK);
    }

    #[test]
    fn both_plugs_union() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec!["audio-playback".into(), "audio-record".into()],
        };
        assert_eq!(resolve(&label), Capability::PLAYBACK | Capability::RECORD);
    }

    #[test]
    fn pulseaudio_plug_implies_all() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec!["pulseaudio".into()],
        };
        assert_eq!(resolve(&label), Capability::all());
    }

    #[test]
    fn resolve_is_pure() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec!["audio-record".into()],
        };
        assert_eq!(resolve(&label), resolve(&label));
    }

    #[test]
    fn non_trivial_capabilities_are_subsets_of_playback_or_record() {
        let label = Label::Snap {
            instance: "some-app".into(),
            connected_plugs: vec!["audio-record".into()],
        };
        let cap = resolve(&label);
        assert!(Capability::all() != cap || cap.is_empty() || (cap & !(Capability::PLAYBACK | Capability::RECORD)).is_empty());
    }
}
