//! `module-device-restore` extension: enumerating and saving the passthrough
//! (IEC 61937) formats a sink will accept, grounded on
//! `ext-device-restore.c`.
//!
//! Sub-commands: TEST=0, SUBSCRIBE=1, EVENT=2 (server->client only),
//! READ_FORMATS_ALL=3, READ_FORMATS=4, SAVE_FORMATS=5.

use crate::protocol::{FormatEncoding, FormatInfo};

pub const SUBCOMMAND_TEST: u32 = 0;
pub const SUBCOMMAND_SUBSCRIBE: u32 = 1;
pub const SUBCOMMAND_READ_FORMATS_ALL: u32 = 3;
pub const SUBCOMMAND_READ_FORMATS: u32 = 4;
pub const SUBCOMMAND_SAVE_FORMATS: u32 = 5;

pub const VERSION: u32 = 1;

/// Device type tags as they appear on the wire; only sinks are supported,
/// matching the grounding source's `type != DEVICE_TYPE_SINK` rejection.
pub const DEVICE_TYPE_SINK: u32 = 0;
pub const DEVICE_TYPE_SOURCE: u32 = 1;

/// Where a SAVE_FORMATS request should write the codec list: a card's port
/// route if the sink has an active port on a card, or the node's own props
/// otherwise.
///
/// This resolves the route-vs-node-props precedence: whenever the sink
/// belongs to a card with an active port, the route is authoritative and
/// node props are left untouched, mirroring `set_card_codecs` being
/// preferred over `set_node_codecs` in the grounding source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    CardRoute { card_id: u32, port_index: u32 },
    NodeProps,
}

/// Decides where a codec save should land, given what's known about the
/// sink's device.
pub fn save_target(card_id: Option<u32>, active_port: Option<u32>) -> SaveTarget {
    match (card_id, active_port) {
        (Some(card_id), Some(port_index)) => SaveTarget::CardRoute { card_id, port_index },
        _ => SaveTarget::NodeProps,
    }
}

/// Extracts the set of IEC 61937 passthrough codec encodings a client
/// offered, dropping PCM/Any entries (which carry no passthrough codec id).
pub fn iec958_codecs(formats: &[FormatInfo]) -> Vec<FormatEncoding> {
    formats
        .iter()
        .map(|f| f.encoding)
        .filter(|e| !matches!(e, FormatEncoding::Any | FormatEncoding::Pcm))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_wins_when_card_and_port_are_both_known() {
        let target = save_target(Some(3), Some(1));
        assert_eq!(
            target,
            SaveTarget::CardRoute {
                card_id: 3,
                port_index: 1
            }
        );
    }

    #[test]
    fn node_props_used_when_no_card() {
        assert_eq!(save_target(None, None), SaveTarget::NodeProps);
    }

    #[test]
    fn node_props_used_when_card_known_but_no_active_port() {
        assert_eq!(save_target(Some(3), None), SaveTarget::NodeProps);
    }

    #[test]
    fn pcm_and_any_formats_are_excluded_from_codec_list() {
        let formats = vec![
            FormatInfo::new(FormatEncoding::Pcm),
            FormatInfo::new(FormatEncoding::Ac3Iec61937),
            FormatInfo::new(FormatEncoding::Any),
        ];
        assert_eq!(iec958_codecs(&formats), vec![FormatEncoding::Ac3Iec61937]);
    }
}
