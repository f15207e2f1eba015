//! `module-stream-restore` extension: per-stream saved volume/mute/target,
//! keyed by a `restore.stream.<class>.<selector>:<value>` metadata key and
//! stored as a small ad hoc JSON object, same shape as the grounding
//! source's `ext-stream-restore.c`.
//!
//! Sub-commands, in wire order: TEST=0, READ=1, WRITE=2, DELETE=3,
//! SUBSCRIBE=4, EVENT=5 (server->client only, no handler needed here).

use crate::server::remap::{to_internal_media_role, to_pulse_media_role};

pub const SUBCOMMAND_TEST: u32 = 0;
pub const SUBCOMMAND_READ: u32 = 1;
pub const SUBCOMMAND_WRITE: u32 = 2;
pub const SUBCOMMAND_DELETE: u32 = 3;
pub const SUBCOMMAND_SUBSCRIBE: u32 = 4;

/// This extension's reported protocol version, echoed back by TEST.
pub const VERSION: u32 = 1;

/// A single saved stream entry: the PulseAudio-facing volume/mute/target
/// triple for one `restore.stream.*` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreEntry {
    pub mute: bool,
    pub volumes: Vec<f32>,
    pub channels: Vec<String>,
    pub target_node: Option<String>,
}

/// Serializes an entry to the compact JSON object stored as the metadata
/// value, matching the field order the grounding source writes.
pub fn format_entry(entry: &RestoreEntry) -> String {
    let mut out = String::from("{ ");
    out.push_str(&format!("\"mute\": {}", entry.mute));

    if !entry.volumes.is_empty() {
        out.push_str(", \"volumes\": [ ");
        out.push_str(
            &entry
                .volumes
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        );
        out.push_str(" ]");
    }

    if !entry.channels.is_empty() {
        out.push_str(", \"channels\": [ ");
        out.push_str(
            &entry
                .channels
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", "),
        );
        out.push_str(" ]");
    }

    if let Some(node) = &entry.target_node {
        out.push_str(&format!(", \"target-node\": \"{}\"", node));
    }

    out.push_str(" }");
    out
}

/// Parses an entry back out of its stored JSON-object form.
///
/// This is a small ad hoc parser for exactly the shape [`format_entry`]
/// produces, not a general JSON reader — same scope the grounding source's
/// `spa_json` calls are put to.
pub fn parse_entry(s: &str) -> Option<RestoreEntry> {
    let inner = s.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut entry = RestoreEntry::default();

    for field in split_top_level(inner) {
        let (key, value) = field.split_once(':')?;
        let key = key.trim().trim_matches('"');
        let value = value.trim();

        match key {
            "mute" => entry.mute = value == "true",
            "volumes" => {
                entry.volumes = strip_brackets(value)
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
            }
            "channels" => {
                entry.channels = strip_brackets(value)
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().trim_matches('"').to_string())
                    .collect();
            }
            "target-node" => {
                entry.target_node = Some(value.trim_matches('"').to_string());
            }
            _ => {}
        }
    }

    Some(entry)
}

fn strip_brackets(s: &str) -> &str {
    s.trim().trim_start_matches('[').trim_end_matches(']')
}

fn split_top_level(s: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                fields.push(s[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        fields.push(s[start..].to_string());
    }
    fields
}

/// Translates a `pactl`-style restore name (e.g.
/// `sink-input-by-media-role:music`) into the internal metadata key used to
/// store it (e.g. `restore.stream.Output/Audio.media.role:Music`).
pub fn key_from_name(name: &str) -> Option<String> {
    let media_class = if let Some(rest) = name.strip_prefix("sink-input-") {
        ("Output/Audio", rest)
    } else if let Some(rest) = name.strip_prefix("source-output-") {
        ("Input/Audio", rest)
    } else {
        return None;
    };
    let (media_class, rest) = media_class;

    let (select, value) = if let Some(v) = rest.strip_prefix("by-media-role:") {
        ("media.role", to_internal_media_role(v).to_string())
    } else if let Some(v) = rest.strip_prefix("by-application-id:") {
        ("application.id", v.to_string())
    } else if let Some(v) = rest.strip_prefix("by-application-name:") {
        ("application.name", v.to_string())
    } else if let Some(v) = rest.strip_prefix("by-media-name:") {
        ("media.name", v.to_string())
    } else {
        return None;
    };

    Some(format!("restore.stream.{}.{}:{}", media_class, select, value))
}

/// The inverse of [`key_from_name`].
pub fn key_to_name(key: &str) -> Option<String> {
    let (kind, rest) = if let Some(r) = key.strip_prefix("restore.stream.Output/Audio.") {
        ("sink-input", r)
    } else if let Some(r) = key.strip_prefix("restore.stream.Input/Audio.") {
        ("source-output", r)
    } else {
        return None;
    };

    let (select, value) = if let Some(v) = rest.strip_prefix("media.role:") {
        ("media-role", to_pulse_media_role(v).to_string())
    } else if let Some(v) = rest.strip_prefix("application.id:") {
        ("application-id", v.to_string())
    } else if let Some(v) = rest.strip_prefix("application.name:") {
        ("application-name", v.to_string())
    } else if let Some(v) = rest.strip_prefix("media.name:") {
        ("media-name", v.to_string())
    } else {
        return None;
    };

    Some(format!("{}-by-{}:{}", kind, select, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_name_round_trips_through_key_to_name() {
        let name = "sink-input-by-media-role:music";
        let key = key_from_name(name).unwrap();
        assert_eq!(key, "restore.stream.Output/Audio.media.role:Music");
        assert_eq!(key_to_name(&key).unwrap(), name);
    }

    #[test]
    fn key_from_name_rejects_unknown_prefix() {
        assert_eq!(key_from_name("not-a-restore-key"), None);
    }

    #[test]
    fn format_then_parse_round_trips() {
        let entry = RestoreEntry {
            mute: true,
            volumes: vec![0.5, 0.75],
            channels: vec!["FL".into(), "FR".into()],
            target_node: Some("alsa_output.1".into()),
        };

        let formatted = format_entry(&entry);
        let parsed = parse_entry(&formatted).unwrap();
        assert_eq!(parsed.mute, entry.mute);
        assert_eq!(parsed.volumes, entry.volumes);
        assert_eq!(parsed.channels, entry.channels);
        assert_eq!(parsed.target_node, entry.target_node);
    }

    #[test]
    fn entry_without_target_node_omits_the_field() {
        let entry = RestoreEntry {
            mute: false,
            volumes: vec![],
            channels: vec![],
            target_node: None,
        };
        let formatted = format_entry(&entry);
        assert!(!formatted.contains("target-node"));

        let parsed = parse_entry(&formatted).unwrap();
        assert_eq!(parsed.target_node, None);
    }

    #[test]
    fn application_id_key_round_trips() {
        let name = "source-output-by-application-id:org.foo.Bar";
        let key = key_from_name(name).unwrap();
        assert_eq!(key_to_name(&key).unwrap(), name);
    }
}
