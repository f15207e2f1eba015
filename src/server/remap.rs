//! Bidirectional property key/value remapping between the engine's internal
//! keys and PulseAudio's introspection keys.
//!
//! Grounded directly on the original source's `remap.c`: a fixed table of
//! `(internal_key, pulse_key)` pairs, with one child table (`media.role`)
//! that additionally remaps enum *values*.

/// `(internal, pulse)` key pairs, in the same order as `props_key_map` in
/// the grounding source.
pub const PROPS_KEY_MAP: &[(&str, &str)] = &[
    ("device.bus-path", "device.bus_path"),
    ("device.sysfs.path", "sysfs.path"),
    ("device.form-factor", "device.form_factor"),
    ("device.icon-name", "device.icon_name"),
    ("device.intended-roles", "device.intended_roles"),
    ("node.description", "device.description"),
    ("media.icon-name", "media.icon_name"),
    ("application.icon-name", "application.icon_name"),
    ("application.process.machine-id", "application.process.machine_id"),
    ("application.process.session-id", "application.process.session_id"),
    ("media.role", "media.role"),
    ("pipe.filename", "device.string"),
];

/// `(internal, pulse)` value pairs for the `media.role` key, as in
/// `media_role_map`.
pub const MEDIA_ROLE_MAP: &[(&str, &str)] = &[
    ("Movie", "video"),
    ("Music", "music"),
    ("Game", "game"),
    ("Notification", "event"),
    ("Communication", "phone"),
    ("Movie", "animation"),
    ("Production", "production"),
    ("Accessibility", "a11y"),
    ("Test", "test"),
];

/// Translates an internal `(key, value)` pair to its PulseAudio-facing form.
///
/// Keys absent from [`PROPS_KEY_MAP`] pass through unchanged, matching the
/// grounding source's fallback of leaving unknown properties untranslated.
pub fn to_pulse_key(internal_key: &str) -> &str {
    PROPS_KEY_MAP
        .iter()
        .find(|(pw, _)| *pw == internal_key)
        .map(|(_, pa)| *pa)
        .unwrap_or(internal_key)
}

/// The inverse of [`to_pulse_key`]: translates a PulseAudio-facing key back
/// to its internal form.
pub fn to_internal_key(pulse_key: &str) -> &str {
    PROPS_KEY_MAP
        .iter()
        .find(|(_, pa)| *pa == pulse_key)
        .map(|(pw, _)| *pw)
        .unwrap_or(pulse_key)
}

/// Translates an internal `media.role` value (e.g. `"Movie"`) to its
/// PulseAudio value (e.g. `"video"`).
pub fn to_pulse_media_role(internal_value: &str) -> &str {
    MEDIA_ROLE_MAP
        .iter()
        .find(|(pw, _)| *pw == internal_value)
        .map(|(_, pa)| *pa)
        .unwrap_or(internal_value)
}

/// Translates a PulseAudio `media.role` value back to its internal value.
///
/// Since `"Movie"` maps to both `"video"` and `"animation"` on the internal
/// side, this is not a true inverse; `"video"` is preferred, matching table
/// order (first match wins, same as `str_map_find`).
pub fn to_internal_media_role(pulse_value: &str) -> &str {
    MEDIA_ROLE_MAP
        .iter()
        .find(|(_, pa)| *pa == pulse_value)
        .map(|(pw, _)| *pw)
        .unwrap_or(pulse_value)
}

/// Remaps a full property list from internal to PulseAudio-facing keys
/// (and, for `media.role`, values too).
pub fn remap_props_outbound(props: &[(String, String)]) -> Vec<(String, String)> {
    props
        .iter()
        .map(|(k, v)| {
            let key = to_pulse_key(k).to_string();
            let value = if k == "media.role" {
                to_pulse_media_role(v).to_string()
            } else {
                v.clone()
            };
            (key, value)
        })
        .collect()
}

/// The inverse of [`remap_props_outbound`], applied to client-supplied
/// properties before they reach the mirror.
pub fn remap_props_inbound(props: &[(String, String)]) -> Vec<(String, String)> {
    props
        .iter()
        .map(|(k, v)| {
            let key = to_internal_key(k).to_string();
            let value = if key == "media.role" {
                to_internal_media_role(v).to_string()
            } else {
                v.clone()
            };
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_is_remapped() {
        assert_eq!(to_pulse_key("node.description"), "device.description");
        assert_eq!(to_internal_key("device.description"), "node.description");
    }

    #[test]
    fn unknown_key_passes_through() {
        assert_eq!(to_pulse_key("some.unrelated.key"), "some.unrelated.key");
    }

    #[test]
    fn media_role_values_remap() {
        assert_eq!(to_pulse_media_role("Music"), "music");
        assert_eq!(to_internal_media_role("music"), "Music");
    }

    #[test]
    fn media_role_first_match_wins_for_ambiguous_inverse() {
        // Both "video" and "animation" map to "Movie" internally.
        assert_eq!(to_pulse_media_role("Movie"), "video");
    }

    #[test]
    fn outbound_remap_covers_key_and_value() {
        let props = vec![("media.role".to_string(), "Game".to_string())];
        let remapped = remap_props_outbound(&props);
        assert_eq!(remapped, vec![("media.role".to_string(), "game".to_string())]);
    }
}
