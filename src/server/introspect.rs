//! Builds the wire introspection types (`SinkInfo`, `SourceInfo`, ...) from
//! the [`Mirror`] snapshot and the per-session stream state.
//!
//! The wire types themselves, and their version-gated field layout, already
//! live in `protocol::command::*_info`; this module is only the
//! server-side logic that populates them, per the design's introspection
//! emitter component.

use std::ffi::CString;

use crate::protocol::{
    ChannelMap, ChannelVolume, ClientInfo, Direction, PortAvailable, PortInfo, SampleSpec,
    ServerInfo, SinkFlags, SinkInfo, SinkState, SourceFlags, SourceInfo,
};
use crate::server::mirror::{Mirror, ObjectClass};

fn cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

fn prop_cstring(obj: &crate::server::mirror::MirrorObject, key: &str) -> Option<CString> {
    obj.prop(key).map(cstring)
}

/// Builds a [`SinkInfo`] for every tracked sink, in mirror (id) order.
pub fn list_sinks(mirror: &Mirror) -> Vec<SinkInfo> {
    mirror.objects_of_class(ObjectClass::Sink).map(sink_info).collect()
}

/// Builds a [`SinkInfo`] for a single sink, by index.
pub fn sink_by_index(mirror: &Mirror, index: u32) -> Option<SinkInfo> {
    mirror.get(index).filter(|o| o.class == ObjectClass::Sink).map(sink_info)
}

/// Builds a [`SinkInfo`] for a single sink, by `node.name`.
pub fn sink_by_name(mirror: &Mirror, name: &str) -> Option<SinkInfo> {
    mirror.find_by_name(ObjectClass::Sink, name).map(sink_info)
}

fn sink_info(obj: &crate::server::mirror::MirrorObject) -> SinkInfo {
    SinkInfo {
        index: obj.id,
        name: prop_cstring(obj, "node.name").unwrap_or_else(|| cstring("sink")),
        description: prop_cstring(obj, "node.description"),
        props: Default::default(),
        state: SinkState::Running,
        sample_spec: SampleSpec::default(),
        channel_map: ChannelMap::stereo(),
        owner_module_index: None,
        cvolume: ChannelVolume::norm(2),
        muted: false,
        monitor_source_index: None,
        monitor_source_name: None,
        flags: SinkFlags::empty(),
        actual_latency: 0,
        configured_latency: 0,
        driver: None,
        base_volume: Default::default(),
        volume_steps: None,
        card_index: obj.prop("card.index").and_then(|s| s.parse().ok()),
        ports: vec![PortInfo {
            name: cstring("default"),
            description: None,
            dir: Direction::Output,
            priority: 0,
            available: PortAvailable::Yes,
        }],
        active_port: 0,
        formats: vec![],
    }
}

/// Builds a [`SourceInfo`] for every tracked source, in mirror (id) order.
pub fn list_sources(mirror: &Mirror) -> Vec<SourceInfo> {
    mirror.objects_of_class(ObjectClass::Source).map(source_info).collect()
}

pub fn source_by_index(mirror: &Mirror, index: u32) -> Option<SourceInfo> {
    mirror.get(index).filter(|o| o.class == ObjectClass::Source).map(source_info)
}

pub fn source_by_name(mirror: &Mirror, name: &str) -> Option<SourceInfo> {
    mirror.find_by_name(ObjectClass::Source, name).map(source_info)
}

fn source_info(obj: &crate::server::mirror::MirrorObject) -> SourceInfo {
    SourceInfo {
        index: obj.id,
        name: prop_cstring(obj, "node.name").unwrap_or_else(|| cstring("source")),
        description: prop_cstring(obj, "node.description"),
        props: Default::default(),
        sample_spec: SampleSpec::default(),
        channel_map: ChannelMap::mono(),
        owner_module_index: None,
        cvolume: ChannelVolume::norm(1),
        muted: false,
        monitor_of_sink_index: None,
        monitor_of_sink_name: None,
        flags: SourceFlags::empty(),
        actual_latency: 0,
        configured_latency: 0,
        driver: None,
        base_volume: Default::default(),
        volume_steps: None,
        card_index: obj.prop("card.index").and_then(|s| s.parse().ok()),
        ports: vec![],
        active_port: 0,
        formats: vec![],
        state: Default::default(),
    }
}

/// Builds a [`ClientInfo`] for every tracked client, in mirror (id) order.
pub fn list_clients(mirror: &Mirror) -> Vec<ClientInfo> {
    mirror.objects_of_class(ObjectClass::Client).map(client_info).collect()
}

pub fn client_by_index(mirror: &Mirror, index: u32) -> Option<ClientInfo> {
    mirror.get(index).filter(|o| o.class == ObjectClass::Client).map(client_info)
}

fn client_info(obj: &crate::server::mirror::MirrorObject) -> ClientInfo {
    ClientInfo {
        index: obj.id,
        name: prop_cstring(obj, "application.name").unwrap_or_else(|| cstring("client")),
        owner_module_index: None,
        driver: prop_cstring(obj, "application.process.binary"),
        props: Default::default(),
    }
}

/// Builds the `GET_SERVER_INFO` reply from the mirror's metadata shim.
pub fn server_info(mirror: &Mirror, server_name: &str, server_version: &str) -> ServerInfo {
    ServerInfo {
        server_name: Some(cstring(server_name)),
        server_version: Some(cstring(server_version)),
        user_name: std::env::var("USER").ok().map(|s| cstring(&s)),
        host_name: std::env::var("HOSTNAME").ok().map(|s| cstring(&s)),
        sample_spec: SampleSpec::default(),
        cookie: 0,
        default_sink_name: mirror.default_sink_name().map(cstring),
        default_source_name: mirror.default_source_name().map(cstring),
        channel_map: ChannelMap::stereo(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::engine::{EngineEvent, EngineObject};
    use std::ffi::CString as StdCString;

    fn prop(k: &str, v: &str) -> (StdCString, StdCString) {
        (StdCString::new(k).unwrap(), StdCString::new(v).unwrap())
    }

    #[test]
    fn sink_info_picks_up_name_and_description() {
        let mut mirror = Mirror::new();
        mirror.apply_events(vec![EngineEvent::ObjectAdded(EngineObject {
            id: 5,
            parent_id: None,
            props: vec![
                prop("media.class", "Audio/Sink"),
                prop("node.name", "alsa_output.pci-0000"),
                prop("node.description", "Built-in Audio"),
            ],
        })]);

        let info = sink_by_index(&mirror, 5).unwrap();
        assert_eq!(info.name.to_str().unwrap(), "alsa_output.pci-0000");
        assert_eq!(info.description.unwrap().to_str().unwrap(), "Built-in Audio");
    }

    #[test]
    fn missing_sink_returns_none() {
        let mirror = Mirror::new();
        assert!(sink_by_index(&mirror, 1).is_none());
    }

    #[test]
    fn server_info_reflects_mirror_defaults() {
        let mut mirror = Mirror::new();
        mirror.set_default_sink_name(Some("alsa_output.1".into()));

        let info = server_info(&mirror, "test-server", "1.0");
        assert_eq!(
            info.default_sink_name.unwrap().to_str().unwrap(),
            "alsa_output.1"
        );
    }

    #[test]
    fn list_sinks_is_in_id_order() {
        let mut mirror = Mirror::new();
        mirror.apply_events(vec![
            EngineEvent::ObjectAdded(EngineObject {
                id: 2,
                parent_id: None,
                props: vec![prop("media.class", "Audio/Sink"), prop("node.name", "b")],
            }),
            EngineEvent::ObjectAdded(EngineObject {
                id: 1,
                parent_id: None,
                props: vec![prop("media.class", "Audio/Sink"), prop("node.name", "a")],
            }),
        ]);

        let names: Vec<_> = list_sinks(&mirror)
            .into_iter()
            .map(|s| s.name.to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
