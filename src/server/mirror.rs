//! Live snapshot of engine objects (sinks/sources/streams/cards/modules/
//! clients/metadata), projected onto PulseAudio's introspection model.
//!
//! Grounded on the manager/registry mirror described in the design: the
//! mirror subscribes to [`crate::server::engine::Engine::poll_events`],
//! classifies each object by its `media.class` (or equivalent) property, and
//! fans out NEW/CHANGE/REMOVE events to subscribed sessions. Property
//! remapping is handled by [`super::remap`]; this module only owns the
//! classification and storage.

use std::collections::HashMap;

use crate::protocol::SubscriptionEventType;
use crate::server::engine::{EngineEvent, EngineObject};

/// The PulseAudio object class a mirror entry was classified as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    /// `Audio/Sink`.
    Sink,
    /// `Audio/Source`.
    Source,
    /// `Stream/Output/Audio` (a sink input).
    SinkInput,
    /// `Stream/Input/Audio` (a source output).
    SourceOutput,
    /// Has a `device.api`.
    Card,
    /// A loaded module.
    Module,
    /// A connected client.
    Client,
}

/// A single tracked engine object, with its last-known properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorObject {
    /// Stable id, shared with the engine's own id for this object.
    pub id: u32,
    /// The id of the owning object (e.g. a stream's sink/source), if any.
    pub parent_id: Option<u32>,
    /// Classification used to route subscription events and introspection.
    pub class: ObjectClass,
    /// Raw (internal-key) properties as last reported by the engine.
    pub props: Vec<(String, String)>,
    /// Whether this object has been reported to subscribers via NEW yet.
    pub initialised: bool,
}

impl MirrorObject {
    /// Looks up a single internal-key property.
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// A subscription-worthy change to the mirror, to be fanned out to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorChange {
    /// The id of the changed object.
    pub id: u32,
    /// Its class, used to match against a client's subscription mask.
    pub class: ObjectClass,
    /// What happened.
    pub kind: SubscriptionEventType,
}

/// A saved stream-restore / device-restore entry, stored under the
/// "routes" metadata object described in the design (§4.E "Metadata shim").
#[derive(Debug, Default)]
struct Metadata {
    default_sink: Option<String>,
    default_source: Option<String>,
    routes: HashMap<String, String>,
}

/// The server's local projection of the engine's registry.
#[derive(Debug, Default)]
pub struct Mirror {
    objects: HashMap<u32, MirrorObject>,
    metadata: Metadata,
}

fn classify(props: &[(String, String)]) -> Option<ObjectClass> {
    let get = |key: &str| props.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

    match get("media.class") {
        Some("Audio/Sink") => return Some(ObjectClass::Sink),
        Some("Audio/Source") => return Some(ObjectClass::Source),
        Some("Stream/Output/Audio") => return Some(ObjectClass::SinkInput),
        Some("Stream/Input/Audio") => return Some(ObjectClass::SourceOutput),
        _ => {}
    }

    if get("device.api").is_some() {
        return Some(ObjectClass::Card);
    }
    if get("module.name").is_some() {
        return Some(ObjectClass::Module);
    }
    if get("application.name").is_some() {
        return Some(ObjectClass::Client);
    }

    None
}

fn engine_props(obj: &EngineObject) -> Vec<(String, String)> {
    obj.props
        .iter()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

impl Mirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a batch of engine events, returning the subscription-worthy
    /// changes they produced, in order.
    pub fn apply_events(&mut self, events: Vec<EngineEvent>) -> Vec<MirrorChange> {
        events.into_iter().filter_map(|e| self.apply_event(e)).collect()
    }

    fn apply_event(&mut self, event: EngineEvent) -> Option<MirrorChange> {
        match event {
            EngineEvent::ObjectAdded(obj) => {
                let props = engine_props(&obj);
                let class = classify(&props)?;

                self.objects.insert(
                    obj.id,
                    MirrorObject {
                        id: obj.id,
                        parent_id: obj.parent_id,
                        class,
                        props,
                        initialised: true,
                    },
                );

                Some(MirrorChange {
                    id: obj.id,
                    class,
                    kind: SubscriptionEventType::New,
                })
            }
            EngineEvent::ObjectChanged(obj) => {
                let props = engine_props(&obj);
                let class = classify(&props)?;
                let entry = self.objects.get_mut(&obj.id)?;
                entry.props = props;
                entry.parent_id = obj.parent_id;

                Some(MirrorChange {
                    id: obj.id,
                    class,
                    kind: SubscriptionEventType::Changed,
                })
            }
            EngineEvent::ObjectRemoved(id) => {
                let removed = self.objects.remove(&id)?;
                Some(MirrorChange {
                    id,
                    class: removed.class,
                    kind: SubscriptionEventType::Removed,
                })
            }
        }
    }

    /// Looks up a single object by id.
    pub fn get(&self, id: u32) -> Option<&MirrorObject> {
        self.objects.get(&id)
    }

    /// Looks up a single object by class and `node.name`/`object.name` property.
    pub fn find_by_name(&self, class: ObjectClass, name: &str) -> Option<&MirrorObject> {
        self.objects_of_class(class).find(|o| o.prop("node.name") == Some(name))
    }

    /// Iterates all objects of a given class, in id order.
    pub fn objects_of_class(&self, class: ObjectClass) -> impl Iterator<Item = &MirrorObject> {
        let mut ids: Vec<_> = self
            .objects
            .values()
            .filter(move |o| o.class == class)
            .collect();
        ids.sort_by_key(|o| o.id);
        ids.into_iter()
    }

    /// Returns the ids of streams linked to the given sink/source, i.e. the
    /// objects whose `parent_id` is `device_id`.
    pub fn linked_streams(&self, device_id: u32) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .objects
            .values()
            .filter(|o| o.parent_id == Some(device_id))
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The name of the current default sink, if one has been set.
    pub fn default_sink_name(&self) -> Option<&str> {
        self.metadata.default_sink.as_deref()
    }

    /// The name of the current default source, if one has been set.
    pub fn default_source_name(&self) -> Option<&str> {
        self.metadata.default_source.as_deref()
    }

    /// Sets the default sink name.
    pub fn set_default_sink_name(&mut self, name: Option<String>) {
        self.metadata.default_sink = name;
    }

    /// Sets the default source name.
    pub fn set_default_source_name(&mut self, name: Option<String>) {
        self.metadata.default_source = name;
    }

    /// Reads a stream-restore/device-restore route entry by its metadata key.
    pub fn route(&self, key: &str) -> Option<&str> {
        self.metadata.routes.get(key).map(String::as_str)
    }

    /// Writes a route entry.
    pub fn set_route(&mut self, key: String, value: String) {
        self.metadata.routes.insert(key, value);
    }

    /// Removes a route entry. No-op if absent.
    pub fn remove_route(&mut self, key: &str) {
        self.metadata.routes.remove(key);
    }

    /// Iterates all route keys with the given prefix, e.g. `"restore.stream."`.
    pub fn routes_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.metadata
            .routes
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn prop(k: &str, v: &str) -> (CString, CString) {
        (CString::new(k).unwrap(), CString::new(v).unwrap())
    }

    #[test]
    fn sink_added_emits_new_and_is_queryable() {
        let mut mirror = Mirror::new();
        let changes = mirror.apply_events(vec![EngineEvent::ObjectAdded(EngineObject {
            id: 7,
            parent_id: None,
            props: vec![
                prop("media.class", "Audio/Sink"),
                prop("node.name", "alsa_output.1"),
            ],
        })]);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].class, ObjectClass::Sink);
        assert_eq!(changes[0].kind, SubscriptionEventType::New);

        let sink = mirror.find_by_name(ObjectClass::Sink, "alsa_output.1").unwrap();
        assert_eq!(sink.id, 7);
    }

    #[test]
    fn removal_emits_remove_with_original_class() {
        let mut mirror = Mirror::new();
        mirror.apply_events(vec![EngineEvent::ObjectAdded(EngineObject {
            id: 1,
            parent_id: None,
            props: vec![prop("media.class", "Audio/Source")],
        })]);

        let changes = mirror.apply_events(vec![EngineEvent::ObjectRemoved(1)]);
        assert_eq!(changes[0].class, ObjectClass::Source);
        assert_eq!(changes[0].kind, SubscriptionEventType::Removed);
        assert!(mirror.get(1).is_none());
    }

    #[test]
    fn unclassifiable_object_is_ignored() {
        let mut mirror = Mirror::new();
        let changes = mirror.apply_events(vec![EngineEvent::ObjectAdded(EngineObject {
            id: 1,
            parent_id: None,
            props: vec![prop("some.other.key", "value")],
        })]);

        assert!(changes.is_empty());
        assert!(mirror.get(1).is_none());
    }

    #[test]
    fn linked_streams_uses_parent_id() {
        let mut mirror = Mirror::new();
        mirror.apply_events(vec![
            EngineEvent::ObjectAdded(EngineObject {
                id: 1,
                parent_id: None,
                props: vec![prop("media.class", "Audio/Sink")],
            }),
            EngineEvent::ObjectAdded(EngineObject {
                id: 2,
                parent_id: Some(1),
                props: vec![prop("media.class", "Stream/Output/Audio")],
            }),
        ]);

        assert_eq!(mirror.linked_streams(1), vec![2]);
    }

    #[test]
    fn route_round_trip() {
        let mut mirror = Mirror::new();
        mirror.set_route("restore.stream.Output/Audio.media.role:Music".into(), "{}".into());
        assert_eq!(
            mirror.route("restore.stream.Output/Audio.media.role:Music"),
            Some("{}")
        );

        mirror.remove_route("restore.stream.Output/Audio.media.role:Music");
        assert_eq!(mirror.route("restore.stream.Output/Audio.media.role:Music"), None);
    }
}
