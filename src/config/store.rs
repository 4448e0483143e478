//! Path-addressed mutation over the in-memory configuration document
//!
//! The store holds the current [`AppConfig`], applies edits addressed by
//! path segments (`["semi", "xSpeed"]`), notifies subscribers, and hands
//! every accepted edit to the persistence bridge. Known fields are assigned
//! through typed setters; unknown paths land in the extension maps, with
//! missing intermediate objects materialized on the way down.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::bridge::PersistenceBridge;
use crate::config::schema::{AppConfig, ProfileName, ProfileSettings, VisualSettings};

/// Why an edit was refused. The document is left untouched in every case.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The edit arrived with no path segments at all
    #[error("empty config path")]
    EmptyPath,

    /// A known field was handed a value of the wrong JSON type
    #[error("invalid value for '{path}': expected {expected}")]
    InvalidValue { path: String, expected: &'static str },

    /// The path tried to descend through a value that is not an object
    #[error("cannot descend into '{key}': not an object")]
    NotAnObject { key: String },
}

/// Handle returned by [`ConfigStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    callback: Box<dyn FnMut(&AppConfig)>,
}

/// Single shared handle the panel holds for reading and editing config
///
/// All mutation goes through [`set_path`](Self::set_path): the edit is
/// applied, subscribers observe the new document, and only then is the
/// document handed to the host for persistence. Construction seeds the
/// built-in defaults; [`hydrate`](Self::hydrate) pulls the persisted state
/// over them once.
pub struct ConfigStore {
    config: AppConfig,
    bridge: PersistenceBridge,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    loaded: bool,
}

impl ConfigStore {
    pub fn new(bridge: PersistenceBridge) -> Self {
        Self {
            config: AppConfig::default(),
            bridge,
            subscribers: Vec::new(),
            next_subscription: 0,
            loaded: false,
        }
    }

    /// Current document (read-only view)
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether the one-shot load of the persisted document has completed
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Merge the persisted document over the defaults
    ///
    /// Issued once: the panel renders from defaults first and swaps in the
    /// merged state when this completes. Later calls are no-ops.
    pub fn hydrate(&mut self) {
        if self.loaded {
            debug!("Config already hydrated, ignoring");
            return;
        }
        self.config = self.bridge.fetch_merged();
        self.loaded = true;
        info!(profile = %self.config.profile, "Hydrated config from host");
        self.notify_subscribers();
    }

    /// Assign `value` at `path` and establish the result as current
    ///
    /// Subscribers observe the new document before it is submitted for
    /// persistence, so the panel never paints behind a pending write.
    pub fn set_path(&mut self, path: &[&str], value: Value) -> Result<&AppConfig, StoreError> {
        apply_path(&mut self.config, path, value)?;
        debug!(path = ?path, "Applied config edit");
        self.notify_subscribers();
        self.bridge.submit(&self.config);
        Ok(&self.config)
    }

    /// Repoint the `profile` selector at one of the known profiles
    pub fn activate(&mut self, name: ProfileName) -> Result<&AppConfig, StoreError> {
        info!(profile = %name, "Switching active profile");
        self.set_path(&["profile"], Value::String(name.as_str().to_owned()))
    }

    /// Profile currently selected, falling back to `legit` for unknown names
    pub fn active_profile(&self) -> ProfileName {
        self.config.active_profile()
    }

    /// Live view of the active profile's settings
    pub fn active_settings(&self) -> &ProfileSettings {
        self.config.active_settings()
    }

    /// Register for change notifications; fires on every accepted edit
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&AppConfig) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Ask the host to close the panel window
    pub fn request_close(&self) {
        self.bridge.request_close();
    }

    /// Ask the host to minimize the panel window
    pub fn request_minimize(&self) {
        self.bridge.request_minimize();
    }

    fn notify_subscribers(&mut self) {
        let config = &self.config;
        for subscriber in &mut self.subscribers {
            (subscriber.callback)(config);
        }
    }
}

fn apply_path(config: &mut AppConfig, path: &[&str], value: Value) -> Result<(), StoreError> {
    match path {
        [] => Err(StoreError::EmptyPath),
        [key] => assign_top_level(config, key, value),
        [head, rest @ ..] => match ProfileName::parse(head) {
            Some(name) => assign_profile_path(config.profile_settings_mut(name), head, rest, value),
            None => match *head {
                "visuals" => assign_visuals_path(&mut config.visuals, rest, value),
                // Scalar top-level fields never turn into objects
                "profile" | "debugMode" => Err(StoreError::NotAnObject {
                    key: (*head).to_owned(),
                }),
                _ => set_in_map(&mut config.extra, path, value),
            },
        },
    }
}

fn assign_top_level(config: &mut AppConfig, key: &str, value: Value) -> Result<(), StoreError> {
    match key {
        "profile" => match value {
            Value::String(name) => {
                config.profile = name;
                Ok(())
            }
            _ => Err(StoreError::InvalidValue {
                path: key.to_owned(),
                expected: "a profile name string",
            }),
        },
        "debugMode" => {
            config.debug_mode = flag_at(key.to_owned(), &value)?;
            Ok(())
        }
        "visuals" => {
            config.visuals = section_from_value(key, value)?;
            Ok(())
        }
        _ => match ProfileName::parse(key) {
            Some(name) => {
                *config.profile_settings_mut(name) = section_from_value(key, value)?;
                Ok(())
            }
            None => {
                config.extra.insert(key.to_owned(), value);
                Ok(())
            }
        },
    }
}

const PROFILE_FIELDS: [&str; 10] = [
    "xSpeed",
    "ySpeed",
    "xFov",
    "yFov",
    "targetOffset",
    "deadzone",
    "humanize",
    "patternVariation",
    "rcs",
    "always_active",
];

fn assign_profile_path(
    settings: &mut ProfileSettings,
    section: &str,
    path: &[&str],
    value: Value,
) -> Result<(), StoreError> {
    match path {
        [] => Err(StoreError::EmptyPath),
        [field] => assign_profile_field(settings, section, field, value),
        [field, ..] if PROFILE_FIELDS.contains(field) => Err(StoreError::NotAnObject {
            key: format!("{section}.{field}"),
        }),
        _ => set_in_map(&mut settings.extra, path, value),
    }
}

fn assign_profile_field(
    settings: &mut ProfileSettings,
    section: &str,
    field: &str,
    value: Value,
) -> Result<(), StoreError> {
    match field {
        "xSpeed" => settings.x_speed = Some(number_at(format!("{section}.{field}"), &value)?),
        "ySpeed" => settings.y_speed = Some(number_at(format!("{section}.{field}"), &value)?),
        "xFov" => settings.x_fov = Some(extent_at(format!("{section}.{field}"), &value)?),
        "yFov" => settings.y_fov = Some(extent_at(format!("{section}.{field}"), &value)?),
        "targetOffset" => {
            settings.target_offset = Some(number_at(format!("{section}.{field}"), &value)?)
        }
        "deadzone" => settings.deadzone = Some(number_at(format!("{section}.{field}"), &value)?),
        "humanize" => settings.humanize = Some(flag_at(format!("{section}.{field}"), &value)?),
        "patternVariation" => {
            settings.pattern_variation = Some(number_at(format!("{section}.{field}"), &value)?)
        }
        "rcs" => settings.rcs = Some(flag_at(format!("{section}.{field}"), &value)?),
        "always_active" => {
            settings.always_active = Some(flag_at(format!("{section}.{field}"), &value)?)
        }
        _ => {
            settings.extra.insert(field.to_owned(), value);
        }
    }
    Ok(())
}

const VISUAL_FIELDS: [&str; 3] = ["enabled", "draw_fov", "draw_target"];

fn assign_visuals_path(
    visuals: &mut VisualSettings,
    path: &[&str],
    value: Value,
) -> Result<(), StoreError> {
    match path {
        [] => Err(StoreError::EmptyPath),
        [field] => assign_visuals_field(visuals, field, value),
        [field, ..] if VISUAL_FIELDS.contains(field) => Err(StoreError::NotAnObject {
            key: format!("visuals.{field}"),
        }),
        _ => set_in_map(&mut visuals.extra, path, value),
    }
}

fn assign_visuals_field(
    visuals: &mut VisualSettings,
    field: &str,
    value: Value,
) -> Result<(), StoreError> {
    match field {
        "enabled" => visuals.enabled = Some(flag_at(format!("visuals.{field}"), &value)?),
        "draw_fov" => visuals.draw_fov = Some(flag_at(format!("visuals.{field}"), &value)?),
        "draw_target" => visuals.draw_target = Some(flag_at(format!("visuals.{field}"), &value)?),
        _ => {
            visuals.extra.insert(field.to_owned(), value);
        }
    }
    Ok(())
}

/// Write into free-form extension data, materializing missing intermediate
/// objects on the way down. Explicit `null` counts as missing.
fn set_in_map(map: &mut Map<String, Value>, path: &[&str], value: Value) -> Result<(), StoreError> {
    match path {
        [] => Err(StoreError::EmptyPath),
        [leaf] => {
            map.insert((*leaf).to_owned(), value);
            Ok(())
        }
        [head, rest @ ..] => {
            let slot = map
                .entry((*head).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            match slot {
                Value::Object(inner) => set_in_map(inner, rest, value),
                _ => Err(StoreError::NotAnObject {
                    key: (*head).to_owned(),
                }),
            }
        }
    }
}

fn section_from_value<T: serde::de::DeserializeOwned>(
    key: &str,
    value: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|_| StoreError::InvalidValue {
        path: key.to_owned(),
        expected: "a settings object",
    })
}

fn number_at(path: String, value: &Value) -> Result<f64, StoreError> {
    value.as_f64().ok_or(StoreError::InvalidValue {
        path,
        expected: "a number",
    })
}

fn flag_at(path: String, value: &Value) -> Result<bool, StoreError> {
    value.as_bool().ok_or(StoreError::InvalidValue {
        path,
        expected: "a boolean",
    })
}

/// Pixel extents accept integer or float notation (sliders emit both)
fn extent_at(path: String, value: &Value) -> Result<u32, StoreError> {
    let extent = match value {
        Value::Number(number) => {
            if let Some(n) = number.as_u64() {
                u32::try_from(n).ok()
            } else {
                number
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            }
        }
        _ => None,
    };
    extent.ok_or(StoreError::InvalidValue {
        path,
        expected: "a non-negative whole number",
    })
}
