//! Configuration document shape and built-in defaults
//!
//! The document mirrors what the host process persists to disk: a top-level
//! `profile` selector, a `debugMode` flag, one settings object per named
//! profile, and a `visuals` section. Field names follow the on-disk JSON
//! (camelCase where the file uses it), so serialization is the wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The fixed set of profile names the panel knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Legit,
    Semi,
    Rage,
}

impl ProfileName {
    /// All known profiles, in display order
    pub const ALL: [ProfileName; 3] = [ProfileName::Legit, ProfileName::Semi, ProfileName::Rage];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileName::Legit => "legit",
            ProfileName::Semi => "semi",
            ProfileName::Rage => "rage",
        }
    }

    /// Parse a profile name as it appears in the document's `profile` field
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "legit" => Some(ProfileName::Legit),
            "semi" => Some(ProfileName::Semi),
            "rage" => Some(ProfileName::Rage),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning parameters for one profile
///
/// Every field is optional: a persisted section replaces the built-in one
/// wholesale, so fields absent from disk stay absent in memory and are not
/// written back. Only the defaults factory guarantees a fully populated
/// section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    #[serde(rename = "xSpeed", skip_serializing_if = "Option::is_none")]
    pub x_speed: Option<f64>,
    #[serde(rename = "ySpeed", skip_serializing_if = "Option::is_none")]
    pub y_speed: Option<f64>,
    /// Horizontal scan extent in pixels
    #[serde(rename = "xFov", skip_serializing_if = "Option::is_none")]
    pub x_fov: Option<u32>,
    /// Vertical scan extent in pixels
    #[serde(rename = "yFov", skip_serializing_if = "Option::is_none")]
    pub y_fov: Option<u32>,
    #[serde(rename = "targetOffset", skip_serializing_if = "Option::is_none")]
    pub target_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadzone: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humanize: Option<bool>,
    /// Jitter magnitude, only consumed downstream when `humanize` is on
    #[serde(rename = "patternVariation", skip_serializing_if = "Option::is_none")]
    pub pattern_variation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_active: Option<bool>,

    /// Fields this build does not know about, re-emitted verbatim on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileSettings {
    /// Built-in settings for the named profile
    pub fn defaults(name: ProfileName) -> Self {
        match name {
            ProfileName::Legit => base_profile(),
            ProfileName::Semi => semi_profile(),
            ProfileName::Rage => rage_profile(),
        }
    }

    /// Copy with absent fields filled from the built-in defaults for `name`
    ///
    /// Read-side convenience for widgets that need a value behind every
    /// control; the stored document keeps its absences.
    pub fn resolved(&self, name: ProfileName) -> ProfileSettings {
        let defaults = Self::defaults(name);
        ProfileSettings {
            x_speed: self.x_speed.or(defaults.x_speed),
            y_speed: self.y_speed.or(defaults.y_speed),
            x_fov: self.x_fov.or(defaults.x_fov),
            y_fov: self.y_fov.or(defaults.y_fov),
            target_offset: self.target_offset.or(defaults.target_offset),
            deadzone: self.deadzone.or(defaults.deadzone),
            humanize: self.humanize.or(defaults.humanize),
            pattern_variation: self.pattern_variation.or(defaults.pattern_variation),
            rcs: self.rcs.or(defaults.rcs),
            always_active: self.always_active.or(defaults.always_active),
            extra: self.extra.clone(),
        }
    }
}

/// Overlay toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_fov: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_target: Option<bool>,

    /// Unrecognized toggles, re-emitted verbatim on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VisualSettings {
    /// Copy with absent toggles defaulted to on
    pub fn resolved(&self) -> VisualSettings {
        VisualSettings {
            enabled: self.enabled.or(Some(true)),
            draw_fov: self.draw_fov.or(Some(true)),
            draw_target: self.draw_target.or(Some(true)),
            extra: self.extra.clone(),
        }
    }
}

/// Top-level configuration document
///
/// `profile` is a plain string on the wire; unknown names are structurally
/// legal and resolved through [`AppConfig::active_profile`], which falls back
/// to `legit`. Top-level keys the panel does not know about (the host's
/// capture and serial settings live beside ours) are carried in `extra` so a
/// save never strips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub profile: String,
    #[serde(rename = "debugMode")]
    pub debug_mode: bool,
    pub legit: ProfileSettings,
    pub semi: ProfileSettings,
    pub rage: ProfileSettings,
    pub visuals: VisualSettings,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    /// Profile currently selected by the `profile` field
    ///
    /// Unknown names fall back to `legit`, matching how the host resolves
    /// an empty or unrecognized selector.
    pub fn active_profile(&self) -> ProfileName {
        ProfileName::parse(&self.profile).unwrap_or(ProfileName::Legit)
    }

    /// Live view of the active profile's settings (not a snapshot)
    pub fn active_settings(&self) -> &ProfileSettings {
        self.profile_settings(self.active_profile())
    }

    pub fn profile_settings(&self, name: ProfileName) -> &ProfileSettings {
        match name {
            ProfileName::Legit => &self.legit,
            ProfileName::Semi => &self.semi,
            ProfileName::Rage => &self.rage,
        }
    }

    pub fn profile_settings_mut(&mut self, name: ProfileName) -> &mut ProfileSettings {
        match name {
            ProfileName::Legit => &mut self.legit,
            ProfileName::Semi => &mut self.semi,
            ProfileName::Rage => &mut self.rage,
        }
    }
}

// Default value functions

fn base_profile() -> ProfileSettings {
    ProfileSettings {
        x_speed: Some(0.15),
        y_speed: Some(0.15),
        x_fov: Some(60),
        y_fov: Some(45),
        target_offset: Some(8.0),
        deadzone: Some(4.0),
        humanize: Some(true),
        pattern_variation: Some(2.0),
        rcs: Some(true),
        always_active: Some(false),
        extra: Map::new(),
    }
}

fn semi_profile() -> ProfileSettings {
    ProfileSettings {
        x_speed: Some(0.4),
        y_speed: Some(0.4),
        x_fov: Some(100),
        y_fov: Some(80),
        deadzone: Some(2.0),
        pattern_variation: Some(1.0),
        rcs: Some(false),
        ..base_profile()
    }
}

fn rage_profile() -> ProfileSettings {
    ProfileSettings {
        x_speed: Some(0.8),
        y_speed: Some(0.8),
        x_fov: Some(200),
        y_fov: Some(200),
        deadzone: Some(0.0),
        humanize: Some(false),
        pattern_variation: Some(0.0),
        rcs: Some(false),
        always_active: Some(true),
        ..base_profile()
    }
}

fn default_visuals() -> VisualSettings {
    VisualSettings {
        enabled: Some(true),
        draw_fov: Some(true),
        draw_target: Some(true),
        extra: Map::new(),
    }
}

impl Default for AppConfig {
    /// Fresh default document; each call yields an independent copy
    fn default() -> Self {
        Self {
            profile: ProfileName::Legit.as_str().to_owned(),
            debug_mode: false,
            legit: base_profile(),
            semi: semi_profile(),
            rage: rage_profile(),
            visuals: default_visuals(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_profiles_have_distinct_tuning() {
        let config = AppConfig::default();

        assert_eq!(config.legit.x_speed, Some(0.15));
        assert_eq!(config.legit.x_fov, Some(60));
        assert_eq!(config.legit.y_fov, Some(45));
        assert_eq!(config.legit.deadzone, Some(4.0));
        assert_eq!(config.legit.rcs, Some(true));
        assert_eq!(config.legit.always_active, Some(false));

        assert_eq!(config.semi.x_speed, Some(0.4));
        assert_eq!(config.semi.x_fov, Some(100));
        assert_eq!(config.semi.y_fov, Some(80));
        assert_eq!(config.semi.pattern_variation, Some(1.0));
        assert_eq!(config.semi.rcs, Some(false));
        // Inherited from the base profile
        assert_eq!(config.semi.target_offset, Some(8.0));
        assert_eq!(config.semi.humanize, Some(true));

        assert_eq!(config.rage.x_speed, Some(0.8));
        assert_eq!(config.rage.x_fov, Some(200));
        assert_eq!(config.rage.deadzone, Some(0.0));
        assert_eq!(config.rage.humanize, Some(false));
        assert_eq!(config.rage.always_active, Some(true));

        assert_eq!(config.profile, "legit");
        assert_eq!(config.debug_mode, false);
        assert_eq!(config.visuals.enabled, Some(true));
        assert_eq!(config.visuals.draw_fov, Some(true));
        assert_eq!(config.visuals.draw_target, Some(true));
    }

    #[test]
    fn test_default_documents_are_independent() {
        let mut first = AppConfig::default();
        first.legit.x_speed = Some(9.0);
        first.visuals.enabled = Some(false);

        let second = AppConfig::default();
        assert_eq!(second.legit.x_speed, Some(0.15));
        assert_eq!(second.visuals.enabled, Some(true));
    }

    #[test]
    fn test_serialization_uses_wire_field_names() {
        let value = serde_json::to_value(AppConfig::default()).unwrap();

        assert!(value.get("debugMode").is_some());
        assert!(value.get("profile").is_some());
        let legit = value.get("legit").unwrap();
        assert!(legit.get("xSpeed").is_some());
        assert!(legit.get("targetOffset").is_some());
        assert!(legit.get("patternVariation").is_some());
        assert!(legit.get("always_active").is_some());
        let visuals = value.get("visuals").unwrap();
        assert!(visuals.get("draw_fov").is_some());
        assert!(visuals.get("draw_target").is_some());
    }

    #[test]
    fn test_partial_section_decodes_with_absent_fields() {
        let settings: ProfileSettings = serde_json::from_value(json!({ "xSpeed": 9.0 })).unwrap();

        assert_eq!(settings.x_speed, Some(9.0));
        assert_eq!(settings.y_speed, None);
        assert_eq!(settings.rcs, None);
        assert!(settings.extra.is_empty());

        // Absent fields must not reappear on the wire
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value, json!({ "xSpeed": 9.0 }));
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let document = json!({
            "profile": "semi",
            "debugMode": true,
            "legit": { "xSpeed": 0.2, "customCurve": [1, 2, 3] },
            "semi": {},
            "rage": {},
            "visuals": { "enabled": false, "draw_crosshair": true },
            "comPort": "COM3",
            "baudRate": 115200,
            "hsvLower": [40, 120, 120]
        });

        let config: AppConfig = serde_json::from_value(document.clone()).unwrap();
        assert_eq!(config.extra.get("comPort"), Some(&json!("COM3")));
        assert_eq!(config.extra.get("baudRate"), Some(&json!(115200)));
        assert_eq!(config.legit.extra.get("customCurve"), Some(&json!([1, 2, 3])));
        assert_eq!(config.visuals.extra.get("draw_crosshair"), Some(&json!(true)));

        let round_tripped = serde_json::to_value(&config).unwrap();
        assert_eq!(round_tripped, document);
    }

    #[test]
    fn test_resolved_fills_absent_fields_from_profile_defaults() {
        let partial: ProfileSettings = serde_json::from_value(json!({ "xSpeed": 9.0 })).unwrap();

        let resolved = partial.resolved(ProfileName::Rage);
        assert_eq!(resolved.x_speed, Some(9.0));
        assert_eq!(resolved.y_speed, Some(0.8));
        assert_eq!(resolved.always_active, Some(true));

        // The partial section itself keeps its absences
        assert_eq!(partial.y_speed, None);
    }

    #[test]
    fn test_resolved_visual_toggles_default_to_on() {
        let visuals: VisualSettings = serde_json::from_value(json!({ "enabled": false })).unwrap();

        let resolved = visuals.resolved();
        assert_eq!(resolved.enabled, Some(false));
        assert_eq!(resolved.draw_fov, Some(true));
        assert_eq!(resolved.draw_target, Some(true));
    }

    #[test]
    fn test_active_profile_follows_selector() {
        let mut config = AppConfig::default();
        assert_eq!(config.active_profile(), ProfileName::Legit);

        config.profile = "rage".to_owned();
        assert_eq!(config.active_profile(), ProfileName::Rage);
        assert_eq!(config.active_settings().x_speed, Some(0.8));
    }

    #[test]
    fn test_active_profile_unknown_name_falls_back_to_legit() {
        let mut config = AppConfig::default();
        config.profile = "turbo".to_owned();

        assert_eq!(config.active_profile(), ProfileName::Legit);
        assert_eq!(config.active_settings().x_speed, Some(0.15));
    }

    #[test]
    fn test_profile_name_parse_round_trip() {
        for name in ProfileName::ALL {
            assert_eq!(ProfileName::parse(name.as_str()), Some(name));
        }
        assert_eq!(ProfileName::parse("Legit"), None);
        assert_eq!(ProfileName::parse(""), None);
    }
}
