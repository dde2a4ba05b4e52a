//! Settings and key-code mapping tables for KeyPane.
//!
//! Two files live under `~/.keypane/`: `settings.ron` (behaviour switches,
//! all optional) and `keymap.json` (layout name to keycode/name table). A
//! missing settings file is not an error; the defaults apply.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

mod error;

use keycode::Keymap;
use serde::{Deserialize, Serialize};

pub use error::Error;

/// User-tunable behaviour switches.
///
/// Every field has a default so a partial (or absent) settings file works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Double-tap toggles the panel instead of tap-then-hold showing it.
    pub toggle_mode: bool,
    /// Keep the panel open across ordinary key presses.
    pub keep_panel_open: bool,
    /// Use the permission-free event source instead of the event tap.
    pub privacy_mode: bool,
    /// Layout name selected from the keymap file.
    pub layout: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toggle_mode: false,
            keep_panel_open: false,
            privacy_mode: false,
            layout: "qwertz".to_string(),
        }
    }
}

/// Determine the preferred user settings path (`~/.keypane/settings.ron`).
pub fn default_settings_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".keypane");
    p.push("settings.ron");
    p
}

/// Determine the preferred user keymap path (`~/.keypane/keymap.json`).
pub fn default_keymap_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".keypane");
    p.push("keymap.json");
    p
}

/// Load settings from `path`, or from the default location when `path` is
/// `None`.
///
/// A file that does not exist yields `Settings::default()`; only an
/// unreadable or malformed file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, Error> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_settings_path(),
    };
    if !path.exists() {
        return Ok(Settings::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| Error::Read {
        path: Some(path.clone()),
        message: e.to_string(),
    })?;
    parse_settings(&text).map_err(|mut e| {
        if let Error::Parse { path: p, .. } = &mut e {
            *p = Some(path.clone());
        }
        e
    })
}

/// Parse a RON settings document.
pub fn parse_settings(text: &str) -> Result<Settings, Error> {
    ron::from_str(text).map_err(|e| Error::Parse {
        path: None,
        message: e.to_string(),
    })
}

/// Load the keymap table at `path` (default location when `None`) and select
/// `layout` from it.
///
/// Callers typically degrade to `Keymap::default()` on error: the translator
/// keeps working with `key(<code>)` placeholders.
pub fn load_keymap(path: Option<&Path>, layout: &str) -> Result<Keymap, Error> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_keymap_path(),
    };
    let text = fs::read_to_string(&path).map_err(|e| Error::Read {
        path: Some(path.clone()),
        message: e.to_string(),
    })?;
    match Keymap::from_json(&text, layout) {
        Some(km) => Ok(km),
        None => {
            // Distinguish a bad file from a missing layout for the message.
            if serde_json::from_str::<serde_json::Value>(&text).is_err() {
                Err(Error::Parse {
                    path: Some(path),
                    message: "keymap file is not valid JSON".to_string(),
                })
            } else {
                Err(Error::UnknownLayout {
                    path,
                    layout: layout.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_settings_absent() {
        let s = Settings::default();
        assert!(!s.toggle_mode);
        assert!(!s.keep_panel_open);
        assert!(!s.privacy_mode);
        assert_eq!(s.layout, "qwertz");
    }

    #[test]
    fn parses_full_settings() {
        let s = parse_settings(
            "(toggle_mode: true, keep_panel_open: true, privacy_mode: true, layout: \"qwerty\")",
        )
        .unwrap();
        assert!(s.toggle_mode);
        assert!(s.keep_panel_open);
        assert!(s.privacy_mode);
        assert_eq!(s.layout, "qwerty");
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let s = parse_settings("(toggle_mode: true)").unwrap();
        assert!(s.toggle_mode);
        assert!(!s.keep_panel_open);
        assert_eq!(s.layout, "qwertz");
    }

    #[test]
    fn malformed_settings_is_parse_error() {
        let err = parse_settings("(toggle_mode: maybe)").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(!err.pretty().is_empty());
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let s = load_settings(Some(Path::new("/nonexistent/keypane/settings.ron"))).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn keymap_round_trip_and_unknown_layout() {
        let dir = std::env::temp_dir().join("keypane-config-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("keymap.json");
        fs::write(&path, r#"{"qwertz": {"0": "A", "53": "Escape"}}"#).unwrap();

        let km = load_keymap(Some(&path), "qwertz").unwrap();
        assert_eq!(km.name(0), "a");
        assert_eq!(km.name(53), "escape");

        let err = load_keymap(Some(&path), "dvorak").unwrap_err();
        assert!(matches!(err, Error::UnknownLayout { .. }));
    }

    #[test]
    fn keymap_bad_json_is_parse_error() {
        let dir = std::env::temp_dir().join("keypane-config-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        fs::write(&path, "not json at all").unwrap();
        let err = load_keymap(Some(&path), "qwertz").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
