use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::Keycode;

/// Raw JSON shape of a mapping file: layout name to a map of stringified
/// keycode to semantic name. The same shape KeyPane ships as
/// `keyCodeMappings.json`.
#[derive(Debug, Deserialize)]
struct MappingFile(HashMap<String, HashMap<String, String>>);

/// Translates raw keycodes to stable lowercase key names.
///
/// Pure and infallible: codes absent from the table translate to the
/// placeholder `key(<code>)` so unknown hardware never surfaces as an error.
/// An empty `Keymap` (the `Default`) simply translates every code to its
/// placeholder.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    names: HashMap<Keycode, String>,
}

impl Keymap {
    /// Build a keymap directly from code/name pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Keycode, String)>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(c, n)| (c, n.to_lowercase()))
                .collect(),
        }
    }

    /// Parse a mapping file and select one layout by name.
    ///
    /// Returns `None` when the JSON does not parse or the layout is missing.
    /// An entry whose key is not a valid keycode integer is skipped with a
    /// warning; the rest of the layout still loads. Callers decide the
    /// fallback; the translator itself never fails (see [`Keymap::name`]).
    pub fn from_json(json: &str, layout: &str) -> Option<Self> {
        let file: MappingFile = serde_json::from_str(json).ok()?;
        let table = file.0.get(layout)?;
        let mut names = HashMap::with_capacity(table.len());
        for (code, name) in table {
            match code.parse::<Keycode>() {
                Ok(c) => {
                    names.insert(c, name.to_lowercase());
                }
                Err(_) => warn!(layout, key = %code, "skipping_non_numeric_keymap_entry"),
            }
        }
        Some(Self { names })
    }

    /// Translate a keycode to its semantic name, or `key(<code>)` when the
    /// table has no entry.
    pub fn name(&self, code: Keycode) -> String {
        match self.names.get(&code) {
            Some(n) => n.clone(),
            None => format!("key({})", code),
        }
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no codes are mapped (everything falls back).
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
