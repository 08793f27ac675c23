//! Named display setting presets persisted as one JSON document.

use crate::error::PresetError;
use crate::hotkey::Combo;
use crate::settings::{ChannelScale, DisplaySettings};

use log::{debug, error, info, warn};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A named bundle of display settings plus an optional trigger combo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    /// Unique name.
    pub name: String,
    /// Stored settings.
    pub settings: DisplaySettings,
    /// Normalized combo, or empty when no hotkey is bound.
    pub hotkey: String,
}

// =============================================================================
// Document format
// =============================================================================

/// One entry of the `presets` object; the name is the object key.
#[derive(Serialize, Deserialize)]
struct PresetRecord {
    #[serde(flatten)]
    settings: DisplaySettings,
    #[serde(default)]
    hotkey: String,
}

/// Presets in document order. Serialized as a JSON object keyed by name.
#[derive(Default)]
struct OrderedPresets(Vec<Preset>);

impl Serialize for OrderedPresets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for preset in &self.0 {
            let record = PresetRecord {
                settings: preset.settings,
                hotkey: preset.hotkey.clone(),
            };
            map.serialize_entry(&preset.name, &record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderedPresets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = OrderedPresets;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of preset names to settings")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut presets: Vec<Preset> = Vec::new();
                while let Some((name, record)) = access.next_entry::<String, PresetRecord>()? {
                    let preset = Preset {
                        name,
                        settings: record.settings,
                        hotkey: record.hotkey,
                    };
                    match presets.iter_mut().find(|p| p.name == preset.name) {
                        Some(existing) => *existing = preset,
                        None => presets.push(preset),
                    }
                }
                Ok(OrderedPresets(presets))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[derive(Default, Serialize, Deserialize)]
struct PresetDocument {
    #[serde(default)]
    current_preset: Option<String>,
    #[serde(default)]
    presets: OrderedPresets,
}

// =============================================================================
// Store
// =============================================================================

/// Ordered collection of presets with a "current" pointer.
///
/// Insertion order is the cycle order for [`switch_to_next`](Self::switch_to_next)
/// and survives restarts. Every mutation rewrites the whole document; if
/// that write fails the in-memory state stays authoritative and the error
/// is returned.
///
/// The current pointer is only moved by [`load`](Self::load) and is
/// cleared when its preset is deleted, so it always names an existing
/// preset or nothing.
pub struct PresetStore {
    path: PathBuf,
    presets: Vec<Preset>,
    current: Option<String>,
}

impl PresetStore {
    /// Open the document at `path`.
    ///
    /// A missing document is seeded with the built-in presets and written.
    /// An unreadable or corrupt one is logged and replaced in memory by
    /// the built-in presets.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            path,
            presets: Vec::new(),
            current: None,
        };

        if !store.path.exists() {
            store.seed_defaults();
            match store.persist() {
                Ok(()) => info!("created default presets at {}", store.path.display()),
                Err(e) => error!("failed to write default presets: {}", e),
            }
            return store;
        }

        match Self::read_document(&store.path) {
            Ok(doc) => {
                store.presets = doc.presets.0;
                store.current = doc.current_preset.filter(|name| {
                    let exists = store.presets.iter().any(|p| &p.name == name);
                    if !exists {
                        warn!("current preset '{}' no longer exists, clearing", name);
                    }
                    exists
                });
                info!("loaded {} presets", store.presets.len());
            }
            Err(e) => {
                error!("failed to load presets: {}", e);
                store.seed_defaults();
            }
        }
        store
    }

    fn read_document(path: &Path) -> Result<PresetDocument, PresetError> {
        let raw = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn seed_defaults(&mut self) {
        let preset = |name: &str, brightness, contrast, rgb: (i32, i32, i32)| Preset {
            name: name.to_string(),
            settings: DisplaySettings::new(
                brightness,
                contrast,
                0,
                ChannelScale::new(rgb.0, rgb.1, rgb.2),
            ),
            hotkey: String::new(),
        };
        self.presets = vec![
            preset("Default", 100, 100, (255, 255, 255)),
            preset("Night", 80, 90, (255, 200, 150)),
            preset("Reading", 110, 105, (255, 245, 230)),
        ];
        self.current = Some("Default".to_string());
    }

    fn persist(&self) -> Result<(), PresetError> {
        let io_err = |source| PresetError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let doc = PresetDocument {
            current_preset: self.current.clone(),
            presets: OrderedPresets(self.presets.clone()),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(&self.path, json).map_err(io_err)?;
        debug!("presets saved to {}", self.path.display());
        Ok(())
    }

    fn persist_logged(&self) -> Result<(), PresetError> {
        self.persist().inspect_err(|e| error!("failed to save presets: {}", e))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.name == name)
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save settings under `name`, keeping any hotkey already bound to it.
    ///
    /// An existing preset keeps its position in the cycle order; a new one
    /// is appended.
    pub fn save(&mut self, name: &str, settings: &DisplaySettings) -> Result<(), PresetError> {
        let hotkey = self
            .position(name)
            .map(|i| self.presets[i].hotkey.clone())
            .unwrap_or_default();
        self.upsert(name, settings, hotkey)
    }

    /// Save settings under `name` together with a new hotkey.
    ///
    /// An empty `hotkey` removes the binding.
    pub fn save_with_hotkey(
        &mut self,
        name: &str,
        settings: &DisplaySettings,
        hotkey: &str,
    ) -> Result<(), PresetError> {
        let hotkey = normalize_hotkey(hotkey)?;
        self.upsert(name, settings, hotkey)
    }

    fn upsert(
        &mut self,
        name: &str,
        settings: &DisplaySettings,
        hotkey: String,
    ) -> Result<(), PresetError> {
        if name.trim().is_empty() {
            return Err(PresetError::EmptyName);
        }
        let preset = Preset {
            name: name.to_string(),
            settings: settings.clamped(),
            hotkey,
        };
        match self.position(name) {
            Some(i) => self.presets[i] = preset,
            None => self.presets.push(preset),
        }
        self.persist_logged()?;
        info!("preset saved: {}", name);
        Ok(())
    }

    /// Settings of `name`, which also becomes the current preset.
    ///
    /// Returns `None` and leaves the current preset alone if no such preset exists.
    pub fn load(&mut self, name: &str) -> Option<DisplaySettings> {
        let Some(i) = self.position(name) else {
            warn!("preset not found: {}", name);
            return None;
        };
        self.current = Some(name.to_string());
        if let Err(e) = self.persist() {
            warn!("failed to save current preset, keeping it in memory: {}", e);
        }
        info!("preset loaded: {}", name);
        Some(self.presets[i].settings)
    }

    /// Remove a preset, clearing the current pointer if it named it.
    pub fn delete(&mut self, name: &str) -> Result<(), PresetError> {
        let Some(i) = self.position(name) else {
            warn!("preset not found: {}", name);
            return Err(PresetError::NotFound(name.to_string()));
        };
        self.presets.remove(i);
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        self.persist_logged()?;
        info!("preset deleted: {}", name);
        Ok(())
    }

    /// Preset names in cycle order.
    pub fn names(&self) -> Vec<String> {
        self.presets.iter().map(|p| p.name.clone()).collect()
    }

    /// All presets in cycle order.
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// A preset by name.
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Name of the current preset.
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Load the preset after the current one, wrapping around.
    ///
    /// Starts at the first preset when there is no current one. Returns
    /// `None` only when the store is empty.
    pub fn switch_to_next(&mut self) -> Option<DisplaySettings> {
        if self.presets.is_empty() {
            return None;
        }
        let next = match self.current.as_deref().and_then(|name| self.position(name)) {
            Some(i) => (i + 1) % self.presets.len(),
            None => 0,
        };
        let name = self.presets[next].name.clone();
        self.load(&name)
    }

    /// Bind a combo to a preset. An empty combo removes the binding.
    pub fn set_hotkey(&mut self, name: &str, combo: &str) -> Result<(), PresetError> {
        let Some(i) = self.position(name) else {
            warn!("preset not found: {}", name);
            return Err(PresetError::NotFound(name.to_string()));
        };
        let combo = normalize_hotkey(combo)?;
        self.presets[i].hotkey = combo;
        self.persist_logged()?;
        info!("hotkey for preset '{}' set to '{}'", name, self.presets[i].hotkey);
        Ok(())
    }

    /// The combo bound to a preset, if the preset exists and has one.
    pub fn hotkey(&self, name: &str) -> Option<&str> {
        self.get(name)
            .map(|p| p.hotkey.as_str())
            .filter(|combo| !combo.is_empty())
    }

    /// `(name, combo)` for every preset with a hotkey, in cycle order.
    pub fn all_hotkeys(&self) -> Vec<(String, String)> {
        self.presets
            .iter()
            .filter(|p| !p.hotkey.is_empty())
            .map(|p| (p.name.clone(), p.hotkey.clone()))
            .collect()
    }
}

fn normalize_hotkey(combo: &str) -> Result<String, PresetError> {
    if combo.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(combo.parse::<Combo>()?.to_string())
}
