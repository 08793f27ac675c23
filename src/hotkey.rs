//! Global hotkey combos and the router that maps them to actions.

use crate::error::HotkeyError;

use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

// =============================================================================
// Combo
// =============================================================================

/// A modifier key. Ordering is the canonical order in normalized combos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    /// Control.
    Ctrl,
    /// Alt.
    Alt,
    /// Shift.
    Shift,
    /// Windows / Meta / Super.
    Win,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "ctrl" => Some(Self::Ctrl),
            "alt" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "win" | "meta" => Some(Self::Win),
            _ => None,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Win => "win",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ctrl => "Ctrl",
            Self::Alt => "Alt",
            Self::Shift => "Shift",
            Self::Win => "Win",
        }
    }
}

/// The terminal key of a combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character, stored lowercase.
    Char(char),
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
}

impl Key {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "up" => return Some(Self::Up),
            "down" => return Some(Self::Down),
            "left" => return Some(Self::Left),
            "right" => return Some(Self::Right),
            _ => {}
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() && !c.is_whitespace() => Some(Self::Char(c)),
            _ => None,
        }
    }
}

/// A normalized keyboard shortcut: one or more modifiers plus one key.
///
/// Parsing is case-insensitive and tolerant of spaces around tokens;
/// `meta` is an alias of `win`. The normalized form lists modifiers in
/// `ctrl`, `alt`, `shift`, `win` order, lowercase, joined by `+`:
///
/// ```
/// use gammatool_core::Combo;
///
/// let combo: Combo = "Shift + CTRL + N".parse().unwrap();
/// assert_eq!(combo.to_string(), "ctrl+shift+n");
/// assert_eq!(combo.label(), "Ctrl+Shift+N");
/// assert!("n".parse::<Combo>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combo {
    modifiers: Vec<Modifier>,
    key: Key,
}

impl Combo {
    /// Modifiers in canonical order.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Whether the combo holds a modifier.
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// The terminal key.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Display form, e.g. `Ctrl+Alt+Up`.
    pub fn label(&self) -> String {
        let key = match self.key {
            Key::Char(c) => c.to_uppercase().collect(),
            Key::Up => "Up".to_string(),
            Key::Down => "Down".to_string(),
            Key::Left => "Left".to_string(),
            Key::Right => "Right".to_string(),
        };
        self.modifiers
            .iter()
            .map(|m| m.label().to_string())
            .chain(std::iter::once(key))
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl FromStr for Combo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(HotkeyError::Empty);
        }

        let tokens: Vec<String> = raw.split('+').map(|t| t.trim().to_lowercase()).collect();
        let Some((key_token, modifier_tokens)) = tokens.split_last() else {
            return Err(HotkeyError::Empty);
        };

        if key_token.is_empty() {
            return Err(HotkeyError::EmptyKey(raw.to_string()));
        }
        if modifier_tokens.is_empty() {
            return Err(HotkeyError::MissingModifier(raw.to_string()));
        }

        let mut modifiers = Vec::with_capacity(modifier_tokens.len());
        for token in modifier_tokens {
            let modifier =
                Modifier::parse(token).ok_or_else(|| HotkeyError::UnknownModifier(token.clone()))?;
            if modifiers.contains(&modifier) {
                return Err(HotkeyError::DuplicateModifier(modifier.token().to_string()));
            }
            modifiers.push(modifier);
        }
        modifiers.sort();

        let key =
            Key::parse(key_token).ok_or_else(|| HotkeyError::UnsupportedKey(key_token.clone()))?;

        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.token())?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

/// A hotkey press delivered by the OS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyEvent {
    /// The combo that fired.
    pub combo: Combo,
}

/// OS global hotkey primitive.
///
/// Implementations deliver presses as [`HotkeyEvent`]s on the channel they
/// were created with, from whatever thread the OS uses.
pub trait HotkeyBackend {
    /// Install a global listener for the combo.
    fn register(&mut self, combo: &Combo) -> Result<(), HotkeyError>;

    /// Remove the listener for the combo.
    fn unregister(&mut self, combo: &Combo) -> Result<(), HotkeyError>;
}

// =============================================================================
// Router
// =============================================================================

/// Maps combos to caller-defined actions.
///
/// The router never runs actions itself. The owning thread pulls events
/// with [`next_action`](Self::next_action) and performs the returned
/// action, so all display work stays on one thread no matter which
/// thread the OS delivers presses on.
pub struct HotkeyRouter<B: HotkeyBackend, A> {
    backend: B,
    events: Receiver<HotkeyEvent>,
    bindings: HashMap<Combo, A>,
    listening: bool,
}

impl<B: HotkeyBackend, A> HotkeyRouter<B, A> {
    /// Create a router over a backend and the channel it delivers on.
    pub fn new(backend: B, events: Receiver<HotkeyEvent>) -> Self {
        Self {
            backend,
            events,
            bindings: HashMap::new(),
            listening: false,
        }
    }

    /// Bind a combo string to an action, replacing any existing binding.
    ///
    /// Returns the normalized combo.
    ///
    /// # Errors
    ///
    /// Parse errors are returned before the backend is called. A
    /// [`HotkeyError::Rejected`] from the backend leaves the combo unbound.
    pub fn register(&mut self, combo: &str, action: A) -> Result<Combo, HotkeyError> {
        let combo: Combo = combo.parse()?;
        self.register_combo(combo.clone(), action)?;
        Ok(combo)
    }

    /// Bind an already parsed combo.
    pub fn register_combo(&mut self, combo: Combo, action: A) -> Result<(), HotkeyError> {
        if self.bindings.contains_key(&combo) {
            let _ = self.unregister_combo(&combo);
        }

        if let Err(e) = self.backend.register(&combo) {
            warn!("failed to register hotkey {}: {}", combo, e);
            return Err(e);
        }

        info!("hotkey registered: {}", combo);
        self.bindings.insert(combo, action);
        Ok(())
    }

    /// Remove the binding for a combo string.
    ///
    /// # Errors
    ///
    /// [`HotkeyError::NotRegistered`] if the combo has no binding, or the
    /// backend's error if removing the OS listener failed (the binding is
    /// dropped either way).
    pub fn unregister(&mut self, combo: &str) -> Result<(), HotkeyError> {
        let combo: Combo = combo.parse()?;
        self.unregister_combo(&combo)
    }

    /// Remove the binding for a parsed combo.
    pub fn unregister_combo(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        if self.bindings.remove(combo).is_none() {
            return Err(HotkeyError::NotRegistered(combo.to_string()));
        }
        match self.backend.unregister(combo) {
            Ok(()) => {
                info!("hotkey unregistered: {}", combo);
                Ok(())
            }
            Err(e) => {
                warn!("failed to unregister hotkey {}: {}", combo, e);
                Err(e)
            }
        }
    }

    /// Remove every binding. Returns how many OS listeners were removed cleanly.
    pub fn unregister_all(&mut self) -> usize {
        let combos: Vec<Combo> = self.bindings.keys().cloned().collect();
        let count = combos
            .iter()
            .filter(|combo| self.unregister_combo(combo).is_ok())
            .count();
        info!("unregistered {} hotkeys", count);
        count
    }

    /// Start delivering actions.
    pub fn start_listening(&mut self) {
        self.listening = true;
        info!("hotkey listening started");
    }

    /// Stop delivering actions and remove every binding.
    ///
    /// Safe to call repeatedly or with nothing registered.
    pub fn stop_listening(&mut self) {
        self.listening = false;
        if !self.bindings.is_empty() {
            self.unregister_all();
        }
        info!("hotkey listening stopped");
    }

    /// Whether actions are being delivered.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether a combo string has a binding.
    pub fn is_registered(&self, combo: &str) -> bool {
        combo
            .parse::<Combo>()
            .is_ok_and(|combo| self.bindings.contains_key(&combo))
    }

    /// The action bound to a combo string.
    pub fn binding(&self, combo: &str) -> Option<&A> {
        let combo: Combo = combo.parse().ok()?;
        self.bindings.get(&combo)
    }

    /// All bound combos.
    pub fn bindings(&self) -> impl Iterator<Item = &Combo> {
        self.bindings.keys()
    }

    /// Number of bound combos.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Access the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The action for an event, if listening and the combo is bound.
    pub fn resolve(&self, event: &HotkeyEvent) -> Option<&A> {
        if !self.listening {
            trace!("ignoring {} while not listening", event.combo);
            return None;
        }
        let action = self.bindings.get(&event.combo);
        if action.is_none() {
            debug!("no binding for {}", event.combo);
        }
        action
    }
}

impl<B: HotkeyBackend, A: Clone> HotkeyRouter<B, A> {
    /// Wait up to `timeout` for a press and return its action.
    ///
    /// Presses with no binding, or arriving while not listening, are
    /// dropped. Returns `None` on timeout or when the backend hung up.
    pub fn next_action(&self, timeout: Duration) -> Option<A> {
        loop {
            match self.events.recv_timeout(timeout) {
                Ok(event) => {
                    if let Some(action) = self.resolve(&event) {
                        return Some(action.clone());
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("hotkey event channel closed");
                    return None;
                }
            }
        }
    }

    /// Drain pending presses without blocking.
    pub fn pending_actions(&self) -> Vec<A> {
        self.events
            .try_iter()
            .filter_map(|event| self.resolve(&event).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHotkeys;
    use std::sync::mpsc;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Brighter,
        Preset(&'static str),
    }

    fn router() -> HotkeyRouter<MockHotkeys, Action> {
        let (tx, rx) = mpsc::channel();
        HotkeyRouter::new(MockHotkeys::new(tx), rx)
    }

    #[test]
    fn test_combo_normalization() {
        let combo: Combo = " Alt + ctrl + UP ".parse().unwrap();
        assert_eq!(combo.to_string(), "ctrl+alt+up");
        assert_eq!(combo.label(), "Ctrl+Alt+Up");

        let combo: Combo = "meta+shift+x".parse().unwrap();
        assert_eq!(combo.to_string(), "shift+win+x");
        assert!(combo.has(Modifier::Win));
        assert_eq!(combo.key(), Key::Char('x'));
    }

    #[test]
    fn test_combo_rejections() {
        assert_eq!("".parse::<Combo>(), Err(HotkeyError::Empty));
        assert_eq!("n".parse::<Combo>(), Err(HotkeyError::MissingModifier("n".into())));
        assert_eq!("ctrl+".parse::<Combo>(), Err(HotkeyError::EmptyKey("ctrl+".into())));
        assert_eq!(
            "hyper+n".parse::<Combo>(),
            Err(HotkeyError::UnknownModifier("hyper".into()))
        );
        assert_eq!(
            "ctrl+control+ctrl+n".parse::<Combo>(),
            Err(HotkeyError::UnknownModifier("control".into()))
        );
        assert_eq!(
            "win+meta+n".parse::<Combo>(),
            Err(HotkeyError::DuplicateModifier("win".into()))
        );
        assert_eq!(
            "ctrl+pageup".parse::<Combo>(),
            Err(HotkeyError::UnsupportedKey("pageup".into()))
        );
    }

    #[test]
    fn test_rejects_combo_without_modifier() {
        let mut router = router();
        assert!(router.register("n", Action::Brighter).is_err());
        assert!(router.register("ctrl+alt+n", Action::Brighter).is_ok());
        assert!(router.is_registered("CTRL+ALT+N"));
        assert_eq!(router.backend().calls(), ["register ctrl+alt+n"]);
    }

    #[test]
    fn test_reregister_replaces_binding() {
        let mut router = router();
        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router.register("alt+ctrl+up", Action::Preset("Night")).unwrap();

        assert_eq!(router.len(), 1);
        assert_eq!(router.binding("ctrl+alt+up"), Some(&Action::Preset("Night")));
        assert_eq!(
            router.backend().calls(),
            [
                "register ctrl+alt+up",
                "unregister ctrl+alt+up",
                "register ctrl+alt+up"
            ]
        );
        assert_eq!(router.backend().active().len(), 1);
    }

    #[test]
    fn test_backend_rejection_leaves_combo_unbound() {
        let (tx, rx) = mpsc::channel();
        let backend = MockHotkeys::new(tx).reject("ctrl+alt+r");
        let mut router: HotkeyRouter<_, Action> = HotkeyRouter::new(backend, rx);

        let err = router.register("ctrl+alt+r", Action::Brighter).unwrap_err();
        assert!(matches!(err, HotkeyError::Rejected { .. }));
        assert!(router.is_empty());
    }

    #[test]
    fn test_unregister_and_unregister_all() {
        let mut router = router();
        assert_eq!(
            router.unregister("ctrl+alt+up"),
            Err(HotkeyError::NotRegistered("ctrl+alt+up".into()))
        );

        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router.register("ctrl+shift+n", Action::Preset("Night")).unwrap();
        router.unregister("ctrl+alt+up").unwrap();
        assert!(!router.is_registered("ctrl+alt+up"));

        router.register("ctrl+alt+down", Action::Brighter).unwrap();
        assert_eq!(router.unregister_all(), 2);
        assert!(router.is_empty());
        assert!(router.backend().active().is_empty());
    }

    #[test]
    fn test_unregister_all_counts_clean_removals() {
        let (tx, rx) = mpsc::channel();
        let backend = MockHotkeys::new(tx).fail_unregister("ctrl+alt+down");
        let mut router = HotkeyRouter::new(backend, rx);
        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router.register("ctrl+alt+down", Action::Brighter).unwrap();
        router.register("ctrl+shift+n", Action::Preset("Night")).unwrap();

        assert_eq!(router.unregister_all(), 2);
        assert!(router.is_empty());
        assert!(!router.is_registered("ctrl+alt+down"));
        assert_eq!(router.backend().active(), ["ctrl+alt+down"]);
    }

    #[test]
    fn test_events_resolve_only_while_listening() {
        let mut router = router();
        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router.register("ctrl+shift+n", Action::Preset("Night")).unwrap();

        router.backend().press("ctrl+alt+up");
        assert!(router.pending_actions().is_empty());

        router.start_listening();
        router.backend().press("ctrl+shift+n");
        router.backend().press("ctrl+alt+up");
        assert_eq!(
            router.pending_actions(),
            [Action::Preset("Night"), Action::Brighter]
        );

        router.backend().press("ctrl+alt+up");
        assert_eq!(
            router.next_action(Duration::from_millis(10)),
            Some(Action::Brighter)
        );
        assert_eq!(router.next_action(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_stop_listening_unbinds_everything() {
        let mut router = router();
        router.stop_listening();
        assert!(!router.is_listening());

        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router.start_listening();
        router.stop_listening();
        assert!(!router.is_listening());
        assert!(router.is_empty());
        assert!(router.backend().active().is_empty());

        router.stop_listening();
    }
}
