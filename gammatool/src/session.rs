use eyre::{Result, WrapErr};
use gammatool_core::{
    AppConfig, DisplaySettings, GammaController, GammaDevice, GammaError, GammaPort,
    HotkeyBackend, HotkeyRouter, PresetError, PresetStore, UNSUPPORTED_NOTICE,
};
use log::{debug, error, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";
const PRESETS_FILE: &str = "presets.json";

/// How long the listen loop waits for a press before checking for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What a hotkey does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    IncreaseBrightness,
    DecreaseBrightness,
    IncreaseContrast,
    DecreaseContrast,
    Reset,
    NextPreset,
    LoadPreset(String),
}

/// The controller, preset store and config document of one run.
///
/// Every change that reaches the display is also written to the config's
/// `display` section, so the next run starts from it.
pub struct Session<D: GammaDevice> {
    controller: GammaController<D>,
    presets: PresetStore,
    config: AppConfig,
    config_path: PathBuf,
    notice_shown: bool,
}

impl<D: GammaDevice> Session<D> {
    pub fn open(dir: &Path, device: D) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        let config = AppConfig::load(&config_path);
        let presets = PresetStore::open(dir.join(PRESETS_FILE));

        let mut controller = GammaController::new(GammaPort::new(device));
        controller.set_settings(&config.display);

        Self {
            controller,
            presets,
            config,
            config_path,
            notice_shown: false,
        }
    }

    pub fn controller(&self) -> &GammaController<D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut GammaController<D> {
        &mut self.controller
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn status(&self) -> String {
        let mut out = String::new();
        let port = self.controller.port();
        match port.target() {
            Some(target) => {
                let _ = writeln!(out, "gamma: supported ({})", target);
            }
            None => {
                let _ = writeln!(out, "gamma: unsupported");
            }
        }

        let s = self.controller.current_settings();
        let _ = writeln!(
            out,
            "brightness {}  contrast {}  grayscale {}  rgb {},{},{}",
            s.brightness, s.contrast, s.grayscale, s.rgb.red, s.rgb.green, s.rgb.blue
        );

        let current = self.presets.current_name();
        for preset in self.presets.presets() {
            let marker = if Some(preset.name.as_str()) == current { '*' } else { ' ' };
            let _ = write!(out, "{} {}", marker, preset.name);
            if let Some(combo) = self.presets.hotkey(&preset.name) {
                let _ = write!(out, "  [{}]", combo);
            }
            out.push('\n');
        }
        out
    }

    /// Install the current settings and remember them.
    ///
    /// Unsupported hardware is not an error here: the notice is shown once
    /// and the settings are still saved. The display is updated even when
    /// the settings cannot be saved; the save error is returned afterwards.
    pub fn apply(&mut self) -> Result<()> {
        let applied = match self.controller.apply_settings() {
            Ok(()) => Ok(()),
            Err(GammaError::Unsupported) => {
                self.notify_unsupported();
                Ok(())
            }
            Err(e) => Err(e).wrap_err("failed to apply gamma settings"),
        };
        let saved = self.remember();
        if let Err(e) = &saved {
            error!("{:#}", e);
        }
        applied.and(saved)
    }

    /// Reinstall the ramp captured at startup and reset the settings.
    pub fn reset(&mut self) -> Result<()> {
        match self.controller.reset_to_default() {
            Ok(()) => {}
            Err(GammaError::Unsupported) => self.notify_unsupported(),
            Err(e) => return Err(e).wrap_err("failed to restore default gamma"),
        }
        self.remember()
    }

    /// Apply neutral settings.
    ///
    /// A fresh process captures whatever ramp an earlier run left behind,
    /// so the one-shot `reset` command installs the identity ramp instead
    /// of the captured one.
    pub fn reset_to_neutral(&mut self) -> Result<()> {
        self.controller.set_settings(&DisplaySettings::default());
        self.apply()
    }

    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        let settings = self
            .presets
            .load(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        self.controller.set_settings(&settings);
        self.apply()
    }

    /// Load the preset after the current one. Returns its name.
    pub fn next_preset(&mut self) -> Result<Option<String>> {
        let Some(settings) = self.presets.switch_to_next() else {
            warn!("no presets to switch to");
            return Ok(None);
        };
        self.controller.set_settings(&settings);
        self.apply()?;
        Ok(self.presets.current_name().map(str::to_string))
    }

    pub fn save_preset(&mut self, name: &str, hotkey: Option<&str>) -> Result<()> {
        let settings = self.controller.current_settings();
        match hotkey {
            Some(combo) => self.presets.save_with_hotkey(name, &settings, combo)?,
            None => self.presets.save(name, &settings)?,
        }
        Ok(())
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        Ok(self.presets.delete(name)?)
    }

    pub fn set_preset_hotkey(&mut self, name: &str, combo: &str) -> Result<()> {
        Ok(self.presets.set_hotkey(name, combo)?)
    }

    pub fn perform(&mut self, action: &Action) -> Result<()> {
        debug!("performing {:?}", action);
        let step = self.config.advanced.adjustment_step;
        match action {
            Action::IncreaseBrightness => {
                self.controller.adjust_brightness(step);
                self.apply()
            }
            Action::DecreaseBrightness => {
                self.controller.adjust_brightness(-step);
                self.apply()
            }
            Action::IncreaseContrast => {
                self.controller.adjust_contrast(step);
                self.apply()
            }
            Action::DecreaseContrast => {
                self.controller.adjust_contrast(-step);
                self.apply()
            }
            Action::Reset => self.reset(),
            Action::NextPreset => self.next_preset().map(|_| ()),
            Action::LoadPreset(name) => self.load_preset(name),
        }
    }

    /// Register the configured and preset hotkeys. Returns how many were bound.
    ///
    /// A combo that fails to register is logged and skipped.
    pub fn bind_hotkeys<B: HotkeyBackend>(&self, router: &mut HotkeyRouter<B, Action>) -> usize {
        let keys = &self.config.hotkeys;
        let mut wanted = vec![
            (keys.increase_brightness.clone(), Action::IncreaseBrightness),
            (keys.decrease_brightness.clone(), Action::DecreaseBrightness),
            (keys.increase_contrast.clone(), Action::IncreaseContrast),
            (keys.decrease_contrast.clone(), Action::DecreaseContrast),
            (keys.reset.clone(), Action::Reset),
            (keys.next_preset.clone(), Action::NextPreset),
        ];
        wanted.extend(
            self.presets
                .all_hotkeys()
                .into_iter()
                .map(|(name, combo)| (combo, Action::LoadPreset(name))),
        );

        let mut bound = 0;
        for (combo, action) in wanted {
            if combo.trim().is_empty() {
                continue;
            }
            match router.register(&combo, action) {
                Ok(_) => bound += 1,
                Err(e) => warn!("skipping hotkey '{}': {}", combo, e),
            }
        }
        bound
    }

    /// Perform every press already queued. Returns how many actions ran.
    pub fn dispatch_pending<B: HotkeyBackend>(&mut self, router: &HotkeyRouter<B, Action>) -> usize {
        let actions = router.pending_actions();
        for action in &actions {
            self.perform_logged(action);
        }
        actions.len()
    }

    fn perform_logged(&mut self, action: &Action) {
        if let Err(e) = self.perform(action) {
            error!("{:?} failed: {:#}", action, e);
        }
    }

    /// Bind hotkeys and run their actions until `stop` is set.
    ///
    /// Afterwards every binding is removed and, with `restore_on_exit`,
    /// the ramp captured at startup is reinstalled. The saved settings are
    /// left alone so the next run picks them up.
    pub fn listen<B: HotkeyBackend>(
        &mut self,
        router: &mut HotkeyRouter<B, Action>,
        stop: &AtomicBool,
    ) -> Result<()> {
        let bound = self.bind_hotkeys(router);
        if bound == 0 {
            warn!("no hotkeys could be registered");
        }
        router.start_listening();
        info!("listening for {} hotkeys", bound);

        while !stop.load(Ordering::SeqCst) {
            if let Some(action) = router.next_action(POLL_INTERVAL) {
                self.perform_logged(&action);
            }
        }

        router.stop_listening();
        if self.config.system.restore_on_exit {
            match self.controller.port().restore_default() {
                Ok(()) => info!("default gamma restored on exit"),
                Err(GammaError::Unsupported) => {}
                Err(e) => return Err(e).wrap_err("failed to restore default gamma on exit"),
            }
        }
        Ok(())
    }

    fn remember(&mut self) -> Result<()> {
        self.config.display = self.controller.current_settings();
        self.config
            .save(&self.config_path)
            .wrap_err("failed to save settings")
    }

    fn notify_unsupported(&mut self) {
        if !self.notice_shown {
            self.notice_shown = true;
            eprintln!("{}", UNSUPPORTED_NOTICE);
        }
        debug!("gamma unsupported on this display");
    }
}
