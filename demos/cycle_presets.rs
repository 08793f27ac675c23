//! Example: Step through every saved preset, then restore the display.
//!
//! Run with: `cargo run --example cycle_presets`

use gammatool_core::{GammaController, GammaError, GammaPort, PresetStore, config_dir, platform};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), GammaError> {
    // Initialize logging (optional)
    env_logger::init();

    // Probe the display and save its current ramp
    let mut controller = GammaController::new(GammaPort::new(platform::system_gamma()));
    match controller.port().target() {
        Some(target) => println!("Adjusting {}", target),
        None => println!("Gamma ramps are not supported here, only state will change"),
    }

    let mut presets = PresetStore::open(config_dir().join("presets.json"));
    for _ in 0..presets.presets().len() {
        let Some(settings) = presets.switch_to_next() else {
            break;
        };
        println!(
            "{}: {:?}",
            presets.current_name().unwrap_or("?"),
            settings
        );

        controller.set_settings(&settings);
        if let Err(e) = controller.apply_settings() {
            eprintln!("Error applying preset: {}", e);
        }
        thread::sleep(Duration::from_secs(2));
    }

    // Put the original ramp back
    match controller.reset_to_default() {
        Ok(()) | Err(GammaError::Unsupported) => Ok(()),
        Err(e) => Err(e),
    }
}
