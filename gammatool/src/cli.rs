use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gammatool",
    version = env!("CARGO_PKG_VERSION"),
    about = "Adjust display brightness, contrast and color through the gamma ramp"
)]
pub struct Args {
    /// Directory holding config.json and presets.json
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Show gamma support, current settings and presets")]
    Status,

    #[command(about = "Apply the saved settings, with optional overrides")]
    Apply {
        #[arg(long, allow_hyphen_values = true)]
        brightness: Option<i32>,

        #[arg(long, allow_hyphen_values = true)]
        contrast: Option<i32>,

        #[arg(long, allow_hyphen_values = true)]
        grayscale: Option<i32>,

        #[arg(long, value_name = "R,G,B", value_parser = parse_rgb)]
        rgb: Option<(i32, i32, i32)>,
    },

    #[command(about = "Go back to neutral settings")]
    Reset,

    #[command(about = "Manage named presets")]
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },

    #[command(about = "Register hotkeys and react to them until Ctrl-C")]
    Listen,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PresetCommand {
    #[command(about = "List presets in cycle order")]
    List,

    #[command(about = "Save the current settings as a preset")]
    Save {
        name: String,

        #[arg(long, value_name = "COMBO")]
        hotkey: Option<String>,
    },

    #[command(about = "Load and apply a preset")]
    Load { name: String },

    #[command(about = "Delete a preset")]
    Delete { name: String },

    #[command(about = "Load and apply the preset after the current one")]
    Next,

    #[command(about = "Bind a hotkey to a preset, or clear it when COMBO is omitted")]
    Hotkey { name: String, combo: Option<String> },
}

fn parse_rgb(raw: &str) -> Result<(i32, i32, i32), String> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<i32>().map_err(|e| format!("'{}': {}", p.trim(), e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [r, g, b] => Ok((*r, *g, *b)),
        _ => Err(format!("expected R,G,B but got {} values", parts.len())),
    }
}
