mod cli;
mod session;

use clap::Parser;
use cli::{Args, Command, PresetCommand};
use eyre::{Result, WrapErr};
use gammatool_core::{GammaDevice, HotkeyRouter, config_dir, platform};
use log::{LevelFilter, info};
use session::Session;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let dir = args.config_dir.clone().unwrap_or_else(config_dir);
    info!("using config directory {}", dir.display());
    let mut session = Session::open(&dir, platform::system_gamma());

    match args.command.unwrap_or(Command::Status) {
        Command::Status => print!("{}", session.status()),
        Command::Apply {
            brightness,
            contrast,
            grayscale,
            rgb,
        } => {
            let controller = session.controller_mut();
            if let Some(value) = brightness {
                controller.set_brightness(value);
            }
            if let Some(value) = contrast {
                controller.set_contrast(value);
            }
            if let Some(value) = grayscale {
                controller.set_grayscale(value);
            }
            if let Some((r, g, b)) = rgb {
                controller.set_rgb(r, g, b);
            }
            session.apply()?;
            print!("{}", session.status());
        }
        Command::Reset => session.reset_to_neutral()?,
        Command::Preset { action } => run_preset(&mut session, action)?,
        Command::Listen => listen(&mut session)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_preset<D: GammaDevice>(session: &mut Session<D>, action: PresetCommand) -> Result<()> {
    match action {
        PresetCommand::List => {
            for preset in session.presets().presets() {
                let s = preset.settings;
                println!(
                    "{:<16} brightness {:>3}  contrast {:>3}  grayscale {:>3}  rgb {},{},{}  {}",
                    preset.name,
                    s.brightness,
                    s.contrast,
                    s.grayscale,
                    s.rgb.red,
                    s.rgb.green,
                    s.rgb.blue,
                    preset.hotkey
                );
            }
        }
        PresetCommand::Save { name, hotkey } => session.save_preset(&name, hotkey.as_deref())?,
        PresetCommand::Load { name } => session.load_preset(&name)?,
        PresetCommand::Delete { name } => session.delete_preset(&name)?,
        PresetCommand::Next => match session.next_preset()? {
            Some(name) => println!("{}", name),
            None => println!("no presets"),
        },
        PresetCommand::Hotkey { name, combo } => {
            session.set_preset_hotkey(&name, combo.as_deref().unwrap_or(""))?
        }
    }
    Ok(())
}

fn listen<D: GammaDevice>(session: &mut Session<D>) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .wrap_err("failed to install Ctrl-C handler")?;

    let (tx, rx) = mpsc::channel();
    let backend = platform::system_hotkeys(tx.clone()).wrap_err("failed to start hotkeys")?;
    let mut router = HotkeyRouter::new(backend, rx);

    println!("listening for hotkeys, press Ctrl-C to stop");
    let result = session.listen(&mut router, &stop);
    // Kept open until here so the router waits instead of seeing a hang-up.
    drop(tx);
    result
}
