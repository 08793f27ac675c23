//! Windows backends: GDI gamma ramps and `RegisterHotKey`.

use crate::error::{GammaError, HotkeyError};
use crate::hotkey::{Combo, HotkeyBackend, HotkeyEvent, Key, Modifier};
use crate::port::{DeviceTarget, DisplayOutput, GammaDevice};
use crate::ramp::GammaTable;

use log::{debug, error, trace, warn};
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use windows_sys::Win32::{
    Graphics::Gdi::{
        CreateDCW, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP, DISPLAY_DEVICEW, DeleteDC,
        EnumDisplayDevicesW, GetDC, HDC, ReleaseDC,
    },
    System::Threading::GetCurrentThreadId,
    UI::{
        ColorSystem::{GetDeviceGammaRamp, SetDeviceGammaRamp},
        Input::KeyboardAndMouse::{
            HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, MOD_WIN,
            RegisterHotKey, UnregisterHotKey, VK_DOWN, VK_LEFT, VK_RIGHT, VK_UP, VkKeyScanW,
        },
        WindowsAndMessaging::{
            GetMessageW, MSG, PM_NOREMOVE, PeekMessageW, PostThreadMessageW, WM_APP, WM_HOTKEY,
            WM_QUIT, WM_USER,
        },
    },
};

// =============================================================================
// Gamma
// =============================================================================

/// Gamma ramps through GDI device contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinGammaDevice;

/// A device context acquired by [`WinGammaDevice`].
pub struct WinContext {
    hdc: HDC,
    device: String,
}

impl GammaDevice for WinGammaDevice {
    type Context = WinContext;

    fn acquire(&self, target: &DeviceTarget) -> Result<WinContext, GammaError> {
        let hdc = match target {
            DeviceTarget::Primary => unsafe { GetDC(std::ptr::null_mut()) },
            DeviceTarget::Named(name) => {
                let wide = to_wide(name);
                unsafe {
                    CreateDCW(
                        wide.as_ptr(),
                        std::ptr::null(),
                        std::ptr::null(),
                        std::ptr::null(),
                    )
                }
            }
        };

        if hdc.is_null() {
            return Err(GammaError::AcquireFailed {
                device: target.to_string(),
            });
        }
        trace!("acquired device context for {}", target);
        Ok(WinContext {
            hdc,
            device: target.to_string(),
        })
    }

    fn release(&self, target: &DeviceTarget, context: WinContext) {
        let released = match target {
            DeviceTarget::Primary => unsafe { ReleaseDC(std::ptr::null_mut(), context.hdc) != 0 },
            DeviceTarget::Named(_) => unsafe { DeleteDC(context.hdc) != 0 },
        };
        if !released {
            warn!("failed to release device context for {}", target);
        }
    }

    fn get_ramp(&self, context: &WinContext) -> Result<GammaTable, GammaError> {
        let mut table = GammaTable::zeroed();
        // GammaTable is #[repr(C)] with the WORD[3][256] layout GDI expects.
        let ok = unsafe {
            GetDeviceGammaRamp(context.hdc, (&mut table as *mut GammaTable).cast::<c_void>())
        };
        if ok == 0 {
            return Err(GammaError::CallFailed {
                call: "GetDeviceGammaRamp",
                device: context.device.clone(),
            });
        }
        Ok(table)
    }

    fn set_ramp(&self, context: &WinContext, table: &GammaTable) -> Result<(), GammaError> {
        let ok = unsafe {
            SetDeviceGammaRamp(context.hdc, (table as *const GammaTable).cast::<c_void>())
        };
        if ok == 0 {
            return Err(GammaError::CallFailed {
                call: "SetDeviceGammaRamp",
                device: context.device.clone(),
            });
        }
        Ok(())
    }

    fn enumerate(&self) -> Vec<DisplayOutput> {
        let mut outputs = Vec::new();
        let mut index = 0u32;
        loop {
            let mut device: DISPLAY_DEVICEW = unsafe { std::mem::zeroed() };
            device.cb = std::mem::size_of::<DISPLAY_DEVICEW>() as u32;

            let found = unsafe { EnumDisplayDevicesW(std::ptr::null(), index, &mut device, 0) };
            if found == 0 {
                break;
            }
            index += 1;

            if device.StateFlags & DISPLAY_DEVICE_ATTACHED_TO_DESKTOP == 0 {
                continue;
            }
            outputs.push(DisplayOutput {
                name: from_wide(&device.DeviceName),
                description: from_wide(&device.DeviceString),
            });
        }
        debug!("found {} attached display outputs", outputs.len());
        outputs
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().take_while(|&&c| c != 0).count();
    String::from_utf16_lossy(&buffer[..len])
}

// =============================================================================
// Hotkeys
// =============================================================================

/// Posted to the hotkey thread when commands are queued.
const WM_HOTKEY_COMMAND: u32 = WM_APP + 1;

type Reply = Sender<Result<(), HotkeyError>>;

enum Command {
    Register(Combo, Reply),
    Unregister(Combo, Reply),
}

/// Global hotkeys through `RegisterHotKey`.
///
/// Registrations are owned by a dedicated thread running a message loop,
/// since `WM_HOTKEY` is posted to the thread that registered the combo.
/// Commands are queued on a channel and the thread is woken with a
/// thread message; presses are forwarded as [`HotkeyEvent`]s.
pub struct WinHotkeys {
    thread_id: u32,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl WinHotkeys {
    /// Start the hotkey thread. Presses are delivered on `events`.
    pub fn spawn(events: Sender<HotkeyEvent>) -> Result<Self, HotkeyError> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || message_loop(command_rx, events, ready_tx))
            .map_err(|e| HotkeyError::Backend(e.to_string()))?;

        let thread_id = ready_rx
            .recv()
            .map_err(|_| HotkeyError::Backend("hotkey thread exited during startup".to_string()))?;

        debug!("hotkey thread started (id {})", thread_id);
        Ok(Self {
            thread_id,
            commands,
            worker: Some(worker),
        })
    }

    fn send(&self, make: impl FnOnce(Reply) -> Command) -> Result<(), HotkeyError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let gone = || HotkeyError::Backend("hotkey thread is not running".to_string());

        self.commands.send(make(reply_tx)).map_err(|_| gone())?;
        let posted = unsafe { PostThreadMessageW(self.thread_id, WM_HOTKEY_COMMAND, 0, 0) };
        if posted == 0 {
            return Err(gone());
        }
        reply_rx.recv().map_err(|_| gone())?
    }
}

impl HotkeyBackend for WinHotkeys {
    fn register(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        let combo = combo.clone();
        self.send(|reply| Command::Register(combo, reply))
    }

    fn unregister(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        let combo = combo.clone();
        self.send(|reply| Command::Unregister(combo, reply))
    }
}

impl Drop for WinHotkeys {
    fn drop(&mut self) {
        unsafe {
            PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("hotkey thread panicked");
            }
        }
    }
}

fn message_loop(commands: Receiver<Command>, events: Sender<HotkeyEvent>, ready: Sender<u32>) {
    let mut msg: MSG = unsafe { std::mem::zeroed() };
    // The thread has no message queue until it first touches one.
    unsafe {
        PeekMessageW(&mut msg, std::ptr::null_mut(), WM_USER, WM_USER, PM_NOREMOVE);
    }
    if ready.send(unsafe { GetCurrentThreadId() }).is_err() {
        return;
    }

    let mut ids: HashMap<Combo, i32> = HashMap::new();
    let mut next_id = 1i32;

    while unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) } > 0 {
        match msg.message {
            WM_HOTKEY => {
                let id = msg.wParam as i32;
                if let Some(combo) = ids.iter().find(|(_, v)| **v == id).map(|(k, _)| k) {
                    trace!("WM_HOTKEY {} ({})", id, combo);
                    let _ = events.send(HotkeyEvent {
                        combo: combo.clone(),
                    });
                }
            }
            WM_HOTKEY_COMMAND => {
                for command in commands.try_iter() {
                    match command {
                        Command::Register(combo, reply) => {
                            let result = register_native(&combo, next_id);
                            if result.is_ok() {
                                ids.insert(combo, next_id);
                                next_id += 1;
                            }
                            let _ = reply.send(result);
                        }
                        Command::Unregister(combo, reply) => {
                            let result = match ids.remove(&combo) {
                                Some(id) => unregister_native(&combo, id),
                                None => Err(HotkeyError::NotRegistered(combo.to_string())),
                            };
                            let _ = reply.send(result);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    for (combo, id) in ids {
        let _ = unregister_native(&combo, id);
    }
    debug!("hotkey thread stopped");
}

fn register_native(combo: &Combo, id: i32) -> Result<(), HotkeyError> {
    let rejected = |reason: String| HotkeyError::Rejected {
        combo: combo.to_string(),
        reason,
    };

    let mut modifiers = MOD_NOREPEAT;
    for modifier in combo.modifiers() {
        modifiers |= match modifier {
            Modifier::Ctrl => MOD_CONTROL,
            Modifier::Alt => MOD_ALT,
            Modifier::Shift => MOD_SHIFT,
            Modifier::Win => MOD_WIN,
        };
    }

    let vk = match combo.key() {
        Key::Up => u32::from(VK_UP),
        Key::Down => u32::from(VK_DOWN),
        Key::Left => u32::from(VK_LEFT),
        Key::Right => u32::from(VK_RIGHT),
        Key::Char(c) => {
            let mut units = [0u16; 2];
            let encoded = c.encode_utf16(&mut units);
            if encoded.len() != 1 {
                return Err(rejected("character has no virtual key".to_string()));
            }
            let scan = unsafe { VkKeyScanW(encoded[0]) };
            let (vk, extra) = split_key_scan(scan).ok_or_else(|| {
                rejected("character cannot be typed with Shift alone".to_string())
            })?;
            modifiers |= extra;
            vk
        }
    };

    let ok = unsafe { RegisterHotKey(std::ptr::null_mut(), id, modifiers, vk) };
    if ok == 0 {
        return Err(rejected(std::io::Error::last_os_error().to_string()));
    }
    Ok(())
}

/// Split a `VkKeyScanW` result into the virtual key and the modifiers
/// needed to type the character.
///
/// Only the Shift state is kept. Characters that need Ctrl, Alt or another
/// shift state (AltGr layouts) return `None`, as does an unmapped character.
fn split_key_scan(scan: i16) -> Option<(u32, HOT_KEY_MODIFIERS)> {
    if scan == -1 {
        return None;
    }
    let [vk, state] = (scan as u16).to_le_bytes();
    match state {
        0 => Some((u32::from(vk), 0)),
        1 => Some((u32::from(vk), MOD_SHIFT)),
        _ => None,
    }
}

fn unregister_native(combo: &Combo, id: i32) -> Result<(), HotkeyError> {
    let ok = unsafe { UnregisterHotKey(std::ptr::null_mut(), id) };
    if ok == 0 {
        return Err(HotkeyError::Backend(format!(
            "UnregisterHotKey failed for {}: {}",
            combo,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key_scan() {
        // '1' on a US layout: VK 0x31, no shift.
        assert_eq!(split_key_scan(0x0031), Some((0x31, 0)));
        // '!' on a US layout: VK 0x31 with Shift.
        assert_eq!(split_key_scan(0x0131), Some((0x31, MOD_SHIFT)));
        // AltGr (Ctrl+Alt) characters and unmapped ones are refused.
        assert_eq!(split_key_scan(0x0645), None);
        assert_eq!(split_key_scan(-1), None);
    }
}
