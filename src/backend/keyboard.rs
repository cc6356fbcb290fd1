//! Keyboard emulation through a virtual uinput keyboard.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use std::thread;
use std::time::Duration;

use super::{ActuationBackend, BackendError};
use crate::common::constants::{KEY_PRESS_DURATION, VIRTUAL_KEYBOARD_NAME};
use crate::config::ControllerConfig;

/// Map a configured key name to its evdev key. Names are case-insensitive.
pub fn key_from_name(name: &str) -> Option<Key> {
    let key = match name.trim().to_ascii_uppercase().as_str() {
        "F1" => Key::KEY_F1,
        "F2" => Key::KEY_F2,
        "F3" => Key::KEY_F3,
        "F4" => Key::KEY_F4,
        "F5" => Key::KEY_F5,
        "F6" => Key::KEY_F6,
        "F7" => Key::KEY_F7,
        "F8" => Key::KEY_F8,
        "F9" => Key::KEY_F9,
        "F10" => Key::KEY_F10,
        "F11" => Key::KEY_F11,
        "F12" => Key::KEY_F12,
        "SPACE" => Key::KEY_SPACE,
        "ENTER" => Key::KEY_ENTER,
        "ESC" | "ESCAPE" => Key::KEY_ESC,
        "TAB" => Key::KEY_TAB,
        "SHIFT" => Key::KEY_LEFTSHIFT,
        "CTRL" | "CONTROL" => Key::KEY_LEFTCTRL,
        "ALT" => Key::KEY_LEFTALT,
        _ => return None,
    };
    Some(key)
}

/// Presses one key per toggle on a virtual keyboard.
///
/// The uinput device is created on first use so commands that never toggle do not need
/// write access to `/dev/uinput`.
pub struct KeyboardBackend {
    key: Key,
    settle_delay: Duration,
    device: Option<VirtualDevice>,
}

impl KeyboardBackend {
    pub fn new(config: &ControllerConfig) -> Result<Self, BackendError> {
        let key = key_from_name(&config.toggle_key)
            .ok_or_else(|| BackendError::InvalidKey(config.toggle_key.clone()))?;

        Ok(Self {
            key,
            settle_delay: config.toggle_delay(),
            device: None,
        })
    }

    fn device(&mut self) -> Result<&mut VirtualDevice, BackendError> {
        if self.device.is_none() {
            self.device = Some(create_virtual_keyboard(self.key)?);
        }
        self.device
            .as_mut()
            .ok_or_else(|| BackendError::NotOpen(VIRTUAL_KEYBOARD_NAME.to_string()))
    }

    fn emit_key(&mut self, value: i32) -> Result<(), BackendError> {
        let code = self.key.code();
        self.device()?
            .emit(&[InputEvent::new(EventType::KEY, code, value)])
            .map_err(|e| BackendError::Device(format!("failed to emit key event: {e}")))
    }
}

fn create_virtual_keyboard(key: Key) -> Result<VirtualDevice, BackendError> {
    let mut keys = AttributeSet::<Key>::new();
    keys.insert(key);

    VirtualDeviceBuilder::new()
        .and_then(|builder| builder.name(VIRTUAL_KEYBOARD_NAME).with_keys(&keys))
        .and_then(|builder| builder.build())
        .map_err(|e| BackendError::Device(format!("failed to create virtual keyboard: {e}")))
}

impl ActuationBackend for KeyboardBackend {
    fn toggle(&mut self, _target: bool) -> Result<(), BackendError> {
        self.emit_key(1)?;
        thread::sleep(KEY_PRESS_DURATION);
        self.emit_key(0)?;

        thread::sleep(self.settle_delay);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "keyboard"
    }
}
