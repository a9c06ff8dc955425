//! WebAssembly bindings for the telemetry decoder.
//!
//! The browser debugger page owns the websockets and feeds each binary
//! message into a `WasmObserver`; decoding and snapshot keeping happen here.

use std::sync::Arc;

use js_sys::Function;
use wasm_bindgen::prelude::*;

use crate::channel::{Delivery, TelemetryChannel};
use crate::protocol::{OpcodeFields, ScreenSize, StateLayout};
use crate::store::SnapshotStore;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Decoder and snapshot holder for one debugger page.
#[wasm_bindgen]
pub struct WasmObserver {
    store: Arc<SnapshotStore>,
    state: TelemetryChannel,
    display: TelemetryChannel,
    on_change: Option<Function>,
}

#[wasm_bindgen]
impl WasmObserver {
    /// Create an observer for the given fallback screen size. Set
    /// `with_screen_size` when the instance appends its screen size to state
    /// frames.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u8, height: u8, with_screen_size: bool) -> Result<WasmObserver, JsError> {
        let screen = ScreenSize::new(width, height).map_err(|e| JsError::new(&e.to_string()))?;
        let layout = if with_screen_size {
            StateLayout::WithScreenSize
        } else {
            StateLayout::Canonical
        };
        let store = Arc::new(SnapshotStore::new());
        Ok(Self {
            state: TelemetryChannel::state(Arc::clone(&store), layout, screen),
            display: TelemetryChannel::display(Arc::clone(&store)),
            store,
            on_change: None,
        })
    }

    /// Register a callback invoked with `"state"` or `"display"` after each
    /// stored frame.
    #[wasm_bindgen]
    pub fn on_change(&mut self, callback: Function) {
        self.on_change = Some(callback);
    }

    /// Feed one message from the state socket.
    #[wasm_bindgen]
    pub fn push_state(&mut self, frame: &[u8]) -> Result<(), JsError> {
        let delivery = self.state.receive(frame).map_err(|e| JsError::new(&e.to_string()))?;
        if delivery == Delivery::Stored {
            self.changed("state");
        }
        Ok(())
    }

    /// Feed one message from the display socket.
    #[wasm_bindgen]
    pub fn push_display(&mut self, frame: &[u8]) -> Result<(), JsError> {
        let delivery = self.display.receive(frame).map_err(|e| JsError::new(&e.to_string()))?;
        if delivery == Delivery::Stored {
            self.changed("display");
        }
        Ok(())
    }

    /// The state socket closed.
    #[wasm_bindgen]
    pub fn close_state(&mut self) {
        self.state.close();
    }

    /// The display socket closed.
    #[wasm_bindgen]
    pub fn close_display(&mut self) {
        self.display.close();
    }

    /// Latest CPU state with its opcode fields, as JSON. `undefined` before
    /// the first state frame.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Option<String> {
        let state = self.store.latest_state()?;
        let value = serde_json::json!({
            "state": *state,
            "fields": state.fields(),
            "mnemonic": state.fields().mnemonic(),
        });
        Some(value.to_string())
    }

    /// Latest framebuffer as one byte per pixel (0 or 1), row-major.
    #[wasm_bindgen]
    pub fn pixels(&self) -> Vec<u8> {
        self.store
            .latest_frame()
            .map(|fb| fb.pixels().iter().map(|&on| on as u8).collect())
            .unwrap_or_default()
    }

    /// Width of the screen in use, 0 before the first state frame.
    #[wasm_bindgen]
    pub fn width(&self) -> u8 {
        self.store.screen_size().map_or(0, |s| s.width())
    }

    /// Height of the screen in use, 0 before the first state frame.
    #[wasm_bindgen]
    pub fn height(&self) -> u8 {
        self.store.screen_size().map_or(0, |s| s.height())
    }
}

impl WasmObserver {
    fn changed(&self, channel: &str) {
        if let Some(callback) = &self.on_change {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(channel));
        }
    }
}

/// Disassemble a single opcode.
#[wasm_bindgen]
pub fn wasm_disassemble(opcode: u16) -> String {
    OpcodeFields::decompose(opcode).mnemonic()
}
