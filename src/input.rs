//! Input aggregation for mobile platform adapters.
//!
//! Mobile platforms deliver input as individual callbacks (key events, typed characters,
//! touches, gamepad state). [`InputBridge`] collects them and hands the engine one merged
//! [`InputSnapshot`] per update through an [`InputSink`].
//!
//! ```
//! use glstate::input::{FpsMode, InputBridge, InputSnapshot, Key, TouchId};
//!
//! let mut bridge = InputBridge::new(FpsMode::VsyncOn);
//! bridge.key_down(Key(62));
//! bridge.append_char(' ');
//! bridge.touch_update(TouchId(1), 100, 200);
//!
//! let mut frames = Vec::new();
//! bridge.forward(&mut |input: &InputSnapshot| frames.push(input.clone()));
//! assert_eq!(frames[0].chars, [' ']);
//! assert!(bridge.snapshot().chars.is_empty());
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

/// Platform key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u32);

/// Identifies a touch for as long as it is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub i64);

/// Identifies a connected gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GamepadId(pub u32);

/// An active touch point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touch {
    /// Touch identifier
    pub id: TouchId,
    /// Horizontal position, in device-independent pixels
    pub x: i32,
    /// Vertical position, in device-independent pixels
    pub y: i32,
}

/// State of a connected gamepad
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gamepad {
    /// Gamepad identifier
    pub id: GamepadId,
    /// Name reported by the platform
    pub name: String,
    /// Pressed state per button
    pub buttons: Vec<bool>,
    /// Axis positions in `-1.0..=1.0`
    pub axes: Vec<f32>,
}

/// How the renderer paces frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FpsMode {
    /// Render once per vsync
    #[default]
    VsyncOn,
    /// Render as often as possible
    VsyncOffMaximum,
    /// Render only when requested
    VsyncOffMinimum,
}

/// Merged input state handed to the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputSnapshot {
    /// Held keys, ascending
    pub keys: Vec<Key>,
    /// Characters typed since the previous snapshot was forwarded
    pub chars: Vec<char>,
    /// Active touches, in the order they started
    pub touches: Vec<Touch>,
    /// Connected gamepads, in the order they were reported
    pub gamepads: Vec<Gamepad>,
}

/// Receives merged input, usually the engine's frame-update path
pub trait InputSink {
    /// Replace the engine's view of the input state
    fn update_input(&mut self, input: &InputSnapshot);
}

impl<F: FnMut(&InputSnapshot)> InputSink for F {
    fn update_input(&mut self, input: &InputSnapshot) {
        self(input)
    }
}

/// Schedules render passes outside of the regular frame pacing
pub trait RenderRequester {
    /// Request an extra render pass unless one is already scheduled
    fn request_render_if_needed(&mut self);
}

impl<F: FnMut()> RenderRequester for F {
    fn request_render_if_needed(&mut self) {
        self()
    }
}

/// Collects platform input events between engine updates
#[derive(Debug, Default)]
pub struct InputBridge {
    keys: HashSet<Key>,
    chars: Vec<char>,
    touches: IndexMap<TouchId, (i32, i32)>,
    gamepads: IndexMap<GamepadId, Gamepad>,
    fps_mode: FpsMode,
}

impl InputBridge {
    /// Creates an empty bridge for a renderer running in `fps_mode`
    pub fn new(fps_mode: FpsMode) -> InputBridge {
        InputBridge {
            fps_mode,
            ..Default::default()
        }
    }

    /// Frame pacing of the renderer
    pub fn fps_mode(&self) -> FpsMode {
        self.fps_mode
    }

    /// Updates the frame pacing of the renderer
    pub fn set_fps_mode(&mut self, fps_mode: FpsMode) {
        self.fps_mode = fps_mode;
    }

    /// Marks `key` as held
    pub fn key_down(&mut self, key: Key) {
        self.keys.insert(key);
    }

    /// Marks `key` as released
    pub fn key_up(&mut self, key: Key) {
        self.keys.remove(&key);
    }

    /// Records a typed character
    pub fn append_char(&mut self, c: char) {
        self.chars.push(c);
    }

    /// Starts or moves a touch
    pub fn touch_update(&mut self, id: TouchId, x: i32, y: i32) {
        self.touches.insert(id, (x, y));
    }

    /// Ends a touch
    pub fn touch_release(&mut self, id: TouchId) {
        self.touches.shift_remove(&id);
    }

    /// The current merged input state
    pub fn snapshot(&self) -> InputSnapshot {
        let mut keys: Vec<Key> = self.keys.iter().copied().collect();
        keys.sort_unstable();
        InputSnapshot {
            keys,
            chars: self.chars.clone(),
            touches: self
                .touches
                .iter()
                .map(|(&id, &(x, y))| Touch { id, x, y })
                .collect(),
            gamepads: self.gamepads.values().cloned().collect(),
        }
    }

    /// Hands the merged state to `sink`.
    ///
    /// Typed characters are delivered once; they are dropped after forwarding.
    pub fn forward(&mut self, sink: &mut impl InputSink) {
        let snapshot = self.snapshot();
        trace!(
            keys = snapshot.keys.len(),
            chars = snapshot.chars.len(),
            touches = snapshot.touches.len(),
            gamepads = snapshot.gamepads.len(),
            "Forwarding input"
        );
        sink.update_input(&snapshot);
        self.chars.clear();
    }

    /// Replaces the set of connected gamepads and forwards the new state.
    ///
    /// When the renderer only renders on request ([`FpsMode::VsyncOffMinimum`]) an extra render
    /// pass is requested, so that gamepad-only changes are not picked up a frame late.
    pub fn update_gamepads(
        &mut self,
        states: impl IntoIterator<Item = Gamepad>,
        sink: &mut impl InputSink,
        requester: &mut impl RenderRequester,
    ) {
        self.gamepads = states.into_iter().map(|gamepad| (gamepad.id, gamepad)).collect();
        self.forward(sink);
        if self.fps_mode == FpsMode::VsyncOffMinimum {
            requester.request_render_if_needed();
        }
    }
}
