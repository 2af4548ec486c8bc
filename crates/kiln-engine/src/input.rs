//! Host input translated into bus events.
//!
//! The host feeds [`InputEvent`]s to [`Engine::handle_input`](crate::engine::Engine::handle_input).
//! Each one updates the [`InputState`] and is republished as an `input:*`
//! event whose payload carries both screen and world coordinates.

use std::collections::BTreeSet;

use serde_json::json;

use kiln_scene::math::Vector2;

use crate::render::Camera;

/// Raw input delivered by the host. Positions are in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { key: String },
    KeyUp { key: String },
    MouseDown { button: u8, position: Vector2 },
    MouseUp { button: u8, position: Vector2 },
    MouseMove { position: Vector2 },
    Wheel { delta: Vector2, position: Vector2 },
    TouchStart { id: u64, position: Vector2 },
    TouchMove { id: u64, position: Vector2 },
    TouchEnd { id: u64, position: Vector2 },
}

impl InputEvent {
    /// The bus event name this input is published under.
    pub fn event_name(&self) -> &'static str {
        match self {
            InputEvent::KeyDown { .. } => "input:keydown",
            InputEvent::KeyUp { .. } => "input:keyup",
            InputEvent::MouseDown { .. } => "input:mousedown",
            InputEvent::MouseUp { .. } => "input:mouseup",
            InputEvent::MouseMove { .. } => "input:mousemove",
            InputEvent::Wheel { .. } => "input:wheel",
            InputEvent::TouchStart { .. } => "input:touchstart",
            InputEvent::TouchMove { .. } => "input:touchmove",
            InputEvent::TouchEnd { .. } => "input:touchend",
        }
    }

    fn position(&self) -> Option<Vector2> {
        match self {
            InputEvent::KeyDown { .. } | InputEvent::KeyUp { .. } => None,
            InputEvent::MouseDown { position, .. }
            | InputEvent::MouseUp { position, .. }
            | InputEvent::MouseMove { position }
            | InputEvent::Wheel { position, .. }
            | InputEvent::TouchStart { position, .. }
            | InputEvent::TouchMove { position, .. }
            | InputEvent::TouchEnd { position, .. } => Some(*position),
        }
    }

    /// Event payload, with world coordinates resolved through `camera`.
    pub fn payload(&self, camera: &Camera) -> serde_json::Value {
        let mut payload = match self {
            InputEvent::KeyDown { key } | InputEvent::KeyUp { key } => json!({ "key": key }),
            InputEvent::MouseDown { button, .. } | InputEvent::MouseUp { button, .. } => {
                json!({ "button": button })
            }
            InputEvent::MouseMove { .. } => json!({}),
            InputEvent::Wheel { delta, .. } => json!({ "deltaX": delta.x, "deltaY": delta.y }),
            InputEvent::TouchStart { id, .. }
            | InputEvent::TouchMove { id, .. }
            | InputEvent::TouchEnd { id, .. } => json!({ "id": id }),
        };
        if let (Some(screen), Some(obj)) = (self.position(), payload.as_object_mut()) {
            let world = camera.screen_to_world(screen);
            obj.insert("x".into(), json!(screen.x));
            obj.insert("y".into(), json!(screen.y));
            obj.insert("worldX".into(), json!(world.x));
            obj.insert("worldY".into(), json!(world.y));
        }
        payload
    }
}

/// Snapshot of held keys, mouse buttons and pointer location.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: BTreeSet<String>,
    buttons: BTreeSet<u8>,
    touches: BTreeSet<u64>,
    pointer: Vector2,
    pointer_world: Vector2,
}

impl InputState {
    pub fn apply(&mut self, event: &InputEvent, camera: &Camera) {
        match event {
            InputEvent::KeyDown { key } => {
                self.keys.insert(key.clone());
            }
            InputEvent::KeyUp { key } => {
                self.keys.remove(key);
            }
            InputEvent::MouseDown { button, .. } => {
                self.buttons.insert(*button);
            }
            InputEvent::MouseUp { button, .. } => {
                self.buttons.remove(button);
            }
            InputEvent::TouchStart { id, .. } => {
                self.touches.insert(*id);
            }
            InputEvent::TouchEnd { id, .. } => {
                self.touches.remove(id);
            }
            InputEvent::MouseMove { .. }
            | InputEvent::Wheel { .. }
            | InputEvent::TouchMove { .. } => {}
        }
        if let Some(position) = event.position() {
            self.pointer = position;
            self.pointer_world = camera.screen_to_world(position);
        }
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn is_button_down(&self, button: u8) -> bool {
        self.buttons.contains(&button)
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    pub fn pointer(&self) -> Vector2 {
        self.pointer
    }

    pub fn pointer_world(&self) -> Vector2 {
        self.pointer_world
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
