//! Rendering seam: a host-provided [`DrawContext`], the [`Camera`], and a
//! reference [`RenderSystem`] that draws [`ShapeRenderer`] components.
//!
//! The engine never talks to a graphics API. Hosts implement `DrawContext`
//! over whatever backend they have; [`CommandRecorder`] is an in-memory
//! implementation that records calls for headless runs and tests.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use kiln_scene::component::Component;
use kiln_scene::id::ComponentId;
use kiln_scene::math::Vector2;

use crate::system::{priority, ComponentSystem, SystemContext};

// ---------------------------------------------------------------------------
// DrawContext
// ---------------------------------------------------------------------------

/// 2D drawing surface, modeled on an immediate-mode canvas.
pub trait DrawContext {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    fn clear(&mut self, color: &str);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, x: f64, y: f64);

    fn set_fill_style(&mut self, color: &str);
    fn set_stroke_style(&mut self, color: &str, line_width: f64);

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);

    /// Blit a loaded image resource by id.
    fn draw_image(&mut self, image_id: &str, x: f64, y: f64, w: f64, h: f64);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(String),
    Save,
    Restore,
    Translate(f64, f64),
    Rotate(f64),
    Scale(f64, f64),
    FillStyle(String),
    StrokeStyle(String, f64),
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Arc(f64, f64, f64, f64, f64),
    ClosePath,
    Fill,
    Stroke,
    Image(String, f64, f64, f64, f64),
}

/// A `DrawContext` that records every call.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    width: f64,
    height: f64,
    pub commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }
}

impl DrawContext for CommandRecorder {
    fn width(&self) -> f64 {
        self.width
    }
    fn height(&self) -> f64 {
        self.height
    }
    fn clear(&mut self, color: &str) {
        self.commands.push(DrawCommand::Clear(color.to_owned()));
    }
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }
    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }
    fn translate(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::Translate(x, y));
    }
    fn rotate(&mut self, radians: f64) {
        self.commands.push(DrawCommand::Rotate(radians));
    }
    fn scale(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::Scale(x, y));
    }
    fn set_fill_style(&mut self, color: &str) {
        self.commands.push(DrawCommand::FillStyle(color.to_owned()));
    }
    fn set_stroke_style(&mut self, color: &str, line_width: f64) {
        self.commands
            .push(DrawCommand::StrokeStyle(color.to_owned(), line_width));
    }
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCommand::FillRect(x, y, w, h));
    }
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.commands.push(DrawCommand::StrokeRect(x, y, w, h));
    }
    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }
    fn move_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::MoveTo(x, y));
    }
    fn line_to(&mut self, x: f64, y: f64) {
        self.commands.push(DrawCommand::LineTo(x, y));
    }
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        self.commands
            .push(DrawCommand::Arc(x, y, radius, start, end));
    }
    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }
    fn fill(&mut self) {
        self.commands.push(DrawCommand::Fill);
    }
    fn stroke(&mut self) {
        self.commands.push(DrawCommand::Stroke);
    }
    fn draw_image(&mut self, image_id: &str, x: f64, y: f64, w: f64, h: f64) {
        self.commands
            .push(DrawCommand::Image(image_id.to_owned(), x, y, w, h));
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// View into the world. `position` is the world point shown at the center
/// of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vector2,
    pub zoom: f64,
    pub rotation: f64,
    pub viewport: Vector2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector2::ZERO,
            zoom: 1.0,
            rotation: 0.0,
            viewport: Vector2::new(800.0, 600.0),
        }
    }
}

impl Camera {
    pub const MIN_ZOOM: f64 = 0.01;

    pub fn move_to(&mut self, position: Vector2) {
        self.position = position;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.max(Self::MIN_ZOOM);
        }
    }

    pub fn world_to_screen(&self, world: Vector2) -> Vector2 {
        let half = self.viewport * 0.5;
        (world - self.position).rotate(-self.rotation) * self.zoom + half
    }

    pub fn screen_to_world(&self, screen: Vector2) -> Vector2 {
        let half = self.viewport * 0.5;
        ((screen - half) / self.zoom).rotate(self.rotation) + self.position
    }

    /// Push the camera transform onto a draw context.
    pub fn apply(&self, ctx: &mut dyn DrawContext) {
        ctx.translate(self.viewport.x * 0.5, self.viewport.y * 0.5);
        ctx.scale(self.zoom, self.zoom);
        ctx.rotate(-self.rotation);
        ctx.translate(-self.position.x, -self.position.y);
    }
}

// ---------------------------------------------------------------------------
// ShapeRenderer
// ---------------------------------------------------------------------------

pub const SHAPE_RENDERER_TYPE: &str = "ShapeRenderer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Shape {
    Rect { width: f64, height: f64 },
    Circle { radius: f64 },
    Image { image_id: String, width: f64, height: f64 },
}

/// Draws a flat shape centered on its owner's transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRenderer {
    pub shape: Shape,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub line_width: f64,
    /// Lower layers draw first.
    pub layer: i32,
}

impl Default for ShapeRenderer {
    fn default() -> Self {
        Self {
            shape: Shape::Rect {
                width: 32.0,
                height: 32.0,
            },
            fill: Some("#ffffff".to_owned()),
            stroke: None,
            line_width: 1.0,
            layer: 0,
        }
    }
}

impl ShapeRenderer {
    pub fn rect(width: f64, height: f64, fill: &str) -> Self {
        Self {
            shape: Shape::Rect { width, height },
            fill: Some(fill.to_owned()),
            ..Default::default()
        }
    }

    pub fn circle(radius: f64, fill: &str) -> Self {
        Self {
            shape: Shape::Circle { radius },
            fill: Some(fill.to_owned()),
            ..Default::default()
        }
    }

    fn draw(&self, ctx: &mut dyn DrawContext) -> anyhow::Result<()> {
        match &self.shape {
            Shape::Rect { width, height } => {
                anyhow::ensure!(*width >= 0.0 && *height >= 0.0, "negative rect size");
                if let Some(fill) = &self.fill {
                    ctx.set_fill_style(fill);
                    ctx.fill_rect(-width / 2.0, -height / 2.0, *width, *height);
                }
                if let Some(stroke) = &self.stroke {
                    ctx.set_stroke_style(stroke, self.line_width);
                    ctx.stroke_rect(-width / 2.0, -height / 2.0, *width, *height);
                }
            }
            Shape::Circle { radius } => {
                anyhow::ensure!(*radius >= 0.0, "negative circle radius");
                ctx.begin_path();
                ctx.arc(0.0, 0.0, *radius, 0.0, std::f64::consts::TAU);
                if let Some(fill) = &self.fill {
                    ctx.set_fill_style(fill);
                    ctx.fill();
                }
                if let Some(stroke) = &self.stroke {
                    ctx.set_stroke_style(stroke, self.line_width);
                    ctx.stroke();
                }
            }
            Shape::Image {
                image_id,
                width,
                height,
            } => {
                ctx.draw_image(image_id, -width / 2.0, -height / 2.0, *width, *height);
            }
        }
        Ok(())
    }
}

impl Component for ShapeRenderer {
    fn type_tags(&self) -> &'static [&'static str] {
        &[SHAPE_RENDERER_TYPE, "Renderer"]
    }

    fn serialize(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }

    fn deserialize(&mut self, data: &serde_json::Value) -> anyhow::Result<()> {
        *self = serde_json::from_value(data.clone())?;
        Ok(())
    }

    fn clone_component(&self) -> Option<Box<dyn Component>> {
        Some(Box::new(self.clone()))
    }
}

// ---------------------------------------------------------------------------
// RenderSystem
// ---------------------------------------------------------------------------

/// Shared handle to the host's drawing surface.
pub type SharedDrawContext = Rc<RefCell<dyn DrawContext>>;

/// Clears the surface and draws every active [`ShapeRenderer`] by layer.
///
/// A renderer that fails to draw is logged and skipped; the rest of the
/// frame still draws.
pub struct RenderSystem {
    target: SharedDrawContext,
    background: String,
    drawn_last_frame: usize,
    failed_last_frame: usize,
}

impl RenderSystem {
    pub fn new(target: SharedDrawContext) -> Self {
        Self {
            target,
            background: "#000000".to_owned(),
            drawn_last_frame: 0,
            failed_last_frame: 0,
        }
    }

    pub fn with_background(mut self, color: &str) -> Self {
        self.background = color.to_owned();
        self
    }

    pub fn drawn_last_frame(&self) -> usize {
        self.drawn_last_frame
    }

    pub fn failed_last_frame(&self) -> usize {
        self.failed_last_frame
    }
}

impl ComponentSystem for RenderSystem {
    fn component_types(&self) -> &'static [&'static str] {
        &[SHAPE_RENDERER_TYPE]
    }

    fn priority(&self) -> i32 {
        priority::RENDER
    }

    fn update(
        &mut self,
        _dt: f64,
        batch: &[ComponentId],
        ctx: &mut SystemContext<'_>,
    ) -> anyhow::Result<()> {
        let world = &*ctx.world;
        let mut draws: Vec<(i32, ComponentId)> = batch
            .iter()
            .filter_map(|id| {
                world
                    .component::<ShapeRenderer>(*id)
                    .map(|r| (r.layer, *id))
            })
            .collect();
        draws.sort_by_key(|(layer, _)| *layer);

        let mut target = self.target.borrow_mut();
        let surface: &mut dyn DrawContext = &mut *target;
        surface.clear(&self.background);
        surface.save();
        ctx.camera.apply(surface);

        self.drawn_last_frame = 0;
        self.failed_last_frame = 0;
        for (_, id) in draws {
            let (Some(renderer), Some(owner)) = (
                world.component::<ShapeRenderer>(id),
                world.component_owner(id),
            ) else {
                continue;
            };
            let Some(wt) = world.world_transform(owner) else {
                continue;
            };

            surface.save();
            surface.translate(wt.position.x, wt.position.y);
            surface.rotate(wt.rotation);
            surface.scale(wt.scale.x, wt.scale.y);
            let result = renderer.draw(surface);
            surface.restore();

            match result {
                Ok(()) => self.drawn_last_frame += 1,
                Err(err) => {
                    self.failed_last_frame += 1;
                    tracing::error!(
                        component = %id,
                        game_object = %owner,
                        error = %err,
                        "renderer failed to draw"
                    );
                }
            }
        }
        surface.restore();
        Ok(())
    }
}
