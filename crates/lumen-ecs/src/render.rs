//! Boundary to the drawing back end.
//!
//! The scheduler only decides *what* is drawn and in which order. Batching, buffers, and
//! asset resolution belong to the `Renderer` implementation.

use lumen_core::Vec2;

/// Which draw pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPass {
    /// Depth-sorted world pass
    World,
    /// Screen-space pass after the world pass, in live-list order
    Gui,
}

/// A primitive handed to the renderer. Assets are referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sprite {
        sprite: String,
        position: Vec2,
    },
    Text {
        font: String,
        text: String,
        position: Vec2,
    },
    Rect {
        min: Vec2,
        max: Vec2,
        filled: bool,
    },
}

/// A drawing back end. Receives pass boundaries and commands in final draw order.
pub trait Renderer {
    fn begin_pass(&mut self, _pass: DrawPass) {}
    fn end_pass(&mut self, _pass: DrawPass) {}
    fn submit(&mut self, command: DrawCommand);
}

/// Discards everything. Useful for headless simulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn submit(&mut self, _command: DrawCommand) {}
}

/// Records commands tagged with the pass they were submitted in.
#[derive(Debug, Default, Clone)]
pub struct CommandBuffer {
    commands: Vec<(DrawPass, DrawCommand)>,
    current: Option<DrawPass>,
    passes: usize,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[(DrawPass, DrawCommand)] {
        &self.commands
    }

    /// Commands of one pass, in submission order.
    pub fn pass(&self, pass: DrawPass) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(move |(p, _)| *p == pass)
            .map(|(_, command)| command)
    }

    /// Number of passes begun since the last clear.
    pub fn pass_count(&self) -> usize {
        self.passes
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.current = None;
        self.passes = 0;
    }
}

impl Renderer for CommandBuffer {
    fn begin_pass(&mut self, pass: DrawPass) {
        self.current = Some(pass);
        self.passes += 1;
    }

    fn end_pass(&mut self, _pass: DrawPass) {
        self.current = None;
    }

    fn submit(&mut self, command: DrawCommand) {
        // Commands outside an explicit pass are attributed to the world pass.
        let pass = self.current.unwrap_or(DrawPass::World);
        self.commands.push((pass, command));
    }
}
