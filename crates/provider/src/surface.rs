//! Rendering surface handle
//!
//! The surface is the single device-backed resource of the host. Providers
//! draw into it from `display()` only; the host's render context is the sole
//! caller of `display()`, so at most one provider touches the surface at a
//! time.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Device-facing drawing surface
pub trait DisplaySurface: Send + Sync {
    /// Surface width in pixels
    fn width(&self) -> u32;

    /// Surface height in pixels
    fn height(&self) -> u32;

    /// Discard the frame being composed
    fn clear(&self) -> Result<()>;

    /// Draw text at the given position of the frame being composed
    fn draw_text(&self, x: i32, y: i32, text: &str) -> Result<()>;

    /// Hand the composed frame to the device
    fn present(&self) -> Result<()>;
}

/// One text element of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextItem {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

/// A finished frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub items: Vec<TextItem>,
}

impl Frame {
    /// Concatenated text of the frame, in draw order
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Default)]
struct MemorySurfaceState {
    pending: Frame,
    presented: Vec<Frame>,
}

/// In-memory surface used for headless runs and tests
///
/// Presented frames are kept (bounded) and logged at debug level.
pub struct MemorySurface {
    width: u32,
    height: u32,
    history_limit: usize,
    state: Mutex<MemorySurfaceState>,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            history_limit: 256,
            state: Mutex::new(MemorySurfaceState::default()),
        }
    }

    /// The most recently presented frame
    pub fn last_frame(&self) -> Option<Frame> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.presented.last().cloned())
    }

    /// All retained presented frames, oldest first
    pub fn frames(&self) -> Vec<Frame> {
        self.state
            .lock()
            .map(|state| state.presented.clone())
            .unwrap_or_default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemorySurfaceState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Surface state lock poisoned"))?;
        Ok(f(&mut state))
    }
}

impl DisplaySurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&self) -> Result<()> {
        self.with_state(|state| state.pending = Frame::default())
    }

    fn draw_text(&self, x: i32, y: i32, text: &str) -> Result<()> {
        self.with_state(|state| {
            state.pending.items.push(TextItem {
                x,
                y,
                text: text.to_string(),
            })
        })
    }

    fn present(&self) -> Result<()> {
        let limit = self.history_limit;
        let frame = self.with_state(|state| {
            let frame = state.pending.clone();
            state.presented.push(frame.clone());
            if state.presented.len() > limit {
                let excess = state.presented.len() - limit;
                state.presented.drain(..excess);
            }
            frame
        })?;
        debug!("Presented frame: {}", frame.text());
        Ok(())
    }
}
