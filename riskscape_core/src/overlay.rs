//! Annotation and notice render target.
//!
//! The overlay is owned by the scene and lent to components that write to
//! it; there is no process-wide overlay element.

use serde::Serialize;

/// A transient, self-dismissing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub text: String,
    pub remaining: f32,
}

/// Text surface drawn over the 3D view.
pub trait OverlaySurface: Send {
    fn show_annotation(&mut self, text: &str);
    fn clear_annotation(&mut self);
    fn annotation(&self) -> Option<&str>;

    /// Posts a notice that dismisses itself after `ttl` seconds.
    fn post_notice(&mut self, text: &str, ttl: f32);
    fn notices(&self) -> &[Notice];

    /// Ages notices; called once per frame.
    fn tick(&mut self, dt: f32);
}

/// In-memory surface. The headless harness and tests read it back.
#[derive(Debug, Default, Clone)]
pub struct MemoryOverlay {
    annotation: Option<String>,
    notices: Vec<Notice>,
    annotations_shown: usize,
}

impl MemoryOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times an annotation was (re)shown.
    pub fn annotations_shown(&self) -> usize {
        self.annotations_shown
    }
}

impl OverlaySurface for MemoryOverlay {
    fn show_annotation(&mut self, text: &str) {
        if self.annotation.as_deref() != Some(text) {
            self.annotations_shown += 1;
            self.annotation = Some(text.to_string());
        }
    }

    fn clear_annotation(&mut self) {
        self.annotation = None;
    }

    fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    fn post_notice(&mut self, text: &str, ttl: f32) {
        self.notices.push(Notice {
            text: text.to_string(),
            remaining: ttl.max(0.0),
        });
    }

    fn notices(&self) -> &[Notice] {
        &self.notices
    }

    fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        for notice in &mut self.notices {
            notice.remaining -= dt;
        }
        self.notices.retain(|n| n.remaining > 0.0);
    }
}
