//! Shape categories and per-shape instance batches.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of entity glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Accounts and anything unrecognised
    Sphere,
    /// Banks and other institutions
    Cube,
    /// Merchants and payment endpoints
    Diamond,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Sphere, ShapeKind::Cube, ShapeKind::Diamond];

    /// Maps an entity category string to its glyph.
    pub fn classify(entity_type: &str) -> ShapeKind {
        match entity_type.trim().to_ascii_lowercase().as_str() {
            "bank" | "institution" | "fi" => ShapeKind::Cube,
            "merchant" | "exchange" | "payment_processor" => ShapeKind::Diamond,
            _ => ShapeKind::Sphere,
        }
    }

    /// Dense index for array-backed storage.
    pub fn index(self) -> usize {
        match self {
            ShapeKind::Sphere => 0,
            ShapeKind::Cube => 1,
            ShapeKind::Diamond => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cube => "cube",
            ShapeKind::Diamond => "diamond",
        }
    }
}

/// Address of one drawn instance: which batch, which local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawSlot {
    pub shape: ShapeKind,
    pub slot: usize,
}

/// Dense slot space for all live entities sharing one shape.
///
/// Slots are reassigned from scratch on every snapshot; only entity ids
/// persist across snapshots, never slot numbers.
#[derive(Debug, Clone, Default)]
pub struct ShapeBatch {
    /// local slot -> global entity index
    slots: Vec<usize>,
    /// global entity index -> local slot
    local_of: HashMap<usize, usize>,
}

impl ShapeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every assignment, keeping allocations for the next fill.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.local_of.clear();
    }

    /// Appends an entity and returns its local slot.
    pub fn assign(&mut self, global: usize) -> usize {
        let slot = self.slots.len();
        self.slots.push(global);
        self.local_of.insert(global, slot);
        slot
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn global_at(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot).copied()
    }

    pub fn slot_of(&self, global: usize) -> Option<usize> {
        self.local_of.get(&global).copied()
    }

    /// Global indices in slot order.
    pub fn members(&self) -> &[usize] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ShapeKind::classify("bank"), ShapeKind::Cube);
        assert_eq!(ShapeKind::classify(" Merchant "), ShapeKind::Diamond);
        assert_eq!(ShapeKind::classify("account"), ShapeKind::Sphere);
        assert_eq!(ShapeKind::classify("something-new"), ShapeKind::Sphere);
    }

    #[test]
    fn test_batch_dense_slots() {
        let mut batch = ShapeBatch::new();
        assert_eq!(batch.assign(7), 0);
        assert_eq!(batch.assign(2), 1);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.global_at(1), Some(2));
        assert_eq!(batch.slot_of(7), Some(0));
        assert_eq!(batch.global_at(2), None);

        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.slot_of(7), None);
    }
}
