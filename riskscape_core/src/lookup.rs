//! Read-only lookups shared between the node layer and its dependents.

use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

/// id -> current world position.
pub trait PositionLookup {
    fn position_of(&self, id: &str) -> Option<Point3<f32>>;
}

/// id -> risk score in [0, 1].
pub trait RiskLookup {
    fn risk_of(&self, id: &str) -> Option<f32>;
}

impl PositionLookup for HashMap<String, Point3<f32>> {
    fn position_of(&self, id: &str) -> Option<Point3<f32>> {
        self.get(id).copied()
    }
}

impl RiskLookup for HashMap<String, f32> {
    fn risk_of(&self, id: &str) -> Option<f32> {
        self.get(id).copied()
    }
}

/// Centroid of the resolvable members, with the number that resolved.
///
/// Returns `None` when no member can be positioned.
pub fn centroid<L, S>(lookup: &L, ids: &[S]) -> Option<(Point3<f32>, usize)>
where
    L: PositionLookup + ?Sized,
    S: AsRef<str>,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for id in ids {
        if let Some(p) = lookup.position_of(id.as_ref()) {
            sum += p.coords;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some((Point3::from(sum / count as f32), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_skips_missing() {
        let mut lookup = HashMap::new();
        lookup.insert("a".to_string(), Point3::new(0.0, 0.0, 0.0));
        lookup.insert("b".to_string(), Point3::new(4.0, 2.0, 0.0));

        let (c, n) = centroid(&lookup, &["a", "b", "ghost"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(c, Point3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_centroid_none_resolve() {
        let lookup: HashMap<String, Point3<f32>> = HashMap::new();
        assert!(centroid(&lookup, &["x"]).is_none());
    }
}
