//! Static transform provider.

use std::collections::HashMap;

use contracts::{ContractError, RigidTransform, TransformProvider};

/// In-memory transform table keyed by `(target, source)` frame pair
///
/// Stands in for a live transform tree in tests and mock runs.
#[derive(Default)]
pub struct StaticTransforms {
    table: HashMap<(String, String), RigidTransform>,
}

impl StaticTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transform of `source` expressed in `target`
    pub fn insert(
        &mut self,
        target: impl Into<String>,
        source: impl Into<String>,
        transform: RigidTransform,
    ) {
        self.table.insert((target.into(), source.into()), transform);
    }
}

impl TransformProvider for StaticTransforms {
    fn lookup(&self, target: &str, source: &str) -> Result<RigidTransform, ContractError> {
        self.table
            .get(&(target.to_string(), source.to_string()))
            .copied()
            .ok_or_else(|| ContractError::TransformLookup {
                target: target.to_string(),
                source_frame: source.to_string(),
                message: "no such frame pair".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::transform_from_parts;

    #[test]
    fn lookup_hits_and_misses() {
        let mut transforms = StaticTransforms::new();
        transforms.insert(
            "base_link",
            "camera_optical",
            transform_from_parts([0.1, 0.0, 0.2], [0.0, 0.0, 0.0]),
        );

        let found = transforms.lookup("base_link", "camera_optical").unwrap();
        assert!((found.translation.x - 0.1).abs() < 1e-12);

        assert!(matches!(
            transforms.lookup("base_link", "missing"),
            Err(ContractError::TransformLookup { .. })
        ));
    }
}
