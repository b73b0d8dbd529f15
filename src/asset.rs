//! Shared assets. Only materials carry synchronized state; other asset
//! kinds are tracked by id and name so actors can reference them.

use std::collections::HashMap;

use log::{debug, warn};
use uuid::Uuid;

use crate::patch::{Material, MaterialPatch, Patchable};

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub material: Option<Material>,
}

#[derive(Debug, Default)]
pub struct AssetManager {
    assets: HashMap<Uuid, Asset>,
}

impl AssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. A duplicate id is ignored and returns `false`.
    pub fn create(&mut self, id: Uuid, name: &str, material: Option<&MaterialPatch>) -> bool {
        if self.assets.contains_key(&id) {
            warn!("Asset {} already exists", id);
            return false;
        }
        let material = material.map(|patch| {
            let mut m = Material::default();
            m.apply_patch(patch);
            m
        });
        debug!("Asset created: {} ({})", name, id);
        self.assets.insert(
            id,
            Asset {
                id,
                name: name.to_string(),
                material,
            },
        );
        true
    }

    /// Patch a material asset. Returns `false` if the id is unknown.
    pub fn update_material(&mut self, id: Uuid, patch: &MaterialPatch) -> bool {
        match self.assets.get_mut(&id) {
            Some(asset) => {
                asset
                    .material
                    .get_or_insert_with(Material::default)
                    .apply_patch(patch);
                true
            }
            None => {
                warn!("Update for unknown asset {}", id);
                false
            }
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&Asset> {
        self.assets.get(&id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn clear(&mut self) {
        self.assets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::ColorPatch;

    #[test]
    fn material_update_touches_only_patched_fields() {
        let mut assets = AssetManager::new();
        let id = Uuid::new_v4();
        assets.create(
            id,
            "red",
            Some(&MaterialPatch {
                alpha_cutoff: Some(0.25),
                ..Default::default()
            }),
        );
        assets.update_material(
            id,
            &MaterialPatch {
                color: Some(ColorPatch {
                    r: Some(1.0),
                    g: Some(0.0),
                    b: Some(0.0),
                    a: None,
                }),
                ..Default::default()
            },
        );
        let m = assets.find(id).and_then(|a| a.material.as_ref()).expect("material");
        assert_eq!(m.alpha_cutoff, 0.25);
        assert_eq!((m.color.r, m.color.g, m.color.a), (1.0, 0.0, 1.0));
    }

    #[test]
    fn duplicate_create_is_ignored() {
        let mut assets = AssetManager::new();
        let id = Uuid::new_v4();
        assert!(assets.create(id, "a", None));
        assert!(!assets.create(id, "b", None));
        assert_eq!(assets.find(id).map(|a| a.name.as_str()), Some("a"));
    }
}
