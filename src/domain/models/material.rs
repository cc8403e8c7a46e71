//! Materials and sample geometry.
//!
//! The geometry is an arena of owned materials plus bodies that reference
//! them by index, so a material shared by two bodies is stored once and the
//! persisted form needs no pointer identity.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::composition::Composition;
use crate::domain::models::element::symbol;

/// A material with a name and a bulk composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub composition: Composition,
}

impl Material {
    pub fn new(name: impl Into<String>, composition: Composition) -> Self {
        Self {
            name: name.into(),
            composition,
        }
    }

    /// Pure single-element material, the default standard.
    pub fn pure(z: u32) -> Self {
        let mut composition = Composition::new();
        composition.set(z, 1.0);
        Self {
            name: symbol(z).to_string(),
            composition,
        }
    }
}

/// Index of a material in the geometry arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MaterialId(pub usize);

/// Index of a body in the geometry arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BodyId(pub usize);

/// A geometric body made of one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub material: MaterialId,
}

/// Sample geometry: an arena of materials and the bodies referencing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleGeometry {
    materials: Vec<Material>,
    bodies: Vec<Body>,
}

impl SampleGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk substrate of a single material, the common case for standards.
    pub fn substrate(material: Material) -> Self {
        let mut geometry = Self::new();
        let id = geometry.add_material(material);
        // add_body cannot fail for an id this arena just handed out
        let _ = geometry.add_body(id);
        geometry
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_body(&mut self, material: MaterialId) -> DomainResult<BodyId> {
        if material.0 >= self.materials.len() {
            return Err(DomainError::UnknownMaterial(material.0));
        }
        self.bodies.push(Body { material });
        Ok(BodyId(self.bodies.len() - 1))
    }

    pub fn contains_body(&self, body: BodyId) -> bool {
        body.0 < self.bodies.len()
    }

    /// Material of a body, resolved through the arena.
    pub fn material_of(&self, body: BodyId) -> DomainResult<&Material> {
        let body = self
            .bodies
            .get(body.0)
            .ok_or(DomainError::UnknownBody(body.0))?;
        Ok(&self.materials[body.material.0])
    }

    pub fn material_of_mut(&mut self, body: BodyId) -> DomainResult<&mut Material> {
        let body = *self
            .bodies
            .get(body.0)
            .ok_or(DomainError::UnknownBody(body.0))?;
        Ok(&mut self.materials[body.material.0])
    }

    pub fn bodies(&self) -> impl Iterator<Item = BodyId> {
        (0..self.bodies.len()).map(BodyId)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_material_is_single_element() {
        let m = Material::pure(29);
        assert_eq!(m.name, "Cu");
        assert_eq!(m.composition.get(29), 1.0);
        assert_eq!(m.composition.len(), 1);
    }

    #[test]
    fn substrate_has_one_body() {
        let g = SampleGeometry::substrate(Material::pure(79));
        assert!(g.contains_body(BodyId(0)));
        assert!(!g.contains_body(BodyId(1)));
        assert_eq!(g.material_of(BodyId(0)).unwrap().name, "Au");
    }

    #[test]
    fn shared_material_is_stored_once() {
        let mut g = SampleGeometry::new();
        let id = g.add_material(Material::pure(29));
        let a = g.add_body(id).unwrap();
        let b = g.add_body(id).unwrap();
        assert_eq!(g.materials().len(), 1);

        // Mutating through one body is visible through the other.
        g.material_of_mut(a).unwrap().composition.set(29, 0.5);
        assert_eq!(g.material_of(b).unwrap().composition.get(29), 0.5);
    }

    #[test]
    fn body_with_unknown_material_is_rejected() {
        let mut g = SampleGeometry::new();
        assert!(matches!(
            g.add_body(MaterialId(3)),
            Err(DomainError::UnknownMaterial(3))
        ));
    }

    #[test]
    fn unknown_body_lookup_fails() {
        let g = SampleGeometry::new();
        assert!(matches!(
            g.material_of(BodyId(0)),
            Err(DomainError::UnknownBody(0))
        ));
    }
}
