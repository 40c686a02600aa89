//! Contracts for the collaborators that own pixel data and acquisition metadata.
//!
//! The stitching core never reads files itself: it asks an [`ImageLoader`]
//! for pixels and a [`TileMetadata`] source for nominal placements. The
//! in-memory implementations below back the tests and small pipelines.

use crate::{AffineTransform, BoundingBox, CoreError, Group, PixelRegion, ViewId};
use std::collections::BTreeMap;

/// Source of pixel data for a single view.
///
/// Must be deterministic for a fixed `(view, downsampling)` within one run.
pub trait ImageLoader: Send + Sync {
    fn load_region(&self, view: &ViewId, downsampling: &[usize]) -> Result<PixelRegion, CoreError>;
}

/// Source of nominal placements (pre-registration transforms) and tile sizes.
pub trait TileMetadata: Send + Sync {
    /// Current starting transform (pixel -> world) of a group.
    fn starting_transform(&self, group: &Group) -> Option<AffineTransform>;

    /// Full-resolution dimensions of a group's representative image.
    fn dimensions(&self, group: &Group) -> Option<Vec<usize>>;

    /// World-space bounding box under the starting transform.
    fn bounding_box(&self, group: &Group) -> Option<BoundingBox> {
        let dims = self.dimensions(group)?;
        let t = self.starting_transform(group)?;
        Some(BoundingBox::of_dims(&dims).transformed(&t))
    }
}

impl<T: ImageLoader + ?Sized> ImageLoader for &T {
    fn load_region(&self, view: &ViewId, downsampling: &[usize]) -> Result<PixelRegion, CoreError> {
        (**self).load_region(view, downsampling)
    }
}

impl<T: TileMetadata + ?Sized> TileMetadata for &T {
    fn starting_transform(&self, group: &Group) -> Option<AffineTransform> {
        (**self).starting_transform(group)
    }

    fn dimensions(&self, group: &Group) -> Option<Vec<usize>> {
        (**self).dimensions(group)
    }
}

/// Full-resolution regions held in memory, downsampled on request.
#[derive(Clone, Debug, Default)]
pub struct InMemoryImages {
    regions: BTreeMap<ViewId, PixelRegion>,
}

impl InMemoryImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: ViewId, region: PixelRegion) -> Option<PixelRegion> {
        self.regions.insert(view, region)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl ImageLoader for InMemoryImages {
    fn load_region(&self, view: &ViewId, downsampling: &[usize]) -> Result<PixelRegion, CoreError> {
        let region = self
            .regions
            .get(view)
            .ok_or(CoreError::MissingView(*view))?;
        region.downsample(downsampling)
    }
}

#[derive(Clone, Debug)]
struct ViewMeta {
    dims: Vec<usize>,
    transform: AffineTransform,
}

/// Per-view dimensions and starting transforms; a group resolves through its
/// representative view.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetadata {
    views: BTreeMap<ViewId, ViewMeta>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: ViewId, dims: Vec<usize>, transform: AffineTransform) {
        self.views.insert(view, ViewMeta { dims, transform });
    }

    /// Replace the starting transform of a known view. Returns `false` if unknown.
    pub fn set_transform(&mut self, view: &ViewId, transform: AffineTransform) -> bool {
        match self.views.get_mut(view) {
            Some(meta) => {
                meta.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Compose `update` onto the starting transform of every view in `group`.
    pub fn apply_update(&mut self, group: &Group, update: &AffineTransform) {
        for v in group.views() {
            if let Some(meta) = self.views.get_mut(v) {
                meta.transform = update.compose(&meta.transform);
            }
        }
    }

    pub fn views(&self) -> impl Iterator<Item = &ViewId> {
        self.views.keys()
    }
}

impl TileMetadata for InMemoryMetadata {
    fn starting_transform(&self, group: &Group) -> Option<AffineTransform> {
        self.views
            .get(&group.representative())
            .map(|m| m.transform.clone())
    }

    fn dimensions(&self, group: &Group) -> Option<Vec<usize>> {
        self.views
            .get(&group.representative())
            .map(|m| m.dims.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_resolves_groups_through_representative() {
        let mut meta = InMemoryMetadata::new();
        meta.insert(
            ViewId::new(0, 0),
            vec![100, 50],
            AffineTransform::translation(&[10.0, 0.0]),
        );
        let g = Group::new([ViewId::new(0, 0), ViewId::new(0, 7)]).unwrap();
        let bb = meta.bounding_box(&g).expect("known group");
        assert_eq!(bb.min, vec![10.0, 0.0]);
        assert_eq!(bb.max, vec![109.0, 49.0]);

        meta.apply_update(&g, &AffineTransform::translation(&[1.0, 2.0]));
        let t = meta.starting_transform(&g).unwrap();
        assert_eq!(t.translation_part(), vec![11.0, 2.0]);
    }

    #[test]
    fn missing_view_is_an_error() {
        let images = InMemoryImages::new();
        let err = images.load_region(&ViewId::new(1, 2), &[1, 1]).unwrap_err();
        assert_eq!(err, CoreError::MissingView(ViewId::new(1, 2)));
    }
}
