use crate::PairSkip;
use tilestitch_core::{AffineTransform, BoundingBox, PixelRegion, RasterBox};

/// An image placed in world space.
#[derive(Clone, Debug)]
pub struct Placement {
    to_world: AffineTransform,
    to_local: AffineTransform,
    /// Sample bounds in the image's own pixel frame.
    bounds: BoundingBox,
}

impl Placement {
    /// `None` when `to_world` is not invertible.
    pub fn new(to_world: AffineTransform, bounds: BoundingBox) -> Option<Self> {
        let to_local = to_world.inverse()?;
        Some(Self {
            to_world,
            to_local,
            bounds,
        })
    }

    /// Placement of a loaded region; its origin is honoured.
    pub fn of_region(to_world: AffineTransform, region: &PixelRegion) -> Option<Self> {
        let min: Vec<f64> = region.origin().iter().map(|&o| o as f64).collect();
        let max = min
            .iter()
            .zip(region.dims())
            .map(|(o, &n)| o + n as f64 - 1.0)
            .collect();
        Self::new(to_world, BoundingBox::new(min, max))
    }

    #[inline]
    pub fn to_world(&self) -> &AffineTransform {
        &self.to_world
    }

    pub fn world_bounds(&self) -> BoundingBox {
        self.bounds.transformed(&self.to_world)
    }

    /// Pixels of this image that fall inside a world-space box.
    fn rasterize_local(&self, world: &BoundingBox) -> Result<RasterBox, PairSkip> {
        let local = world
            .transformed(&self.to_local)
            .intersect(&self.bounds)
            .ok_or(PairSkip::NoOverlap)?;
        local.rasterize().ok_or(PairSkip::DegenerateOverlap)
    }
}

/// Overlap of two placed images, in world space and in both pixel frames.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalOverlap {
    pub world: BoundingBox,
    pub a: RasterBox,
    pub b: RasterBox,
}

/// Rasterized overlap of two placements.
///
/// Both local boxes use ceil on the lower and floor on the upper bound. When
/// they end up with different sizes the overlap is degenerate.
pub fn local_overlap(a: &Placement, b: &Placement) -> Result<LocalOverlap, PairSkip> {
    let world = a
        .world_bounds()
        .intersect(&b.world_bounds())
        .ok_or(PairSkip::NoOverlap)?;
    let ra = a.rasterize_local(&world)?;
    let rb = b.rasterize_local(&world)?;
    if ra.size != rb.size {
        return Err(PairSkip::DegenerateOverlap);
    }
    Ok(LocalOverlap { world, a: ra, b: rb })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(dims: &[usize], t: &[f64]) -> Placement {
        Placement::new(AffineTransform::translation(t), BoundingBox::of_dims(dims)).unwrap()
    }

    #[test]
    fn overlap_of_side_by_side_tiles() {
        let a = placed(&[100, 80], &[0.0, 0.0]);
        let b = placed(&[100, 80], &[80.0, 5.0]);
        let o = local_overlap(&a, &b).unwrap();
        assert_eq!(o.a.min, vec![80, 5]);
        assert_eq!(o.b.min, vec![0, 0]);
        assert_eq!(o.a.size, vec![20, 75]);
        assert_eq!(o.a.size, o.b.size);
    }

    #[test]
    fn fractional_offsets_round_inward_consistently() {
        let a = placed(&[100, 80], &[0.0, 0.0]);
        let b = placed(&[100, 80], &[80.5, -3.25]);
        let o = local_overlap(&a, &b).unwrap();
        assert_eq!(o.a.min, vec![81, 0]);
        assert_eq!(o.b.min, vec![0, 4]);
        assert_eq!(o.a.size, vec![19, 76]);
    }

    #[test]
    fn disjoint_tiles_do_not_overlap() {
        let a = placed(&[100, 80], &[0.0, 0.0]);
        let b = placed(&[100, 80], &[120.0, 0.0]);
        assert_eq!(local_overlap(&a, &b), Err(PairSkip::NoOverlap));
    }

    #[test]
    fn scaled_placement_maps_to_downsampled_pixels() {
        let a = Placement::new(AffineTransform::scaling(&[2.0, 2.0]), BoundingBox::of_dims(&[50, 40]))
            .unwrap();
        let b = Placement::new(
            AffineTransform::translation(&[80.0, 0.0]).compose(&AffineTransform::scaling(&[2.0, 2.0])),
            BoundingBox::of_dims(&[50, 40]),
        )
        .unwrap();
        let o = local_overlap(&a, &b).unwrap();
        assert_eq!(o.a.min, vec![40, 0]);
        assert_eq!(o.a.size, vec![10, 40]);
        assert_eq!(o.b.min, vec![0, 0]);
    }
}
