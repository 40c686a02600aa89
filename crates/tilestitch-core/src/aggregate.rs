use crate::{CoreError, Group, ImageLoader, PixelRegion, ViewId};
use serde::{Deserialize, Serialize};

/// How a multi-view group is reduced to one representative image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Sample-wise mean over all views (all views must share one shape).
    #[default]
    Average,
    /// The view with the highest mean intensity.
    PickBrightest,
    /// A specific view; falls back to the representative when not in the group.
    PickSpecific(ViewId),
}

impl Aggregation {
    pub fn aggregate(
        &self,
        group: &Group,
        loader: &dyn ImageLoader,
        downsampling: &[usize],
    ) -> Result<PixelRegion, CoreError> {
        if group.len() == 1 {
            return loader.load_region(&group.representative(), downsampling);
        }
        match self {
            Aggregation::Average => average(group, loader, downsampling),
            Aggregation::PickBrightest => {
                let mut best: Option<(f64, PixelRegion)> = None;
                for v in group.views() {
                    let region = loader.load_region(v, downsampling)?;
                    let mean = region.mean();
                    if best.as_ref().is_none_or(|(m, _)| mean > *m) {
                        best = Some((mean, region));
                    }
                }
                best.map(|(_, r)| r).ok_or(CoreError::EmptyGroup)
            }
            Aggregation::PickSpecific(view) => {
                let view = if group.contains(view) {
                    *view
                } else {
                    log::debug!("{view} not in group {group}, using representative");
                    group.representative()
                };
                loader.load_region(&view, downsampling)
            }
        }
    }
}

fn average(
    group: &Group,
    loader: &dyn ImageLoader,
    downsampling: &[usize],
) -> Result<PixelRegion, CoreError> {
    let first = loader.load_region(&group.representative(), downsampling)?;
    let dims = first.dims().to_vec();
    let origin = first.origin().to_vec();
    let mut acc: Vec<f64> = first.data().iter().map(|&v| v as f64).collect();
    let mut count = 1usize;

    // The representative is the first view of the sorted set.
    for v in group.views().iter().skip(1) {
        let region = loader.load_region(v, downsampling)?;
        if region.dims() != dims.as_slice() {
            return Err(CoreError::ShapeMismatch {
                expected: dims,
                got: region.dims().to_vec(),
            });
        }
        for (a, &s) in acc.iter_mut().zip(region.data()) {
            *a += s as f64;
        }
        count += 1;
    }

    let data = acc.into_iter().map(|v| (v / count as f64) as f32).collect();
    Ok(PixelRegion::new(dims, data)?.with_origin(origin))
}
