use crate::CoreError;

/// Dense 2D or 3D sample grid, x fastest.
///
/// `origin` is the position of sample `[0, 0(, 0)]` in the pixel frame of the
/// view the region was cut from.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelRegion {
    dims: Vec<usize>,
    origin: Vec<i64>,
    data: Vec<f32>,
}

fn check_dims(dims: &[usize], len: usize) -> Result<(), CoreError> {
    if dims.len() != 2 && dims.len() != 3 {
        return Err(CoreError::UnsupportedDimensionality(dims.len()));
    }
    if dims.iter().any(|&n| n == 0) || dims.iter().product::<usize>() != len {
        return Err(CoreError::InvalidDimensions {
            dims: dims.to_vec(),
            len,
        });
    }
    Ok(())
}

impl PixelRegion {
    pub fn new(dims: Vec<usize>, data: Vec<f32>) -> Result<Self, CoreError> {
        check_dims(&dims, data.len())?;
        let origin = vec![0; dims.len()];
        Ok(Self { dims, origin, data })
    }

    pub fn with_origin(mut self, origin: Vec<i64>) -> Self {
        debug_assert_eq!(origin.len(), self.dims.len());
        self.origin = origin;
        self
    }

    /// Build a region by evaluating `f` at every sample position.
    pub fn from_fn(dims: Vec<usize>, mut f: impl FnMut(&[usize]) -> f32) -> Result<Self, CoreError> {
        let len: usize = dims.iter().product();
        check_dims(&dims, len)?;
        let mut data = Vec::with_capacity(len);
        let mut pos = vec![0usize; dims.len()];
        for _ in 0..len {
            data.push(f(&pos));
            for (k, p) in pos.iter_mut().enumerate() {
                *p += 1;
                if *p < dims[k] {
                    break;
                }
                *p = 0;
            }
        }
        Self::new(dims, data)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn origin(&self) -> &[i64] {
        &self.origin
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn index(&self, pos: &[usize]) -> usize {
        let mut idx = 0;
        let mut stride = 1;
        for (p, n) in pos.iter().zip(&self.dims) {
            idx += p * stride;
            stride *= n;
        }
        idx
    }

    #[inline]
    pub fn get(&self, pos: &[usize]) -> f32 {
        self.data[self.index(pos)]
    }

    pub fn mean(&self) -> f64 {
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        sum / self.data.len() as f64
    }

    /// Copy out the sub-grid starting at `min` (local sample coordinates).
    pub fn crop(&self, min: &[i64], size: &[usize]) -> Result<PixelRegion, CoreError> {
        let out_of_bounds = || CoreError::CropOutOfBounds {
            min: min.to_vec(),
            size: size.to_vec(),
            dims: self.dims.clone(),
        };
        if min.len() != self.ndim() || size.len() != self.ndim() {
            return Err(out_of_bounds());
        }
        for k in 0..self.ndim() {
            if min[k] < 0 || size[k] == 0 || min[k] as usize + size[k] > self.dims[k] {
                return Err(out_of_bounds());
            }
        }

        let start: Vec<usize> = min.iter().map(|&m| m as usize).collect();
        let row = size[0];
        let rows: usize = size[1..].iter().product();
        let mut data = Vec::with_capacity(row * rows);
        let mut pos = start.clone();
        for _ in 0..rows {
            let i0 = self.index(&pos);
            data.extend_from_slice(&self.data[i0..i0 + row]);
            for k in 1..self.ndim() {
                pos[k] += 1;
                if pos[k] < start[k] + size[k] {
                    break;
                }
                pos[k] = start[k];
            }
        }

        let origin = self.origin.iter().zip(min).map(|(o, m)| o + m).collect();
        Ok(PixelRegion {
            dims: size.to_vec(),
            origin,
            data,
        })
    }

    /// Block-average downsampling; trailing samples that do not fill a block are dropped.
    ///
    /// `factors` may be longer than the dimensionality (extra entries are ignored).
    pub fn downsample(&self, factors: &[usize]) -> Result<PixelRegion, CoreError> {
        let f: Vec<usize> = (0..self.ndim())
            .map(|k| factors.get(k).copied().unwrap_or(1).max(1))
            .collect();
        if f.iter().all(|&v| v == 1) {
            return Ok(self.clone());
        }
        let dims: Vec<usize> = self.dims.iter().zip(&f).map(|(n, s)| n / s).collect();
        if dims.iter().any(|&n| n == 0) {
            return Err(CoreError::InvalidDimensions {
                dims,
                len: self.data.len(),
            });
        }
        let block = f.iter().product::<usize>() as f32;
        let src = self;
        let out = PixelRegion::from_fn(dims, |pos| {
            let mut acc = 0.0f32;
            let mut off = vec![0usize; pos.len()];
            loop {
                let p: Vec<usize> = (0..pos.len()).map(|k| pos[k] * f[k] + off[k]).collect();
                acc += src.get(&p);
                let mut k = 0;
                loop {
                    if k == off.len() {
                        return acc / block;
                    }
                    off[k] += 1;
                    if off[k] < f[k] {
                        break;
                    }
                    off[k] = 0;
                    k += 1;
                }
            }
        })?;
        let origin = self
            .origin
            .iter()
            .zip(&f)
            .map(|(&o, &s)| o.div_euclid(s as i64))
            .collect();
        Ok(out.with_origin(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dims: Vec<usize>) -> PixelRegion {
        PixelRegion::from_fn(dims, |p| {
            p.iter()
                .enumerate()
                .map(|(k, &v)| (v * 10usize.pow(k as u32)) as f32)
                .sum()
        })
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(PixelRegion::new(vec![4, 4], vec![0.0; 15]).is_err());
        assert!(PixelRegion::new(vec![16], vec![0.0; 16]).is_err());
        assert!(PixelRegion::new(vec![0, 4], vec![]).is_err());
    }

    #[test]
    fn crop_copies_the_right_samples() {
        let r = ramp(vec![6, 5, 4]);
        let c = r.crop(&[2, 1, 3], &[3, 2, 1]).unwrap();
        assert_eq!(c.dims(), &[3, 2, 1]);
        assert_eq!(c.origin(), &[2, 1, 3]);
        assert_eq!(c.get(&[0, 0, 0]), r.get(&[2, 1, 3]));
        assert_eq!(c.get(&[2, 1, 0]), r.get(&[4, 2, 3]));
    }

    #[test]
    fn crop_out_of_bounds_fails() {
        let r = ramp(vec![6, 5]);
        assert!(r.crop(&[4, 0], &[3, 1]).is_err());
        assert!(r.crop(&[-1, 0], &[2, 1]).is_err());
    }

    #[test]
    fn downsample_averages_blocks() {
        let r = PixelRegion::new(vec![4, 2], vec![1.0, 3.0, 5.0, 7.0, 1.0, 3.0, 5.0, 7.0]).unwrap();
        let d = r.downsample(&[2, 2, 1]).unwrap();
        assert_eq!(d.dims(), &[2, 1]);
        assert_eq!(d.data(), &[2.0, 6.0]);
    }
}
