//! Separable N-dimensional FFT built from `rustfft` line transforms.

use crate::ComplexGrid;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{FftDirection, FftPlanner};

/// Smallest `m >= n` whose only prime factors are 2, 3 and 5.
pub fn next_fast_size(n: usize) -> usize {
    let mut m = n.max(1);
    loop {
        let mut r = m;
        for p in [2, 3, 5] {
            while r % p == 0 {
                r /= p;
            }
        }
        if r == 1 {
            return m;
        }
        m += 1;
    }
}

/// In-place transform along every axis. The inverse is scaled by `1 / len`.
pub fn fft_nd(grid: &mut ComplexGrid, direction: FftDirection) {
    let dims = grid.dims().to_vec();
    let total: usize = dims.iter().product();
    let mut planner = FftPlanner::<f32>::new();

    let mut stride = 1usize;
    for &n in &dims {
        if n > 1 {
            let fft = planner.plan_fft(n, direction);
            let data = grid.data_mut();
            if stride == 1 {
                // Contiguous lines.
                data.par_chunks_exact_mut(n).for_each_init(
                    || vec![Complex::zero(); fft.get_inplace_scratch_len()],
                    |scratch, line| fft.process_with_scratch(line, scratch),
                );
            } else {
                let block = stride * n;
                let num_lines = total / n;
                let src: &[Complex<f32>] = &*data;
                let lines: Vec<Vec<Complex<f32>>> = (0..num_lines)
                    .into_par_iter()
                    .map_init(
                        || vec![Complex::zero(); fft.get_inplace_scratch_len()],
                        |scratch, l| {
                            let start = (l / stride) * block + l % stride;
                            let mut line: Vec<Complex<f32>> =
                                (0..n).map(|i| src[start + i * stride]).collect();
                            fft.process_with_scratch(&mut line, scratch);
                            line
                        },
                    )
                    .collect();
                for (l, line) in lines.into_iter().enumerate() {
                    let start = (l / stride) * block + l % stride;
                    for (i, v) in line.into_iter().enumerate() {
                        data[start + i * stride] = v;
                    }
                }
            }
        }
        stride *= n;
    }

    if direction == FftDirection::Inverse {
        let scale = 1.0 / total as f32;
        grid.data_mut().par_iter_mut().for_each(|c| *c *= scale);
    }
}
