//! Similarity graph over feature vectors

use nalgebra::DMatrix;
use ndarray::Array2;
use rayon::prelude::*;

/// Dense radial-basis-function affinity matrix
///
/// $$ A_{ij} = \exp\left(-\gamma \lVert x_i - x_j \rVert^2\right) $$
///
/// The matrix is `n × n` for `n` feature rows, so both time and memory grow
/// quadratically with the number of grid cells. Rows are filled in parallel.
pub(crate) fn rbf_affinity(features: &Array2<f64>, gamma: f64) -> DMatrix<f64> {
    let n = features.nrows();
    let data: Vec<f64> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let xi = features.row(i);
            (0..n).map(move |j| {
                let d2: f64 = xi
                    .iter()
                    .zip(features.row(j).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (-gamma * d2).exp()
            })
        })
        .collect();

    // Symmetric, so row-major data is also a valid column-major layout
    DMatrix::from_vec(n, n, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn diagonal_is_one_and_symmetric() {
        let features = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let a = rbf_affinity(&features, 0.5);
        assert_eq!(a.shape(), (3, 3));
        for i in 0..3 {
            assert_eq!(a[(i, i)], 1.0);
            for j in 0..3 {
                assert_eq!(a[(i, j)], a[(j, i)]);
            }
        }
        assert!((a[(0, 1)] - (-0.5_f64).exp()).abs() < 1e-15);
        assert!((a[(0, 2)] - (-2.0_f64).exp()).abs() < 1e-15);
        assert!((a[(1, 2)] - (-2.5_f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn distant_points_are_disconnected() {
        let features = array![[0.0, 80.0, 0.0], [100.0, 80.0, 0.0]];
        let a = rbf_affinity(&features, 1.0);
        assert_eq!(a[(0, 1)], 0.0);
    }
}
