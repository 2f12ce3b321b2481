//! Spectral embedding of an affinity graph

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;

/// Embed every graph node into `n_components` dimensions
///
/// Uses the eigenvectors of the symmetric normalised Laplacian
/// $L = I - D^{-1/2} A D^{-1/2}$ belonging to its `n_components` smallest
/// eigenvalues, rescaled by $D^{-1/2}$. Self-loops are ignored when computing
/// degrees; isolated nodes are given unit degree.
///
/// Each embedding column is sign-normalised so that its largest-magnitude
/// entry is positive, making the result independent of the eigensolver's sign
/// convention.
pub(crate) fn spectral_embedding(affinity: &DMatrix<f64>, n_components: usize) -> Array2<f64> {
    let n = affinity.nrows();

    let degrees: Vec<f64> = (0..n)
        .map(|i| (0..n).filter(|&j| j != i).map(|j| affinity[(i, j)]).sum())
        .collect();
    let isolated: Vec<bool> = degrees.iter().map(|&d| d == 0.0).collect();
    let scale: Vec<f64> = degrees
        .iter()
        .map(|&d| if d == 0.0 { 1.0 } else { d.sqrt() })
        .collect();

    let laplacian = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            if isolated[i] {
                0.0
            } else {
                1.0
            }
        } else {
            -affinity[(i, j)] / (scale[i] * scale[j])
        }
    });

    let eigen = SymmetricEigen::new(laplacian);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let mut embedding = Array2::<f64>::zeros((n, n_components));
    for (c, &k) in order.iter().take(n_components).enumerate() {
        let vector = eigen.eigenvectors.column(k);
        for i in 0..n {
            embedding[[i, c]] = vector[i] / scale[i];
        }
    }

    for mut column in embedding.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }

    embedding
}
