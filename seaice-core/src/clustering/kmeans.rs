//! Lloyd's k-means with k-means++ seeding

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Outcome of a single k-means run
#[derive(Debug, Clone)]
pub(crate) struct KMeansFit {
    pub labels: Vec<usize>,
    pub inertia: f64,
}

/// Cluster the rows of `data` into `k` groups
///
/// Runs `n_init` independently seeded restarts in parallel and keeps the one
/// with the lowest inertia (sum of squared distances to the assigned centre).
/// Run `r` is seeded with `seed + r`, so the result is deterministic for a
/// given seed. Convergence is declared when the total squared centre shift
/// drops below `tol` times the mean per-feature variance.
///
/// `data` must have at least `k` rows and `k`, `n_init` must be positive.
pub(crate) fn kmeans(
    data: &Array2<f64>,
    k: usize,
    n_init: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
) -> KMeansFit {
    let threshold = tol * mean_variance(data);

    let fits: Vec<KMeansFit> = (0..n_init)
        .into_par_iter()
        .map(|run| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(run as u64));
            single_run(data, k, max_iter, threshold, &mut rng)
        })
        .collect();

    fits.into_iter()
        .reduce(|best, fit| if fit.inertia < best.inertia { fit } else { best })
        .unwrap_or(KMeansFit {
            labels: vec![0; data.nrows()],
            inertia: 0.0,
        })
}

fn single_run(
    data: &Array2<f64>,
    k: usize,
    max_iter: usize,
    threshold: f64,
    rng: &mut StdRng,
) -> KMeansFit {
    let n = data.nrows();
    let mut centers = kmeans_plus_plus(data, k, rng);
    let mut labels = vec![0; n];

    for _ in 0..max_iter {
        assign(data, &centers, &mut labels);
        let updated = update_centers(data, &centers, &mut labels, k);

        let shift: f64 = (&updated - &centers).mapv(|v| v * v).sum();
        centers = updated;
        if shift <= threshold {
            break;
        }
    }

    let inertia = assign(data, &centers, &mut labels);
    KMeansFit { labels, inertia }
}

/// k-means++ seeding: each new centre is drawn with probability proportional
/// to its squared distance from the nearest centre chosen so far
fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centers = Array2::<f64>::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in closest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point coincides with a centre already
            rng.gen_range(0..n)
        };

        centers.row_mut(c).assign(&data.row(chosen));
        for (i, row) in data.rows().into_iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(row, data.row(chosen)));
        }
    }

    centers
}

/// Assign every row to its nearest centre, returning the inertia
fn assign(data: &Array2<f64>, centers: &Array2<f64>, labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (i, row) in data.rows().into_iter().enumerate() {
        let (best, distance) = nearest(row, centers);
        labels[i] = best;
        inertia += distance;
    }
    inertia
}

/// Recompute centres as the mean of their members
///
/// An empty cluster takes over the point furthest from its current centre.
fn update_centers(
    data: &Array2<f64>,
    centers: &Array2<f64>,
    labels: &mut [usize],
    k: usize,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];
    for (row, &label) in data.rows().into_iter().zip(labels.iter()) {
        let mut target = sums.row_mut(label);
        target += &row;
        counts[label] += 1;
    }

    for c in 0..k {
        if counts[c] > 0 {
            continue;
        }
        let furthest = data
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| counts[labels[*i]] > 1)
            .map(|(i, row)| (i, squared_distance(row, centers.row(labels[i]))))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        if let Some(i) = furthest {
            let previous = labels[i];
            let point = data.row(i);
            {
                let mut source = sums.row_mut(previous);
                source -= &point;
            }
            counts[previous] -= 1;
            sums.row_mut(c).assign(&point);
            counts[c] = 1;
            labels[i] = c;
        }
    }

    let mut updated = centers.clone();
    for (c, (sum, &count)) in sums.axis_iter(Axis(0)).zip(&counts).enumerate() {
        if count > 0 {
            updated.row_mut(c).assign(&sum.mapv(|v| v / count as f64));
        }
    }
    updated
}

fn nearest(point: ArrayView1<'_, f64>, centers: &Array2<f64>) -> (usize, f64) {
    centers
        .rows()
        .into_iter()
        .map(|center| squared_distance(point, center))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (c, d)| if d < best.1 { (c, d) } else { best })
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_variance(data: &Array2<f64>) -> f64 {
    if data.nrows() == 0 || data.ncols() == 0 {
        return 0.0;
    }
    data.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]
    }

    #[test]
    fn separates_blobs() {
        let fit = kmeans(&two_blobs(), 2, 5, 100, 1e-4, 7);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[3], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn single_cluster_is_all_zero() {
        let fit = kmeans(&two_blobs(), 1, 3, 100, 1e-4, 0);
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn deterministic_for_seed() {
        let data = array![[0.0], [1.0], [2.0], [5.0], [6.0], [9.0], [10.0]];
        let a = kmeans(&data, 3, 4, 50, 1e-4, 42);
        let b = kmeans(&data, 3, 4, 50, 1e-4, 42);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn identical_points_do_not_stall() {
        let data = Array2::from_elem((5, 3), 1.0);
        let fit = kmeans(&data, 3, 2, 10, 1e-4, 1);
        assert_eq!(fit.labels.len(), 5);
        assert!(fit.labels.iter().all(|&l| l < 3));
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn every_cluster_used_when_points_allow() {
        let data = array![[0.0], [1.0], [2.0], [3.0]];
        let fit = kmeans(&data, 4, 3, 50, 1e-4, 3);
        let mut seen = fit.labels.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }
}
