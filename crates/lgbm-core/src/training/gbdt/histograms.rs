//! Gradient histograms over binned features.
//!
//! One histogram covers every feature: feature `f` owns the bins
//! `offsets[f]..offsets[f + 1]`. Bins accumulate in f64 even though
//! gradients are f32, since the subtraction trick (sibling = parent - child)
//! takes differences of large sums.

use crate::data::BinColumn;
use crate::training::GradsTuple;
use crate::utils::Parallelism;

/// Accumulated gradient, hessian and row count of one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramBin {
    pub grad: f64,
    pub hess: f64,
    pub count: u32,
}

impl HistogramBin {
    #[inline]
    fn add(&mut self, pair: GradsTuple) {
        self.grad += pair.grad as f64;
        self.hess += pair.hess as f64;
        self.count += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: Box<[HistogramBin]>,
}

impl Histogram {
    pub fn zeros(total_bins: usize) -> Self {
        Self {
            bins: vec![HistogramBin::default(); total_bins].into_boxed_slice(),
        }
    }

    /// Histogram of `rows`, one feature per task.
    pub fn build(
        offsets: &[usize],
        columns: &[BinColumn],
        rows: &[u32],
        grads: &[GradsTuple],
        parallelism: Parallelism,
    ) -> Self {
        let total_bins = offsets.last().copied().unwrap_or(0);
        let mut histogram = Self::zeros(total_bins);

        let mut slices = histogram.feature_slices_mut(offsets);
        parallelism.for_each_mut(&mut slices, |f, bins| {
            build_feature(bins, &columns[f], rows, grads);
        });
        histogram
    }

    /// `parent - child`, the histogram of the sibling.
    pub fn sibling(parent: &Histogram, child: &Histogram) -> Self {
        debug_assert_eq!(parent.bins.len(), child.bins.len());
        let bins = parent
            .bins
            .iter()
            .zip(child.bins.iter())
            .map(|(p, c)| HistogramBin {
                grad: p.grad - c.grad,
                hess: p.hess - c.hess,
                count: p.count - c.count,
            })
            .collect();
        Self { bins }
    }

    #[inline]
    pub fn feature(&self, offsets: &[usize], feature: usize) -> &[HistogramBin] {
        &self.bins[offsets[feature]..offsets[feature + 1]]
    }

    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    /// Disjoint mutable slices, one per feature.
    fn feature_slices_mut(&mut self, offsets: &[usize]) -> Vec<&mut [HistogramBin]> {
        let mut slices = Vec::with_capacity(offsets.len().saturating_sub(1));
        let mut rest: &mut [HistogramBin] = &mut self.bins;
        for w in offsets.windows(2) {
            let (head, tail) = rest.split_at_mut(w[1] - w[0]);
            slices.push(head);
            rest = tail;
        }
        slices
    }
}

#[inline]
fn build_feature(bins: &mut [HistogramBin], column: &BinColumn, rows: &[u32], grads: &[GradsTuple]) {
    match column {
        BinColumn::U8(values) => {
            for &row in rows {
                bins[values[row as usize] as usize].add(grads[row as usize]);
            }
        }
        BinColumn::U16(values) => {
            for &row in rows {
                bins[values[row as usize] as usize].add(grads[row as usize]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BinMapper;

    fn setup() -> (Vec<usize>, Vec<BinColumn>, Vec<GradsTuple>) {
        let m2 = BinMapper::numerical(vec![0.5, f64::MAX], 0.0, 1.0);
        let m3 = BinMapper::numerical(vec![0.5, 1.5, f64::MAX], 0.0, 2.0);
        let columns = vec![
            BinColumn::from_values(&m2, &[0.0, 1.0, 0.0, 1.0]),
            BinColumn::from_values(&m3, &[2.0, 1.0, 0.0, 2.0]),
        ];
        let grads = [1.0f32, -2.0, 3.0, 0.5]
            .iter()
            .map(|&g| GradsTuple { grad: g, hess: 1.0 })
            .collect();
        (vec![0, 2, 5], columns, grads)
    }

    #[test]
    fn build_accumulates_per_feature() {
        let (offsets, columns, grads) = setup();
        let hist = Histogram::build(&offsets, &columns, &[0, 1, 2, 3], &grads, Parallelism::Sequential);
        let f0 = hist.feature(&offsets, 0);
        assert_eq!(f0[0], HistogramBin { grad: 4.0, hess: 2.0, count: 2 });
        assert_eq!(f0[1], HistogramBin { grad: -1.5, hess: 2.0, count: 2 });
        let f1 = hist.feature(&offsets, 1);
        assert_eq!(f1.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 1, 2]);
        assert_eq!(f1[2].grad, 1.5);
    }

    #[test]
    fn parallel_matches_sequential() {
        let (offsets, columns, grads) = setup();
        let rows = [3, 1, 0];
        let seq = Histogram::build(&offsets, &columns, &rows, &grads, Parallelism::Sequential);
        let par = Histogram::build(&offsets, &columns, &rows, &grads, Parallelism::Parallel);
        assert_eq!(seq, par);
    }

    #[test]
    fn sibling_is_parent_minus_child() {
        let (offsets, columns, grads) = setup();
        let parent = Histogram::build(&offsets, &columns, &[0, 1, 2, 3], &grads, Parallelism::Sequential);
        let left = Histogram::build(&offsets, &columns, &[0, 2], &grads, Parallelism::Sequential);
        let right = Histogram::build(&offsets, &columns, &[1, 3], &grads, Parallelism::Sequential);
        assert_eq!(Histogram::sibling(&parent, &left), right);
    }
}
