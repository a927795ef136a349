//! Per-row gradient/hessian storage.

/// One (gradient, hessian) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradsTuple {
    pub grad: f32,
    pub hess: f32,
}

/// Gradient buffer for a single-output model, one pair per training row.
#[derive(Debug, Clone, Default)]
pub struct Gradients {
    pairs: Vec<GradsTuple>,
}

impl Gradients {
    pub fn new(n_rows: usize) -> Self {
        Self {
            pairs: vec![GradsTuple::default(); n_rows],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn pairs(&self) -> &[GradsTuple] {
        &self.pairs
    }

    #[inline]
    pub fn pairs_mut(&mut self) -> &mut [GradsTuple] {
        &mut self.pairs
    }

    /// Overwrite from caller-supplied gradient and hessian slices.
    ///
    /// Both slices must have `n_rows` entries.
    pub fn copy_from(&mut self, grad: &[f32], hess: &[f32]) {
        debug_assert_eq!(grad.len(), self.pairs.len());
        debug_assert_eq!(hess.len(), self.pairs.len());
        for ((pair, &g), &h) in self.pairs.iter_mut().zip(grad).zip(hess) {
            pair.grad = g;
            pair.hess = h;
        }
    }

    /// Sum of gradients and hessians over the given rows.
    pub fn sum_rows(&self, rows: &[u32]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            let p = self.pairs[r as usize];
            (g + p.grad as f64, h + p.hess as f64)
        })
    }
}
