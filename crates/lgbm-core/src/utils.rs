//! Thread-count handling for binning, histogram building and prediction.

use rayon::prelude::*;

// =============================================================================
// Parallelism
// =============================================================================

/// Whether a component may fan out over rayon.
///
/// Components take this flag and never build pools themselves; each public
/// entry point installs one through [`run_with_threads`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// `num_threads` as configured: 0 follows the current rayon pool, 1 is
    /// sequential, anything larger is parallel.
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        match n_threads {
            1 => Parallelism::Sequential,
            0 if rayon::current_num_threads() == 1 => Parallelism::Sequential,
            _ => Parallelism::Parallel,
        }
    }

    #[inline]
    pub fn is_parallel(self) -> bool {
        self == Parallelism::Parallel
    }

    /// `f(0), .., f(n - 1)` in index order. Used for per-feature work.
    pub fn map_range<B, F>(self, n: usize, f: F) -> Vec<B>
    where
        B: Send,
        F: Fn(usize) -> B + Sync + Send,
    {
        match self {
            Parallelism::Parallel => (0..n).into_par_iter().map(f).collect(),
            Parallelism::Sequential => (0..n).map(f).collect(),
        }
    }

    /// `f(i, &mut items[i])` for every item.
    pub fn for_each_mut<T, F>(self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        match self {
            Parallelism::Parallel => items.par_iter_mut().enumerate().for_each(|(i, item)| f(i, item)),
            Parallelism::Sequential => items.iter_mut().enumerate().for_each(|(i, item)| f(i, item)),
        }
    }

    /// `f(chunk_index, chunk)` over `chunk_len`-sized pieces of `items`; the
    /// last chunk may be shorter. Score and prediction buffers are split this
    /// way so each task owns a contiguous row block.
    pub fn for_each_chunk_mut<T, F>(self, items: &mut [T], chunk_len: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        let chunk_len = chunk_len.max(1);
        match self {
            Parallelism::Parallel => items
                .par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| f(i, chunk)),
            Parallelism::Sequential => items
                .chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(i, chunk)| f(i, chunk)),
        }
    }
}

// =============================================================================
// Pools
// =============================================================================

/// Run `f` under the pool `num_threads` asks for.
///
/// `0` runs on whatever pool is current (the global one unless the caller
/// installed another), so boosting rounds do not rebuild a pool each call.
/// An explicit count reuses the current pool when it already has that many
/// threads and otherwise builds a dedicated one; if that fails, `f` runs
/// sequentially.
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);
    if !parallelism.is_parallel() || n_threads == 0 || rayon::current_num_threads() == n_threads {
        return f(parallelism);
    }
    match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
        Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
        Err(_) => f(Parallelism::Sequential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_counts() {
        assert_eq!(Parallelism::from_threads(1), Parallelism::Sequential);
        assert!(Parallelism::from_threads(4).is_parallel());
    }

    #[test]
    fn explicit_pool_size_is_honoured() {
        assert_eq!(run_with_threads(3, |_| rayon::current_num_threads()), 3);
        let nested = run_with_threads(3, |_| run_with_threads(3, |_| rayon::current_num_threads()));
        assert_eq!(nested, 3);
        assert_eq!(run_with_threads(1, |par| par), Parallelism::Sequential);
    }

    #[test]
    fn map_range_keeps_feature_order() {
        let squares = |f: usize| f * f;
        let seq = Parallelism::Sequential.map_range(6, squares);
        assert_eq!(seq, [0, 1, 4, 9, 16, 25]);
        assert_eq!(Parallelism::Parallel.map_range(6, squares), seq);
        assert!(Parallelism::Parallel.map_range(0, squares).is_empty());
    }

    #[test]
    fn chunks_cover_a_ragged_tail() {
        for par in [Parallelism::Sequential, Parallelism::Parallel] {
            let mut scores = vec![0.0f64; 7];
            par.for_each_chunk_mut(&mut scores, 3, |block, chunk| {
                chunk.iter_mut().for_each(|s| *s = block as f64);
            });
            assert_eq!(scores, [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        }
    }

    #[test]
    fn for_each_mut_sees_indices() {
        let mut offsets = vec![0usize; 4];
        Parallelism::Parallel.for_each_mut(&mut offsets, |i, v| *v = 10 * i);
        assert_eq!(offsets, [0, 10, 20, 30]);
    }
}
