//! Deterministic Top-N selection over scored mappings.

use std::cmp::Ordering;

/// Numeric score usable by [`top_n`].
pub trait Score: Copy {
    fn as_f64(self) -> f64;
}

macro_rules! impl_score {
    ($($t:ty),*) => {
        $(impl Score for $t {
            fn as_f64(self) -> f64 {
                self as f64
            }
        })*
    };
}

impl_score!(f64, f32, u64, u32, usize, i64, i32);

/// Return the `n` highest-scoring entries, descending by score.
///
/// Ties are broken by the key's natural order so the output is stable across
/// runs and independent of the input's iteration order. `n == 0` yields an
/// empty vector; `n` larger than the input yields every entry sorted.
pub fn top_n<'a, K, S, I>(scores: I, n: usize) -> Vec<(K, S)>
where
    K: Ord + Clone + 'a,
    S: Score + 'a,
    I: IntoIterator<Item = (&'a K, &'a S)>,
{
    if n == 0 {
        return Vec::new();
    }
    let mut entries: Vec<(K, S)> = scores.into_iter().map(|(k, s)| (k.clone(), *s)).collect();
    entries.sort_by(|(ka, sa), (kb, sb)| {
        sb.as_f64()
            .partial_cmp(&sa.as_f64())
            .unwrap_or(Ordering::Equal)
            .then_with(|| ka.cmp(kb))
    });
    entries.truncate(n);
    entries
}
