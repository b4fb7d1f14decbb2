//! Bounded random subsampling

use crate::error::Result;
use polars::prelude::*;
use rand::Rng;
use rand::seq::index;
use tracing::debug;

/// Number of rows a capped sample keeps
pub fn sample_size(available: usize, cap: Option<usize>) -> usize {
    cap.map_or(available, |cap| cap.min(available))
}

/// Keep `min(cap, height)` rows chosen uniformly without replacement
///
/// Rows keep their original relative order. With `cap = None`, or a cap at
/// least the frame height, the frame is returned unchanged and the generator
/// is not advanced.
pub fn sample_rows<R: Rng + ?Sized>(
    df: DataFrame,
    cap: Option<usize>,
    rng: &mut R,
) -> Result<DataFrame> {
    let available = df.height();
    let keep = sample_size(available, cap);
    if keep == available {
        return Ok(df);
    }

    let mut picked = index::sample(rng, available, keep).into_vec();
    picked.sort_unstable();
    let idx = IdxCa::from_vec(
        "idx".into(),
        picked.into_iter().map(|i| i as IdxSize).collect(),
    );

    debug!("Sampled {} of {} rows", keep, available);
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn numbered(n: i64) -> DataFrame {
        df!("id" => (0..n).collect::<Vec<i64>>()).unwrap()
    }

    #[test]
    fn test_sample_size_is_min_of_cap_and_available() {
        assert_eq!(sample_size(10, Some(3)), 3);
        assert_eq!(sample_size(2, Some(3)), 2);
        assert_eq!(sample_size(7, None), 7);
    }

    #[test]
    fn test_small_frame_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let out = sample_rows(numbered(5), Some(10), &mut rng).unwrap();
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn test_sample_is_reproducible_and_ordered() {
        let first = sample_rows(numbered(1000), Some(50), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let second =
            sample_rows(numbered(1000), Some(50), &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert!(first.equals(&second));
        assert_eq!(first.height(), 50);

        let ids: Vec<i64> = first
            .column("id")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
