use std::collections::HashSet;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{Result, RotapaperError};

/// Random wallpaper picker.
///
/// When every catalog entry is excluded the exclusion is dropped and the pick
/// is made from the whole catalog, so a small catalog never stalls a cycle.
pub struct Selector<R: Rng = StdRng> {
    rng: R,
}

impl Selector<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl Default for Selector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Selector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Pick a wallpaper for the next monitor.
    ///
    /// With `consistent` set, `previous` (the pick already made this cycle)
    /// is reused as is.
    pub fn pick(
        &mut self,
        catalog: &Catalog,
        excluded: &HashSet<PathBuf>,
        consistent: bool,
        previous: Option<&PathBuf>,
    ) -> Result<PathBuf> {
        if consistent {
            if let Some(previous) = previous {
                return Ok(previous.clone());
            }
        }

        if catalog.is_empty() {
            return Err(RotapaperError::EmptyCatalog);
        }

        let eligible: Vec<&PathBuf> = catalog.iter().filter(|p| !excluded.contains(*p)).collect();

        let chosen = if eligible.is_empty() {
            debug!(count = catalog.len(), "every wallpaper excluded, ignoring exclusion");
            catalog.get(self.rng.random_range(0..catalog.len()))
        } else {
            Some(eligible[self.rng.random_range(0..eligible.len())])
        };

        chosen.cloned().ok_or(RotapaperError::EmptyCatalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(n: usize) -> Catalog {
        Catalog::from_paths((0..n).map(|i| PathBuf::from(format!("/w/{i}.png"))).collect())
    }

    fn seeded() -> Selector<StdRng> {
        Selector::with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_never_returns_excluded() {
        let catalog = catalog(5);
        let excluded: HashSet<PathBuf> = catalog.iter().take(4).cloned().collect();
        let mut selector = seeded();

        for _ in 0..200 {
            let pick = selector.pick(&catalog, &excluded, false, None).unwrap();
            assert_eq!(pick, PathBuf::from("/w/4.png"));
        }
    }

    #[test]
    fn test_fully_excluded_falls_back_to_catalog() {
        let catalog = catalog(3);
        let excluded: HashSet<PathBuf> = catalog.iter().cloned().collect();
        let mut selector = seeded();

        for _ in 0..50 {
            let pick = selector.pick(&catalog, &excluded, false, None).unwrap();
            assert!(catalog.iter().any(|p| *p == pick));
        }
    }

    #[test]
    fn test_consistent_reuses_previous() {
        let catalog = catalog(10);
        let mut selector = seeded();
        let first = selector.pick(&catalog, &HashSet::new(), true, None).unwrap();

        // exclusion is irrelevant once a pick exists
        let excluded: HashSet<PathBuf> = [first.clone()].into_iter().collect();
        for _ in 0..10 {
            let again = selector.pick(&catalog, &excluded, true, Some(&first)).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_uniform_over_catalog() {
        let catalog = catalog(4);
        let mut selector = seeded();
        let mut counts = [0usize; 4];

        for _ in 0..4000 {
            let pick = selector.pick(&catalog, &HashSet::new(), false, None).unwrap();
            let idx = catalog.iter().position(|p| *p == pick).unwrap();
            counts[idx] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "skewed distribution: {counts:?}");
        }
    }

    #[test]
    fn test_empty_catalog() {
        let mut selector = seeded();
        let err = selector
            .pick(&Catalog::default(), &HashSet::new(), false, None)
            .unwrap_err();
        assert!(matches!(err, RotapaperError::EmptyCatalog));
    }
}
