use rand::Rng;
use rand::seq::IndexedRandom;

use super::index::MediaGroup;

/// Draws `min(n, groups.len())` distinct groups uniformly at random.
pub fn sample(groups: &[MediaGroup], n: usize) -> Vec<MediaGroup> {
    sample_with(groups, n, &mut rand::rng())
}

pub fn sample_with<R>(groups: &[MediaGroup], n: usize, rng: &mut R) -> Vec<MediaGroup>
where
    R: Rng + ?Sized,
{
    groups.choose_multiple(rng, n).cloned().collect()
}
