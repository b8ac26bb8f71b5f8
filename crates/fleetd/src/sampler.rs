//! Random selection helpers.
//!
//! Every function takes the generator explicitly so callers can pass a seeded
//! `StdRng` in production and a `StepRng` or seeded generator in tests.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Pick one value with probability proportional to its weight.
///
/// Negative weights count as zero. When the total is not a positive finite
/// number, or rounding leaves the roll past the last bucket, the first item
/// is returned. `None` only for an empty slice.
pub fn weighted_pick<'a, T, R>(items: &'a [Weighted<T>], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    let first = items.first()?;
    let total: f64 = items.iter().map(|item| item.weight.max(0.0)).sum();
    if !total.is_finite() || total <= 0.0 {
        return Some(&first.value);
    }

    let mut remaining = rng.gen::<f64>() * total;
    for item in items {
        let weight = item.weight.max(0.0);
        if remaining < weight {
            return Some(&item.value);
        }
        remaining -= weight;
    }
    Some(&first.value)
}

pub fn uniform_pick<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    if items.is_empty() {
        return None;
    }
    Some(&items[rng.gen_range(0..items.len())])
}

/// Up to `count` distinct items in random order.
pub fn pick_many<'a, T, R>(items: &'a [T], count: usize, rng: &mut R) -> Vec<&'a T>
where
    R: Rng + ?Sized,
{
    items.choose_multiple(rng, count).collect()
}

/// `true` with the given probability; values outside `0.0..=1.0` saturate.
pub fn roll<R>(rng: &mut R, probability: f64) -> bool
where
    R: Rng + ?Sized,
{
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    rng.gen::<f64>() < probability
}

/// Uniform in `min..max`, or `min` when the range is empty.
pub fn range_f64<R>(rng: &mut R, min: f64, max: f64) -> f64
where
    R: Rng + ?Sized,
{
    if max <= min {
        return min;
    }
    rng.gen_range(min..max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn regions() -> Vec<Weighted<&'static str>> {
        vec![
            Weighted::new("us-east-1", 0.5),
            Weighted::new("us-west-2", 0.3),
            Weighted::new("eu-west-1", 0.2),
        ]
    }

    #[test]
    fn weighted_pick_follows_the_roll() {
        let items = regions();
        let mut low = StepRng::new(0, 0);
        assert_eq!(weighted_pick(&items, &mut low), Some(&"us-east-1"));

        let mut high = StepRng::new(u64::MAX, 0);
        assert_eq!(weighted_pick(&items, &mut high), Some(&"eu-west-1"));
    }

    #[test]
    fn weighted_pick_respects_relative_weights() {
        let items = regions();
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = HashMap::new();
        for _ in 0..10_000 {
            let value = weighted_pick(&items, &mut rng).expect("non-empty");
            *seen.entry(*value).or_insert(0usize) += 1;
        }
        assert!(seen["us-east-1"] > seen["us-west-2"]);
        assert!(seen["us-west-2"] > seen["eu-west-1"]);
    }

    #[test]
    fn weighted_pick_falls_back_to_first_on_bad_weights() {
        let zero = vec![Weighted::new("a", 0.0), Weighted::new("b", 0.0)];
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(weighted_pick(&zero, &mut rng), Some(&"a"));

        let infinite = vec![Weighted::new("a", 1.0), Weighted::new("b", f64::INFINITY)];
        assert_eq!(weighted_pick(&infinite, &mut rng), Some(&"a"));

        let negative = vec![Weighted::new("a", -3.0), Weighted::new("b", 1.0)];
        let mut low = StepRng::new(0, 0);
        assert_eq!(weighted_pick(&negative, &mut low), Some(&"b"));
    }

    #[test]
    fn empty_inputs_return_none() {
        let mut rng = StepRng::new(0, 1);
        let empty: Vec<Weighted<u8>> = Vec::new();
        assert_eq!(weighted_pick(&empty, &mut rng), None);
        assert_eq!(uniform_pick::<u8, _>(&[], &mut rng), None);
        assert!(pick_many::<u8, _>(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn pick_many_returns_distinct_items_capped_at_len() {
        let items = ["a", "b", "c"];
        let mut rng = StdRng::seed_from_u64(3);
        let mut picked = pick_many(&items, 5, &mut rng);
        assert_eq!(picked.len(), 3);
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 3);

        assert_eq!(pick_many(&items, 2, &mut rng).len(), 2);
    }

    #[test]
    fn roll_saturates_at_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(!roll(&mut rng, 0.0));
        assert!(!roll(&mut rng, -1.0));
        assert!(roll(&mut rng, 1.0));
        assert!(roll(&mut rng, 2.0));
    }

    #[test]
    fn range_f64_handles_empty_range() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(range_f64(&mut rng, 4.0, 4.0), 4.0);
        let value = range_f64(&mut rng, 1.0, 2.0);
        assert!((1.0..2.0).contains(&value));
    }
}
