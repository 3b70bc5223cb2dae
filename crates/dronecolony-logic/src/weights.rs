//! Normalized weight store.
//!
//! Colony priorities and faction distribution are both expressed as a set
//! of keys whose weights lie in `[0, 1]`. `add_weight` changes one key and
//! rescales the others so the total returns to 1.0.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightElem<K> {
    pub key: K,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightContainer<K> {
    elems: Vec<WeightElem<K>>,
}

impl<K: Copy + PartialEq> WeightContainer<K> {
    /// All keys start at zero weight.
    pub fn new(keys: &[K]) -> Self {
        Self {
            elems: keys
                .iter()
                .map(|&key| WeightElem { key, weight: 0.0 })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightElem<K>> {
        self.elems.iter()
    }

    pub fn total(&self) -> f64 {
        self.elems.iter().map(|e| e.weight).sum()
    }

    pub fn get_weight(&self, key: K) -> f64 {
        self.elems
            .iter()
            .find(|e| e.key == key)
            .map_or(0.0, |e| e.weight)
    }

    /// Raw assignment used while setting up the initial distribution.
    /// The caller is responsible for the total.
    pub fn set_weight(&mut self, key: K, weight: f64) {
        if let Some(e) = self.elems.iter_mut().find(|e| e.key == key) {
            e.weight = weight.clamp(0.0, 1.0);
        }
    }

    /// Shift one key by `delta` (clamped to `[0, 1]`) and rescale every other
    /// key so that the weights sum to 1.
    pub fn add_weight(&mut self, key: K, delta: f64) {
        let Some(index) = self.elems.iter().position(|e| e.key == key) else {
            return;
        };
        let updated = (self.elems[index].weight + delta).clamp(0.0, 1.0);
        self.elems[index].weight = updated;

        let rest_total: f64 = self
            .elems
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, e)| e.weight)
            .sum();
        let rest_target = 1.0 - updated;
        let num_rest = self.elems.len() - 1;
        for (i, e) in self.elems.iter_mut().enumerate() {
            if i == index {
                continue;
            }
            if rest_total > 0.0 {
                e.weight = (e.weight * (rest_target / rest_total)).clamp(0.0, 1.0);
            } else if num_rest > 0 {
                e.weight = rest_target / num_rest as f64;
            }
        }
    }

    /// Pick a key with probability proportional to its weight.
    /// `roll` is expected in `[0, 1)`.
    pub fn pick(&self, roll: f64) -> Option<K> {
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        let mut threshold = roll * total;
        for e in &self.elems {
            if e.weight <= 0.0 {
                continue;
            }
            if threshold < e.weight {
                return Some(e.key);
            }
            threshold -= e.weight;
        }
        self.elems.iter().rev().find(|e| e.weight > 0.0).map(|e| e.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum P {
        A,
        B,
        C,
        D,
    }

    fn container() -> WeightContainer<P> {
        let mut w = WeightContainer::new(&[P::A, P::B, P::C, P::D]);
        w.set_weight(P::A, 0.5);
        w.set_weight(P::B, 0.4);
        w.set_weight(P::D, 0.1);
        w
    }

    #[test]
    fn test_add_weight_renormalizes() {
        let mut w = container();
        w.add_weight(P::C, 0.2);
        assert!((w.total() - 1.0).abs() < 1e-9);
        assert!((w.get_weight(P::C) - 0.2).abs() < 1e-9);
        // Others keep their relative proportions.
        assert!((w.get_weight(P::A) / w.get_weight(P::B) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_weights_stay_bounded() {
        let mut w = container();
        for _ in 0..100 {
            w.add_weight(P::D, 0.3);
        }
        assert!((w.get_weight(P::D) - 1.0).abs() < 1e-9);
        for e in w.iter() {
            assert!(e.weight >= 0.0 && e.weight <= 1.0);
        }
        w.add_weight(P::D, -5.0);
        assert_eq!(w.get_weight(P::D), 0.0);
        assert!((w.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_respects_weights() {
        let w = container();
        assert_eq!(w.pick(0.0), Some(P::A));
        assert_eq!(w.pick(0.49), Some(P::A));
        assert_eq!(w.pick(0.5), Some(P::B));
        assert_eq!(w.pick(0.95), Some(P::D));
        let empty = WeightContainer::new(&[P::A]);
        assert_eq!(empty.pick(0.3), None);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let mut w = WeightContainer::new(&[P::A, P::B]);
        w.set_weight(P::A, 1.0);
        w.add_weight(P::C, 0.5);
        assert_eq!(w.get_weight(P::A), 1.0);
        assert_eq!(w.get_weight(P::C), 0.0);
    }
}
