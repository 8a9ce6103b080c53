// Curve container, token index and pair grouping
// ----------------------------------------------
// Everything here is built once per optimize() call and then only read.
// Ordered maps keep iteration order (and therefore float summation order)
// identical between runs on the same snapshot.

use std::collections::{BTreeMap, BTreeSet};

use crate::math::{Curve, Pair};

use super::error::ParameterError;

/// Snapshot of curves for one optimization. Never mutated by the optimizer.
#[derive(Clone, Debug)]
pub struct CurveContainer<C> {
    curves: Vec<C>,
}

impl<C: Curve> CurveContainer<C> {
    pub fn new(curves: Vec<C>) -> Self {
        CurveContainer { curves }
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&C> {
        self.curves.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.curves.iter()
    }

    pub fn tokens(&self) -> BTreeSet<String> {
        self.curves
            .iter()
            .flat_map(|c| c.tokens())
            .map(str::to_string)
            .collect()
    }

    pub fn pairs(&self) -> PairGrouping {
        let mut groups: BTreeMap<Pair, Vec<usize>> = BTreeMap::new();
        for (i, c) in self.curves.iter().enumerate() {
            groups.entry(c.pair()).or_default().push(i);
        }
        PairGrouping { groups }
    }
}

impl<C: Curve> FromIterator<C> for CurveContainer<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        CurveContainer::new(iter.into_iter().collect())
    }
}

/// Curve indices grouped by (unordered) trading pair.
#[derive(Clone, Debug, Default)]
pub struct PairGrouping {
    groups: BTreeMap<Pair, Vec<usize>>,
}

impl PairGrouping {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pair, &[usize])> {
        self.groups.iter().map(|(p, v)| (p, v.as_slice()))
    }

    pub fn curves_for(&self, pair: &Pair) -> &[usize] {
        self.groups.get(pair).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Non-target tokens with their fixed coordinate in the price vector.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenIndex {
    target: String,
    tokens: Vec<String>,
    position: BTreeMap<String, usize>,
}

impl TokenIndex {
    pub fn new(universe: &BTreeSet<String>, target: &str) -> Result<Self, ParameterError> {
        if !universe.contains(target) {
            return Err(ParameterError::UnknownTargetToken(target.to_string()));
        }
        let tokens: Vec<String> = universe.iter().filter(|t| *t != target).cloned().collect();
        let position = tokens.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        Ok(TokenIndex { target: target.to_string(), tokens, position })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.position.get(token).copied()
    }
}
