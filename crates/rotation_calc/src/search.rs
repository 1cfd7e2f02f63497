//! Lazy enumeration of index spaces and parallel top-k selection.
//!
//! Candidate spaces grow multiplicatively with every echo slot, so the
//! optimizers walk them as iterators and only keep the best few scores.

use rayon::prelude::*;

/// `k`-element subsets of `0..n` as ascending index lists, in lexicographic
/// order.
#[derive(Debug, Clone)]
pub(crate) struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    pub(crate) fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        // Bump the rightmost index that still has room, then reset the tail.
        let k = self.indices.len();
        let bumped = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i);
        match bumped {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.done = true,
        }
        Some(current)
    }
}

/// Every digit vector below `radices`, last digit fastest.
///
/// A zero radix makes the space empty; no radices yield one empty vector.
#[derive(Debug, Clone)]
pub(crate) struct Product {
    radices: Vec<usize>,
    digits: Vec<usize>,
    done: bool,
}

impl Product {
    pub(crate) fn new(radices: Vec<usize>) -> Self {
        Self {
            digits: vec![0; radices.len()],
            done: radices.contains(&0),
            radices,
        }
    }
}

impl Iterator for Product {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.digits.clone();

        self.done = true;
        for (digit, &radix) in self.digits.iter_mut().zip(&self.radices).rev() {
            *digit += 1;
            if *digit < radix {
                self.done = false;
                break;
            }
            *digit = 0;
        }
        Some(current)
    }
}

struct Ranked<T> {
    index: usize,
    damage: f64,
    candidate: T,
}

fn keep_best<T>(ranked: &mut Vec<Ranked<T>>, top_k: usize) {
    ranked.sort_by(|lhs, rhs| {
        rhs.damage
            .total_cmp(&lhs.damage)
            .then(lhs.index.cmp(&rhs.index))
    });
    ranked.truncate(top_k);
}

/// Score `candidates` on the rayon pool and keep the `top_k` highest.
///
/// Returns how many candidates were scored and the winners, best first.
/// Equal scores keep enumeration order.
pub(crate) fn best_candidates<T, I, F>(candidates: I, top_k: usize, score: F) -> (usize, Vec<(T, f64)>)
where
    T: Send,
    I: Iterator<Item = T> + Send,
    F: Fn(&T) -> f64 + Sync + Send,
{
    if top_k == 0 {
        return (0, Vec::new());
    }

    let (evaluated, mut best) = candidates
        .enumerate()
        .par_bridge()
        .fold(
            || (0usize, Vec::new()),
            |(count, mut best), (index, candidate)| {
                let damage = score(&candidate);
                best.push(Ranked {
                    index,
                    damage,
                    candidate,
                });
                if best.len() > 2 * top_k {
                    keep_best(&mut best, top_k);
                }
                (count + 1, best)
            },
        )
        .reduce(
            || (0, Vec::new()),
            |(lhs_count, mut lhs), (rhs_count, rhs)| {
                lhs.extend(rhs);
                keep_best(&mut lhs, top_k);
                (lhs_count + rhs_count, lhs)
            },
        );
    keep_best(&mut best, top_k);

    let best = best
        .into_iter()
        .map(|ranked| (ranked.candidate, ranked.damage))
        .collect();
    (evaluated, best)
}
