//! Flat handle arenas for every variable family.

use crate::instance::Dimensions;
use crate::milp::VarId;
use std::ops::Index;

/// Position of the ordered pair `(a, b)`, `a != b`, among the `n * (n - 1)`
/// ordered pairs of `0..n`.
#[inline]
pub(crate) fn pair_index(n: usize, a: usize, b: usize) -> usize {
    debug_assert!(a != b && a < n && b < n);
    a * (n - 1) + if b < a { b } else { b - 1 }
}

/// Handles of one variable family, stored densely.
#[derive(Debug, Clone, Default)]
pub struct VarGrid {
    ids: Vec<VarId>,
}

impl VarGrid {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            ids: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, id: VarId) {
        self.ids.push(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[VarId] {
        &self.ids
    }
}

impl Index<usize> for VarGrid {
    type Output = VarId;

    fn index(&self, i: usize) -> &VarId {
        &self.ids[i]
    }
}

/// Where every logical variable of a formulation lives in the model.
///
/// Families are filled by the builder in nested-loop order, so each accessor
/// is a single offset computation. Pair families skip the diagonal
/// (`s == t`, `k == t`); asking for it is a logic error.
#[derive(Debug, Clone)]
pub struct VarIndex {
    pub(crate) dims: Dimensions,
    pub(crate) z: VarGrid,
    pub(crate) x: VarGrid,
    pub(crate) h: VarGrid,
    pub(crate) f: VarGrid,
    pub(crate) y: VarGrid,
    pub(crate) q: VarGrid,
    pub(crate) e: VarGrid,
    pub(crate) e_sk: VarGrid,
    pub(crate) omega: VarGrid,
    pub(crate) lambda: VarGrid,
    pub(crate) mu: VarGrid,
    pub(crate) w: VarGrid,
    pub(crate) tau: VarGrid,
}

impl VarIndex {
    pub(crate) fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            z: VarGrid::default(),
            x: VarGrid::default(),
            h: VarGrid::default(),
            f: VarGrid::default(),
            y: VarGrid::default(),
            q: VarGrid::default(),
            e: VarGrid::default(),
            e_sk: VarGrid::default(),
            omega: VarGrid::default(),
            lambda: VarGrid::default(),
            mu: VarGrid::default(),
            w: VarGrid::default(),
            tau: VarGrid::default(),
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    #[inline]
    fn slot_offset(&self, s: usize, k: usize, r: usize, v: usize) -> usize {
        let d = &self.dims;
        ((s * d.num_ship_k + k) * d.num_rows + r) * d.num_slots_per_row + v
    }

    /// Ship `s` at berth `b`.
    pub fn z(&self, s: usize, b: usize) -> VarId {
        self.z[s * self.dims.num_berths + b]
    }

    /// Compartment `k` of ship `s` occupies row `r`, slot `v`.
    pub fn x(&self, s: usize, k: usize, r: usize, v: usize) -> VarId {
        self.x[self.slot_offset(s, k, r, v)]
    }

    /// Right boundary of the run of `(s, k)` at `(r, v)`.
    pub fn h(&self, s: usize, k: usize, r: usize, v: usize) -> VarId {
        self.h[self.slot_offset(s, k, r, v)]
    }

    /// Compartment `k` of ship `s` is stored in row `r`.
    pub fn f(&self, s: usize, k: usize, r: usize) -> VarId {
        self.f[(s * self.dims.num_ship_k + k) * self.dims.num_rows + r]
    }

    /// Ship `s` is sequenced after ship `t`.
    pub fn y(&self, s: usize, t: usize) -> VarId {
        self.y[pair_index(self.dims.num_ships, s, t)]
    }

    /// Compartment `k` of ship `s` is unloaded before compartment `t`.
    pub fn q(&self, s: usize, k: usize, t: usize) -> VarId {
        let kk = self.dims.num_ship_k;
        self.q[s * kk * (kk - 1) + pair_index(kk, k, t)]
    }

    /// Start of ship `s`.
    pub fn e(&self, s: usize) -> VarId {
        self.e[s]
    }

    /// Start of compartment `k` of ship `s`.
    pub fn e_sk(&self, s: usize, k: usize) -> VarId {
        self.e_sk[s * self.dims.num_ship_k + k]
    }

    #[inline]
    fn sharing_offset(&self, s: usize, t: usize, b: usize) -> usize {
        pair_index(self.dims.num_ships, s, t) * self.dims.num_berths + b
    }

    /// Ships `s` and `t` both at berth `b`.
    pub fn omega(&self, s: usize, t: usize, b: usize) -> VarId {
        self.omega[self.sharing_offset(s, t, b)]
    }

    /// Ships `s` and `t` share berth `b` and `s` goes first.
    pub fn lambda(&self, s: usize, t: usize, b: usize) -> VarId {
        self.lambda[self.sharing_offset(s, t, b)]
    }

    /// Ships `s` and `t` share berth `b` and `t` goes first.
    pub fn mu(&self, s: usize, t: usize, b: usize) -> VarId {
        self.mu[self.sharing_offset(s, t, b)]
    }

    /// Product `x[s][k][r][v] * z[s][b]`; `None` unless the product
    /// linearisation was built.
    pub fn w(&self, s: usize, k: usize, r: usize, v: usize, b: usize) -> Option<VarId> {
        if self.w.is_empty() {
            return None;
        }
        Some(self.w[self.slot_offset(s, k, r, v) * self.dims.num_berths + b])
    }

    /// Transshipment cost of `(s, k)` at berth `b`; `None` unless the berth
    /// aggregate linearisation was built.
    pub fn tau(&self, s: usize, k: usize, b: usize) -> Option<VarId> {
        if self.tau.is_empty() {
            return None;
        }
        Some(self.tau[(s * self.dims.num_ship_k + k) * self.dims.num_berths + b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_index_is_a_bijection() {
        for n in 2..6 {
            let mut seen = vec![false; n * (n - 1)];
            for a in 0..n {
                for b in (0..n).filter(|&b| b != a) {
                    let i = pair_index(n, a, b);
                    assert!(!seen[i], "n={n} a={a} b={b}");
                    seen[i] = true;
                }
            }
            assert!(seen.iter().all(|&x| x));
        }
    }

    #[test]
    fn test_pair_index_follows_nested_loop_order() {
        let n = 4;
        let mut expected = 0;
        for a in 0..n {
            for b in (0..n).filter(|&b| b != a) {
                assert_eq!(pair_index(n, a, b), expected);
                expected += 1;
            }
        }
    }
}
