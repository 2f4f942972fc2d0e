//! MILP variable declarations.

/// Stable identity of a declared variable within one [`MilpModel`](super::MilpModel).
///
/// Ids are dense and assigned in declaration order, so they double as indices
/// into solution value vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    /// Integer in {0, 1}.
    Binary,
    /// Real in `[lower, upper]`.
    Continuous,
}

/// A variable declaration: name, domain and bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDecl {
    /// Variable name (unique within a model).
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    /// May be `f64::INFINITY`.
    pub upper: f64,
}

impl VarDecl {
    /// Creates a binary variable.
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Creates a continuous variable with the given bounds.
    pub fn continuous(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.kind == VarKind::Binary
    }

    /// Whether `lower <= upper` and neither bound is NaN.
    pub fn has_valid_bounds(&self) -> bool {
        !self.lower.is_nan() && !self.upper.is_nan() && self.lower <= self.upper
    }
}
