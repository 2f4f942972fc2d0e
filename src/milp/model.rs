//! MILP model definition.

use super::variables::{VarDecl, VarId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Malformed model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("variable declared twice: {0}")]
    DuplicateVariable(String),

    #[error("constraint {constraint} ({family}) references undefined variable #{index}")]
    UndefinedVariable {
        family: &'static str,
        constraint: usize,
        index: usize,
    },

    #[error("variable {name} has invalid bounds [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    #[error("constraint {constraint} ({family}) has a non-finite coefficient or right-hand side")]
    NonFinite {
        family: &'static str,
        constraint: usize,
    },

    #[error("objective references undefined variable #{0}")]
    UndefinedObjectiveVariable(usize),

    #[error("model has no objective")]
    MissingObjective,
}

/// An affine expression `Σ coef * var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style term addition.
    pub fn with(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Builder-style constant addition.
    pub fn plus(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn add_constant(&mut self, constant: f64) {
        self.constant += constant;
    }

    /// Appends `factor * other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * factor)));
        self.constant += other.constant * factor;
    }

    /// Evaluates the expression against a value vector indexed by [`VarId`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    /// Merges repeated variables and drops zero coefficients.
    pub fn compact(&self) -> LinearExpr {
        let mut merged: BTreeMap<VarId, f64> = BTreeMap::new();
        for &(v, c) in &self.terms {
            *merged.entry(v).or_insert(0.0) += c;
        }
        LinearExpr {
            terms: merged.into_iter().filter(|&(_, c)| c != 0.0).collect(),
            constant: self.constant,
        }
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().with(var, 1.0)
    }
}

/// Constraint relation between the left-hand side and the right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Eq => "=",
        }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    Minimize,
    Maximize,
}

/// A linear constraint `expr <relation> rhs`.
///
/// `expr` carries no constant: [`MilpModel::add_constraint`] folds it into `rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Label of the constraint family this row belongs to.
    pub family: &'static str,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Amount by which `values` violates the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::Le => (lhs - self.rhs).max(0.0),
            Relation::Ge => (self.rhs - lhs).max(0.0),
            Relation::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// Objective function.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

/// A mixed-integer linear program.
///
/// Contains variable declarations, grouped constraints and an objective. The
/// model is solver-agnostic: any [`SolverBackend`](super::SolverBackend) can
/// consume it.
///
/// # Examples
///
/// ```
/// use u_bulkport::milp::{LinearExpr, MilpModel, Relation, Sense};
///
/// let mut model = MilpModel::new("example");
/// let a = model.add_binary("a").unwrap();
/// let b = model.add_binary("b").unwrap();
/// model.add_constraint("pick_one", LinearExpr::new().with(a, 1.0).with(b, 1.0), Relation::Eq, 1.0);
/// model.set_objective(Sense::Minimize, LinearExpr::new().with(a, 3.0).with(b, 2.0));
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MilpModel {
    /// Model name.
    pub name: String,
    variables: Vec<VarDecl>,
    by_name: HashMap<String, VarId>,
    constraints: Vec<LinearConstraint>,
    objective: Option<Objective>,
}

impl MilpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            by_name: HashMap::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Declares a variable.
    ///
    /// # Errors
    ///
    /// Each name may be declared once; a repeat yields
    /// [`ModelError::DuplicateVariable`].
    pub fn add_var(&mut self, decl: VarDecl) -> Result<VarId, ModelError> {
        if self.by_name.contains_key(&decl.name) {
            return Err(ModelError::DuplicateVariable(decl.name));
        }
        if !decl.has_valid_bounds() {
            return Err(ModelError::InvalidBounds {
                name: decl.name,
                lower: decl.lower,
                upper: decl.upper,
            });
        }
        let id = VarId(self.variables.len());
        self.by_name.insert(decl.name.clone(), id);
        self.variables.push(decl);
        Ok(id)
    }

    /// Convenience: declare a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> Result<VarId, ModelError> {
        self.add_var(VarDecl::binary(name))
    }

    /// Convenience: declare a continuous variable.
    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<VarId, ModelError> {
        self.add_var(VarDecl::continuous(name, lower, upper))
    }

    /// Adds `expr <relation> rhs`, folding the expression constant into `rhs`.
    pub fn add_constraint(
        &mut self,
        family: &'static str,
        mut expr: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        let rhs = rhs - expr.constant;
        expr.constant = 0.0;
        self.constraints.push(LinearConstraint {
            family,
            expr,
            relation,
            rhs,
        });
    }

    /// Convenience: `expr <= rhs`.
    pub fn add_le(&mut self, family: &'static str, expr: LinearExpr, rhs: f64) {
        self.add_constraint(family, expr, Relation::Le, rhs);
    }

    /// Convenience: `expr >= rhs`.
    pub fn add_ge(&mut self, family: &'static str, expr: LinearExpr, rhs: f64) {
        self.add_constraint(family, expr, Relation::Ge, rhs);
    }

    /// Convenience: `expr == rhs`.
    pub fn add_eq(&mut self, family: &'static str, expr: LinearExpr, rhs: f64) {
        self.add_constraint(family, expr, Relation::Eq, rhs);
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, sense: Sense, expr: LinearExpr) {
        self.objective = Some(Objective { sense, expr });
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn variables(&self) -> &[VarDecl] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn var(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    pub fn decl(&self, id: VarId) -> Option<&VarDecl> {
        self.variables.get(id.0)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn binary_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_binary()).count()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of constraints per family label.
    pub fn family_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.constraints {
            *counts.entry(c.family).or_insert(0) += 1;
        }
        counts
    }

    /// Objective value at `values`, if an objective is set.
    pub fn evaluate_objective(&self, values: &[f64]) -> Option<f64> {
        self.objective.as_ref().map(|o| o.expr.evaluate(values))
    }

    /// Largest constraint violation at `values`.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0, f64::max)
    }

    /// Validates the model for consistency.
    ///
    /// Checks that every referenced variable exists, that coefficients are
    /// finite and that an objective is set.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.variables.len();
        for (i, c) in self.constraints.iter().enumerate() {
            if !c.rhs.is_finite() {
                return Err(ModelError::NonFinite {
                    family: c.family,
                    constraint: i,
                });
            }
            for &(v, coef) in &c.expr.terms {
                if v.0 >= n {
                    return Err(ModelError::UndefinedVariable {
                        family: c.family,
                        constraint: i,
                        index: v.0,
                    });
                }
                if !coef.is_finite() {
                    return Err(ModelError::NonFinite {
                        family: c.family,
                        constraint: i,
                    });
                }
            }
        }
        let objective = self.objective.as_ref().ok_or(ModelError::MissingObjective)?;
        if let Some(&(v, _)) = objective.expr.terms.iter().find(|(v, _)| v.0 >= n) {
            return Err(ModelError::UndefinedObjectiveVariable(v.0));
        }
        Ok(())
    }
}
