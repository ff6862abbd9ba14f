//! Leaf atoms: [`Variable`], [`Parameter`], and literal constants.
//!
//! Leaves are the named atoms of a model. Unlike operators, which live on a
//! tape and are write-once, leaves are long-lived and shared by reference
//! across every expression that mentions them.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// A mutable decision variable.
///
/// Identity is by pointer (`Arc` address), not by name or index: two
/// variables with the same display name are distinct unless they are the
/// same `Arc`.
#[derive(Debug)]
pub struct Variable {
    name: Box<str>,
    value: Cell<f64>,
    index: u32,
}

impl Variable {
    /// Create a new variable with the given display name, initial value, and
    /// solver-facing index.
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, value: f64, index: u32) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value: Cell::new(value),
            index,
        })
    }

    /// The variable's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's current numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Overwrite the variable's current numeric value.
    pub fn set_value(&self, value: f64) {
        self.value.set(value);
    }

    /// The stable index assigned by the environment, used as `v<index>` in
    /// NL output.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A read-only model parameter.
///
/// Parameters are structurally identical to variables but are never treated
/// as decision variables by the degree analyzer (their degree is always 0)
/// and are rendered as numeric literals (`n<value>`) in NL output.
#[derive(Debug)]
pub struct Parameter {
    name: Box<str>,
    value: Cell<f64>,
}

impl Parameter {
    /// Create a new parameter with the given display name and value.
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, value: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value: Cell::new(value),
        })
    }

    /// The parameter's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's current numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value.get()
    }

    /// Overwrite the parameter's current numeric value.
    pub fn set_value(&self, value: f64) {
        self.value.set(value);
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Create `n_vars` fresh [`Variable`]s, named `v0..v{n_vars-1}`, valued `0.0`,
/// and indexed `0..n_vars` in declaration order.
///
/// Outward host-glue factory (the environment is expected to rename and
/// re-value them once they are bound to a model).
#[must_use]
pub fn create_vars(n_vars: u32) -> Vec<Arc<Variable>> {
    (0..n_vars)
        .map(|i| Variable::new(format!("v{i}"), 0.0, i))
        .collect()
}

/// Create `n_params` fresh [`Parameter`]s, named `p0..p{n_params-1}`, valued
/// `0.0`.
#[must_use]
pub fn create_params(n_params: u32) -> Vec<Arc<Parameter>> {
    (0..n_params)
        .map(|i| Parameter::new(format!("p{i}"), 0.0))
        .collect()
}

/// Create `n_constants` fresh [`Leaf::Constant`]s, each valued `0.0`.
#[must_use]
pub fn create_constants(n_constants: u32) -> Vec<Leaf> {
    (0..n_constants).map(|_| Leaf::Constant(0.0)).collect()
}

/// A leaf node: a [`Variable`], a [`Parameter`], or a literal constant.
///
/// `Constant` and `Parameter` are equivalent to the degree analyzer; the
/// distinction exists purely so the NL serializer and pretty-printer can
/// tell a named model parameter from a folded numeric literal.
#[derive(Debug, Clone)]
pub enum Leaf {
    /// A decision variable.
    Variable(Arc<Variable>),
    /// A read-only model parameter.
    Parameter(Arc<Parameter>),
    /// A folded or user-supplied numeric literal.
    Constant(f64),
}

impl Leaf {
    /// The leaf's current numeric value.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Leaf::Variable(v) => v.value(),
            Leaf::Parameter(p) => p.value(),
            Leaf::Constant(c) => *c,
        }
    }

    /// Polynomial degree of this leaf: 1 for a variable, 0 otherwise.
    #[must_use]
    pub fn degree(&self) -> u8 {
        match self {
            Leaf::Variable(_) => 1,
            Leaf::Parameter(_) | Leaf::Constant(_) => 0,
        }
    }

    /// `true` if this leaf is exactly the literal constant zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Leaf::Constant(c) if *c == 0.0)
    }

    /// `true` if this leaf is exactly the literal constant one.
    #[must_use]
    pub fn is_one(&self) -> bool {
        matches!(self, Leaf::Constant(c) if *c == 1.0)
    }

    /// `true` if this leaf carries a value fixed at construction time
    /// (parameter or constant, as opposed to a mutable variable).
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        !matches!(self, Leaf::Variable(_))
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Leaf::Variable(a), Leaf::Variable(b)) => Arc::ptr_eq(a, b),
            (Leaf::Parameter(a), Leaf::Parameter(b)) => Arc::ptr_eq(a, b),
            (Leaf::Constant(a), Leaf::Constant(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Variable(v) => write!(f, "{v}"),
            Leaf::Parameter(p) => write!(f, "{p}"),
            Leaf::Constant(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, reason = "tests assert exact literal values")]
mod tests {
    use super::*;

    #[test]
    fn variables_with_same_name_are_distinct_identities() {
        let a = Variable::new("x", 1.0, 0);
        let b = Variable::new("x", 1.0, 0);
        assert_ne!(Leaf::Variable(Arc::clone(&a)), Leaf::Variable(b));
        assert_eq!(Leaf::Variable(Arc::clone(&a)), Leaf::Variable(a));
    }

    #[test]
    fn constants_compare_by_value() {
        assert_eq!(Leaf::Constant(2.0), Leaf::Constant(2.0));
        assert_ne!(Leaf::Constant(2.0), Leaf::Constant(3.0));
    }

    #[test]
    fn variable_degree_is_one_others_zero() {
        let v = Variable::new("x", 0.0, 0);
        let p = Parameter::new("a", 0.0);
        assert_eq!(Leaf::Variable(v).degree(), 1);
        assert_eq!(Leaf::Parameter(p).degree(), 0);
        assert_eq!(Leaf::Constant(4.0).degree(), 0);
    }

    #[test]
    fn set_value_is_visible_through_value() {
        let v = Variable::new("x", 1.0, 0);
        v.set_value(5.0);
        assert_eq!(v.value(), 5.0);
    }

    #[test]
    fn is_zero_and_is_one_only_match_literal_constants() {
        let v = Variable::new("x", 0.0, 0);
        assert!(!Leaf::Variable(v).is_zero());
        assert!(Leaf::Constant(0.0).is_zero());
        assert!(Leaf::Constant(1.0).is_one());
        assert!(!Leaf::Constant(1.0).is_zero());
    }

    #[test]
    fn is_fixed_is_false_only_for_variables() {
        let v = Variable::new("x", 0.0, 0);
        let p = Parameter::new("a", 0.0);
        assert!(!Leaf::Variable(v).is_fixed());
        assert!(Leaf::Parameter(p).is_fixed());
        assert!(Leaf::Constant(1.0).is_fixed());
    }

    #[test]
    fn create_vars_assigns_sequential_indices() {
        let vars = create_vars(3);
        assert_eq!(vars.len(), 3);
        assert_eq!(vars[0].index(), 0);
        assert_eq!(vars[1].index(), 1);
        assert_eq!(vars[2].index(), 2);
    }

    #[test]
    fn create_params_and_create_constants_produce_requested_count() {
        assert_eq!(create_params(2).len(), 2);
        let constants = create_constants(4);
        assert_eq!(constants.len(), 4);
        assert!(constants.iter().all(Leaf::is_zero));
    }
}
