//! A small MILP intermediate representation.
//!
//! The encoders build a [`Model`] of named variables and named constraints;
//! the solve layer lowers it to the backing LP solver. Keeping our own
//! representation buys two things the backend does not give us: an LP-format
//! text dump of the full model, and constraint-level access for the
//! deletion-filter IIS computation on infeasible instances.
//!
//! Malformed models are programming errors, so the builders panic instead of
//! returning `Result`: a variable from another model or an inverted bound
//! can never come from instance data.

use std::ops::{Add, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Integer { lb: f64, ub: f64 },
    Binary,
}

#[derive(Debug, Clone)]
struct VarInfo {
    name: String,
    kind: VarKind,
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    pub terms: Vec<(Var, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn constant(value: f64) -> Self {
        LinExpr { terms: vec![], constant: value }
    }

    pub fn term(var: Var, coef: f64) -> Self {
        LinExpr { terms: vec![(var, coef)], constant: 0.0 }
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = Var>) -> Self {
        LinExpr {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }
}

impl From<Var> for LinExpr {
    fn from(var: Var) -> Self {
        LinExpr::term(var, 1.0)
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        LinExpr::constant(value)
    }
}

impl From<i32> for LinExpr {
    fn from(value: i32) -> Self {
        LinExpr::constant(value as f64)
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: T) -> LinExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;
    fn sub(self, rhs: T) -> LinExpr {
        self + -rhs.into()
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;
    fn neg(mut self) -> LinExpr {
        for (_, coef) in &mut self.terms {
            *coef = -*coef;
        }
        self.constant = -self.constant;
        self
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;
    fn mul(mut self, rhs: f64) -> LinExpr {
        for (_, coef) in &mut self.terms {
            *coef *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Add<LinExpr> for Var {
    type Output = LinExpr;
    fn add(self, rhs: LinExpr) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl Sub<LinExpr> for Var {
    type Output = LinExpr;
    fn sub(self, rhs: LinExpr) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

impl Sub<Var> for Var {
    type Output = LinExpr;
    fn sub(self, rhs: Var) -> LinExpr {
        LinExpr::from(self) - LinExpr::from(rhs)
    }
}

impl Add<Var> for Var {
    type Output = LinExpr;
    fn add(self, rhs: Var) -> LinExpr {
        LinExpr::from(self) + LinExpr::from(rhs)
    }
}

impl Mul<f64> for Var {
    type Output = LinExpr;
    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr::term(self, rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

impl Cmp {
    fn lp_symbol(&self) -> &'static str {
        match self {
            Cmp::Le => "<=",
            Cmp::Ge => ">=",
            Cmp::Eq => "=",
        }
    }
}

/// A named row: `expr cmp 0` after normalization.
#[derive(Debug, Clone)]
pub struct Constr {
    pub name: String,
    pub expr: LinExpr,
    pub cmp: Cmp,
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    vars: Vec<VarInfo>,
    pub constrs: Vec<Constr>,
    /// Minimized. Empty expression means a pure feasibility model.
    pub objective: LinExpr,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model {
            name: name.into(),
            vars: Vec::new(),
            constrs: Vec::new(),
            objective: LinExpr::default(),
        }
    }

    pub fn add_int(&mut self, name: impl Into<String>, lb: i32, ub: i32) -> Var {
        assert!(lb <= ub, "inverted bounds on integer variable");
        self.vars.push(VarInfo {
            name: name.into(),
            kind: VarKind::Integer { lb: lb as f64, ub: ub as f64 },
        });
        Var(self.vars.len() - 1)
    }

    pub fn add_bin(&mut self, name: impl Into<String>) -> Var {
        self.vars.push(VarInfo { name: name.into(), kind: VarKind::Binary });
        Var(self.vars.len() - 1)
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constrs(&self) -> usize {
        self.constrs.len()
    }

    pub fn var_name(&self, var: Var) -> &str {
        &self.vars[var.0].name
    }

    pub fn var_kind(&self, var: Var) -> VarKind {
        self.vars[var.0].kind
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        (0..self.vars.len()).map(Var)
    }

    pub fn set_objective(&mut self, objective: LinExpr) {
        self.check(&objective);
        self.objective = objective;
    }

    fn check(&self, expr: &LinExpr) {
        for (var, _) in &expr.terms {
            assert!(var.0 < self.vars.len(), "variable does not belong to this model");
        }
    }

    fn push(&mut self, name: String, lhs: LinExpr, rhs: LinExpr, cmp: Cmp) {
        let expr = lhs - rhs;
        self.check(&expr);
        self.constrs.push(Constr { name, expr, cmp });
    }

    pub fn le(&mut self, name: impl Into<String>, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) {
        self.push(name.into(), lhs.into(), rhs.into(), Cmp::Le);
    }

    pub fn ge(&mut self, name: impl Into<String>, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) {
        self.push(name.into(), lhs.into(), rhs.into(), Cmp::Ge);
    }

    pub fn eq(&mut self, name: impl Into<String>, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) {
        self.push(name.into(), lhs.into(), rhs.into(), Cmp::Eq);
    }

    /// Big-M disjunction keeping `[start, end]` out of `[ws, we]`: returns a
    /// fresh binary that is 1 when the interval ends before the window and 0
    /// when it starts after it. `eps` widens the window so boundary contact
    /// counts as overlap where the rules say it does.
    pub fn keep_out(
        &mut self,
        name: &str,
        start: impl Into<LinExpr>,
        end: impl Into<LinExpr>,
        ws: i32,
        we: i32,
        eps: f64,
        big_m: f64,
    ) -> Var {
        let before = self.add_bin(format!("{}_before", name));
        let one_minus = LinExpr::constant(1.0) - before;
        self.le(
            format!("{}_lhs", name),
            end.into(),
            LinExpr::constant(ws as f64 - eps) + one_minus * big_m,
        );
        self.ge(
            format!("{}_rhs", name),
            start.into(),
            LinExpr::constant(we as f64 + eps) - LinExpr::term(before, big_m),
        );
        before
    }

    /// One constraint as LP-format text, for infeasibility artifacts.
    pub fn render_constr(&self, constr: &Constr) -> String {
        format!(
            "{}: {} {} {}",
            constr.name,
            self.format_terms(&constr.expr),
            constr.cmp.lp_symbol(),
            -constr.expr.constant
        )
    }

    /// CPLEX LP text format, for dumping the model to disk.
    pub fn write_lp(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "\\ model {}", self.name);
        let _ = writeln!(out, "Minimize");
        let _ = writeln!(out, " obj: {}", self.format_terms(&self.objective));
        let _ = writeln!(out, "Subject To");
        for c in &self.constrs {
            let _ = writeln!(out, " {}", self.render_constr(c));
        }
        let _ = writeln!(out, "Bounds");
        for (i, v) in self.vars.iter().enumerate() {
            if let VarKind::Integer { lb, ub } = v.kind {
                let _ = writeln!(out, " {} <= {} <= {}", lb, self.vars[i].name, ub);
            }
        }
        let _ = writeln!(out, "Binaries");
        for v in &self.vars {
            if v.kind == VarKind::Binary {
                let _ = writeln!(out, " {}", v.name);
            }
        }
        let _ = writeln!(out, "Generals");
        for v in &self.vars {
            if matches!(v.kind, VarKind::Integer { .. }) {
                let _ = writeln!(out, " {}", v.name);
            }
        }
        let _ = writeln!(out, "End");
        out
    }

    fn format_terms(&self, expr: &LinExpr) -> String {
        if expr.terms.is_empty() {
            return "0".to_string();
        }
        let mut out = String::new();
        for (i, (var, coef)) in expr.terms.iter().enumerate() {
            let sign = if *coef < 0.0 {
                "- "
            } else if i == 0 {
                ""
            } else {
                "+ "
            };
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{}{} {}", sign, coef.abs(), self.vars[var.0].name));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expressions_combine_terms_and_constants() {
        let mut model = Model::new("t");
        let a = model.add_int("a", 0, 10);
        let b = model.add_bin("b");
        let expr = a + LinExpr::term(b, 3.0) - 2.0;
        assert_eq!(expr.terms, vec![(a, 1.0), (b, 3.0)]);
        assert_eq!(expr.constant, -2.0);
    }

    #[test]
    fn constraints_normalize_to_zero_rhs() {
        let mut model = Model::new("t");
        let a = model.add_int("a", 0, 10);
        let b = model.add_int("b", 0, 10);
        model.le("c", a, b - LinExpr::constant(5.0));
        let c = &model.constrs[0];
        assert_eq!(c.cmp, Cmp::Le);
        assert_eq!(c.expr.terms, vec![(a, 1.0), (b, -1.0)]);
        assert_eq!(c.expr.constant, 5.0);
    }

    #[test]
    fn keep_out_builds_the_disjunction_pair() {
        let mut model = Model::new("t");
        let s = model.add_int("s", 0, 1440);
        let before = model.keep_out("w", s, s + LinExpr::constant(30.0), 100, 200, 0.5, 1441.0);
        assert_eq!(model.var_kind(before), VarKind::Binary);
        assert_eq!(model.num_constrs(), 2);
        // end <= ws - eps + M(1 - before): before's coefficient is +M on the lhs.
        let lhs = &model.constrs[0];
        assert!(lhs.expr.terms.contains(&(before, 1441.0)));
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn foreign_variable_is_rejected() {
        let mut owner = Model::new("a");
        let v = owner.add_int("x", 0, 1);
        let mut other = Model::new("b");
        other.le("c", v, 0.0);
    }
}
