//! Lowering to the LP backend and result extraction.
//!
//! The whole model is rebuilt in the backend on every call; that is cheap
//! next to the MILP solve itself and is what makes the deletion-filter IIS
//! below possible, since each probe is just a solve with some rows masked.

use good_lp::{constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use crate::model::{Cmp, LinExpr, Model, Var, VarKind};

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("model is unbounded")]
    Unbounded,
    #[error("solver failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget, seconds. The current backend solves to completion
    /// and cannot be interrupted; a set limit is logged and ignored.
    pub time_limit: Option<f64>,
    /// Maximum number of probe solves the IIS deletion filter may spend.
    pub iis_probe_budget: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions { time_limit: None, iis_probe_budget: 500 }
    }
}

/// Values of every model variable in a feasible solution.
#[derive(Debug, Clone)]
pub struct Assignment {
    values: Vec<f64>,
    pub objective: f64,
}

impl Assignment {
    pub fn value(&self, var: Var) -> f64 {
        self.values[var.0]
    }

    /// Integer and binary variables come back as floats; round before use.
    pub fn int(&self, var: Var) -> i32 {
        self.values[var.0].round() as i32
    }
}

/// An irreducible-ish infeasible subsystem: constraint names that together
/// still admit no solution. Minimal up to the probe budget.
#[derive(Debug, Clone)]
pub struct Iis {
    pub constraints: Vec<String>,
    pub minimal: bool,
}

#[derive(Debug)]
pub enum SolveOutcome {
    Optimal(Assignment),
    Infeasible(Iis),
}

pub fn solve(model: &Model, options: &SolveOptions) -> Result<SolveOutcome, SolverError> {
    if let Some(limit) = options.time_limit {
        log::warn!("time limit of {}s requested but the backend does not support one", limit);
    }
    let _p = hprof::enter("solve");
    let active = vec![true; model.num_constrs()];
    match run(model, &active) {
        Ok(assignment) => {
            log::info!("optimal, objective {}", assignment.objective);
            Ok(SolveOutcome::Optimal(assignment))
        }
        Err(ResolutionError::Infeasible) => {
            log::warn!("model infeasible, running deletion filter");
            Ok(SolveOutcome::Infeasible(deletion_filter(model, options.iis_probe_budget)))
        }
        Err(ResolutionError::Unbounded) => Err(SolverError::Unbounded),
        Err(other) => Err(SolverError::Backend(other.to_string())),
    }
}

/// One backend solve with the constraints in `active` only.
fn run(model: &Model, active: &[bool]) -> Result<Assignment, ResolutionError> {
    let mut problem_vars = ProblemVariables::new();
    let backend_vars: Vec<Variable> = model
        .vars()
        .map(|v| match model.var_kind(v) {
            VarKind::Integer { lb, ub } => {
                problem_vars.add(variable().integer().min(lb).max(ub))
            }
            VarKind::Binary => problem_vars.add(variable().binary()),
        })
        .collect();

    let to_expr = |e: &LinExpr| {
        let mut expr = Expression::from(e.constant);
        for (var, coef) in &e.terms {
            expr += backend_vars[var.0] * *coef;
        }
        expr
    };

    let mut solver = problem_vars.minimise(to_expr(&model.objective)).using(microlp);
    for (constr, _) in model.constrs.iter().zip(active).filter(|(_, &a)| a) {
        let expr = to_expr(&constr.expr);
        let row = match constr.cmp {
            Cmp::Le => constraint::leq(expr, 0.0),
            Cmp::Ge => constraint::geq(expr, 0.0),
            Cmp::Eq => constraint::eq(expr, 0.0),
        };
        solver = solver.with(row);
    }

    let solution = solver.solve()?;
    let values: Vec<f64> = backend_vars.iter().map(|v| solution.value(*v)).collect();
    let objective = model
        .objective
        .terms
        .iter()
        .map(|(var, coef)| values[var.0] * coef)
        .sum::<f64>()
        + model.objective.constant;
    Ok(Assignment { values, objective })
}

/// Deletion filter: drop each row in turn and keep it dropped while the rest
/// stays infeasible. What survives is an infeasible core; with enough budget
/// it is minimal.
fn deletion_filter(model: &Model, probe_budget: usize) -> Iis {
    let _p = hprof::enter("iis deletion filter");
    let n = model.num_constrs();
    let mut active = vec![true; n];
    let mut probes = 0;
    for i in 0..n {
        if probes >= probe_budget {
            log::warn!("IIS probe budget exhausted after {} rows", i);
            let names = active_names(model, &active);
            return Iis { constraints: names, minimal: false };
        }
        active[i] = false;
        probes += 1;
        if !matches!(run(model, &active), Err(ResolutionError::Infeasible)) {
            active[i] = true;
        }
    }
    let names = active_names(model, &active);
    log::info!("infeasible core has {} constraints", names.len());
    Iis { constraints: names, minimal: true }
}

fn active_names(model: &Model, active: &[bool]) -> Vec<String> {
    model
        .constrs
        .iter()
        .zip(active)
        .filter(|(_, &a)| a)
        .map(|(c, _)| c.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn solves_a_small_integer_program() {
        let mut model = Model::new("t");
        let a = model.add_int("a", 0, 10);
        let b = model.add_int("b", 0, 10);
        model.ge("sum", a + b, 12.0);
        model.set_objective(a + b);
        match solve(&model, &SolveOptions::default()).unwrap() {
            SolveOutcome::Optimal(sol) => {
                assert_eq!(sol.int(a) + sol.int(b), 12);
                assert!((sol.objective - 12.0).abs() < 1e-6);
            }
            other => panic!("expected optimum, got {:?}", other),
        }
    }

    #[test]
    fn contradictory_rows_survive_the_deletion_filter() {
        let mut model = Model::new("t");
        let a = model.add_int("a", 0, 100);
        model.ge("at_least", a, 10.0);
        model.le("at_most", a, 5.0);
        model.le("padding", a, 90.0);
        match solve(&model, &SolveOptions::default()).unwrap() {
            SolveOutcome::Infeasible(iis) => {
                assert!(iis.minimal);
                assert_eq!(iis.constraints, vec!["at_least", "at_most"]);
            }
            other => panic!("expected infeasibility, got {:?}", other),
        }
    }
}
