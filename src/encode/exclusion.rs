//! One train per machine: for every pair of trains sharing a machine, one
//! must start far enough before the other. The disjunction is materialized
//! with a before/after binary pair summing to one, once per separation gap.

use crate::encode::Milestone;
use crate::model::{LinExpr, Model};
use crate::problem::{Direction, MachineKind, Problem};
use crate::vars::VarModel;

/// Separation gaps, minutes. With integer starts the 14-minute gap plus the
/// epsilon margin keeps two uses of a machine a full processing slot apart;
/// the zero gap forbids exact ties on its own.
const GAPS: [i32; 2] = [0, 14];

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem, milestone: Milestone) {
    let eps = milestone.epsilon();
    let big_m = problem.big_m();

    for machine in MachineKind::ALL {
        let trains = match machine.direction() {
            Direction::Arrival => &problem.arrivals,
            Direction::Departure => &problem.departures,
        };
        for (i, t1) in trains.iter().enumerate() {
            for t2 in trains.iter().skip(i + 1) {
                let s1 = vars.op(t1, machine);
                let s2 = vars.op(t2, machine);
                for gap in GAPS {
                    let tag = format!("excl_{}_{}_{}_g{}", machine.label(), t1, t2, gap);
                    let before = model.add_bin(format!("{}_before", tag));
                    let after = model.add_bin(format!("{}_after", tag));
                    model.eq(format!("{}_pick", tag), before + after, 1.0);
                    model.le(
                        format!("{}_lhs", tag),
                        s1,
                        s2 - LinExpr::constant(gap as f64 + eps)
                            + (LinExpr::constant(1.0) - before) * big_m,
                    );
                    model.ge(
                        format!("{}_rhs", tag),
                        s1,
                        s2 + LinExpr::constant(gap as f64 + eps)
                            - (LinExpr::constant(1.0) - after) * big_m,
                    );
                }
            }
        }
    }
    log::debug!("machine exclusion constraints registered");
}
