//! Temporal chains. Machine side: decoupling waits an hour after arrival,
//! the assembled train is readied at least 165 minutes after assembly starts
//! and at least 35 minutes before departure, and assembly waits for every
//! feeding decoupling plus a 15-minute hand-off. Human side (jalon 3): each
//! direction's task sequence runs in order, and the machine-operated steps
//! are pinned to the machine start times.

use crate::encode::Milestone;
use crate::model::{LinExpr, Model};
use crate::problem::{MachineKind, Problem};
use crate::vars::VarModel;

/// Minutes between physical arrival and the earliest decoupling.
const ARRIVAL_TO_DEB: i32 = 60;
/// Minutes the readied train must wait on the departure yard.
const DEG_TO_DEPARTURE: i32 = 35;
/// Hand-off between a decoupling and any assembly consuming its wagons.
const DEB_TO_FOR: i32 = 15;
/// Minutes between assembly start and departure readying.
const FOR_TO_DEG: i32 = 165;

/// Arrival-side task pinned to the decoupling machine.
const ARR_MACHINE_TASK: u8 = 3;
/// Departure-side tasks pinned to assembly and readying.
const DEP_FOR_TASK: u8 = 1;
const DEP_DEG_TASK: u8 = 3;

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem, milestone: Milestone) {
    // In jalon 3 the human chain carries these bounds instead: the first
    // arrival task waits for the train and the brake test ends before
    // departure, with the machine steps pinned into the chain.
    if milestone < Milestone::Jalon3 {
        for arr in &problem.arrivals {
            let a = vars.op(arr, MachineKind::Deb);
            model.ge(
                format!("deb_delay_{}", arr),
                a,
                (arr.minute + ARRIVAL_TO_DEB) as f64,
            );
        }
        for dep in &problem.departures {
            let b = vars.op(dep, MachineKind::For);
            let c = vars.op(dep, MachineKind::Deg);
            model.le(
                format!("deg_deadline_{}", dep),
                c,
                (dep.minute - DEG_TO_DEPARTURE) as f64,
            );
            model.ge(
                format!("for_to_deg_{}", dep),
                c,
                b + LinExpr::constant(FOR_TO_DEG as f64),
            );
        }
    }

    for (dep, arrs) in &problem.requires {
        let b = vars.op(dep, MachineKind::For);
        for arr in arrs {
            let a = vars.op(arr, MachineKind::Deb);
            model.ge(
                format!("feed_{}_{}", dep, arr),
                b,
                a + LinExpr::constant(DEB_TO_FOR as f64),
            );
        }
    }

    if milestone >= Milestone::Jalon3 {
        encode_task_chains(model, vars, problem);
    }
    log::debug!("precedence constraints registered");
}

fn encode_task_chains(model: &mut Model, vars: &VarModel, problem: &Problem) {
    assert!(
        !problem.arr_tasks.is_empty() && !problem.dep_tasks.is_empty(),
        "jalon 3 requires both task sequences"
    );
    for arr in &problem.arrivals {
        for pair in problem.arr_tasks.windows(2) {
            let prev = vars.task(arr, pair[0].order);
            let next = vars.task(arr, pair[1].order);
            model.ge(
                format!("chain_{}_{}", arr, pair[1].order),
                next,
                prev + LinExpr::constant(pair[0].duration as f64),
            );
        }
        model.ge(
            format!("start_after_arrival_{}", arr),
            vars.task(arr, problem.arr_tasks[0].order),
            arr.minute as f64,
        );
        model.eq(
            format!("pin_deb_{}", arr),
            vars.task(arr, ARR_MACHINE_TASK),
            vars.op(arr, MachineKind::Deb),
        );
    }

    for dep in &problem.departures {
        for pair in problem.dep_tasks.windows(2) {
            let prev = vars.task(dep, pair[0].order);
            let next = vars.task(dep, pair[1].order);
            model.ge(
                format!("chain_{}_{}", dep, pair[1].order),
                next,
                prev + LinExpr::constant(pair[0].duration as f64),
            );
        }
        let last = problem
            .dep_tasks
            .last()
            .unwrap_or_else(|| panic!("departure task sequence is empty"));
        model.le(
            format!("finish_before_departure_{}", dep),
            vars.task(dep, last.order) + LinExpr::constant(last.duration as f64),
            dep.minute as f64,
        );
        model.eq(
            format!("pin_for_{}", dep),
            vars.task(dep, DEP_FOR_TASK),
            vars.op(dep, MachineKind::For),
        );
        model.eq(
            format!("pin_deg_{}", dep),
            vars.task(dep, DEP_DEG_TASK),
            vars.op(dep, MachineKind::Deg),
        );
    }
}
