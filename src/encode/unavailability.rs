//! Closure windows. A machine closure blocks the start of its operation; a
//! yard closure additionally blocks starts of the operations performed there
//! and, in jalon 3, the full span of human tasks located there.

use crate::encode::Milestone;
use crate::model::{LinExpr, Model};
use crate::problem::{Direction, MachineKind, Problem, TrainId, Window, YardKind};
use crate::vars::VarModel;

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem, milestone: Milestone) {
    let eps = milestone.epsilon();
    let big_m = problem.big_m();

    let keep_start_out = |model: &mut Model,
                          tag: String,
                          start: crate::model::Var,
                          windows: &[Window]| {
        for (wi, window) in windows.iter().enumerate() {
            for (oi, &(ws, we)) in window.occurrences.iter().enumerate() {
                model.keep_out(&format!("{}_w{}o{}", tag, wi, oi), start, start, ws, we, eps, big_m);
            }
        }
    };

    for (&machine, info) in &problem.machines {
        if info.windows.is_empty() {
            continue;
        }
        for (train, &start) in trains_of(vars, problem, machine) {
            keep_start_out(model, format!("closed_{}_{}", machine.label(), train), start, &info.windows);
        }
    }

    if milestone < Milestone::Jalon2 {
        return;
    }

    for (&yard, info) in &problem.yards {
        if info.windows.is_empty() {
            continue;
        }
        let machines: &[MachineKind] = match yard {
            YardKind::Reception => &[MachineKind::Deb],
            YardKind::Formation => &[MachineKind::For, MachineKind::Deg],
            YardKind::Departure => &[],
        };
        for &machine in machines {
            for (train, &start) in trains_of(vars, problem, machine) {
                keep_start_out(
                    model,
                    format!("closed_{}_{}_{}", yard.label(), machine.label(), train),
                    start,
                    &info.windows,
                );
            }
        }

        if milestone < Milestone::Jalon3 {
            continue;
        }
        for ((train, order), &th) in &vars.task_start {
            let def = problem.task(train.direction, *order);
            if def.yard != yard {
                continue;
            }
            for (wi, window) in info.windows.iter().enumerate() {
                for (oi, &(ws, we)) in window.occurrences.iter().enumerate() {
                    model.keep_out(
                        &format!("closed_{}_th_{}_{}_w{}o{}", yard.label(), train, order, wi, oi),
                        th,
                        th + LinExpr::constant(def.duration as f64),
                        ws,
                        we,
                        eps,
                        big_m,
                    );
                }
            }
        }
    }
    log::debug!("closure constraints registered");
}

fn trains_of<'a>(
    vars: &'a VarModel,
    problem: &'a Problem,
    machine: MachineKind,
) -> impl Iterator<Item = (&'a TrainId, &'a crate::model::Var)> {
    let trains = match machine.direction() {
        Direction::Arrival => &problem.arrivals,
        Direction::Departure => &problem.departures,
    };
    trains.iter().map(move |t| {
        let var = &vars.op_start[&(t.clone(), machine)];
        (t, var)
    })
}
