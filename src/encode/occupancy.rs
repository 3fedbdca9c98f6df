//! Yard occupancy on the quarter-hour grid.
//!
//! A train holds a track for a half-open interval of slots: the reception
//! yard from physical arrival until decoupling ends, the formation yard from
//! decoupling (for the wagons of a linked arrival) or assembly start until
//! assembly hand-over or readying ends, and the departure yard from readying
//! start until physical departure. The membership binary for slot `s` (start
//! minute `m = 15s`) is tied to the interval with one forcing pair plus an
//! AND, and one restricting pair:
//!
//!   m - entry + 1 <= M x        (x = 1 once the interval has started)
//!   exit - m      <= M y        (y = 1 before it ends)
//!   occ >= x + y - 1
//!   entry <= m + M (1 - occ)
//!   m + 1 <= exit + M (1 - occ)
//!
//! All times are integer minutes, so the +1 margins make the strict ends
//! exact. Capacity and the formation-yard peak are then plain sums per slot.

use crate::model::{LinExpr, Model};
use crate::problem::{MachineKind, Problem, TrainId, YardKind};
use crate::time::SLOT_MINUTES;
use crate::vars::VarModel;

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem) {
    let big_m = problem.big_m();
    let slots = problem.horizon_slots();

    for yard in YardKind::ALL {
        for (train, entry, exit) in intervals(vars, problem, yard) {
            for slot in 0..slots {
                let m = (slot * SLOT_MINUTES) as f64;
                let occ = vars.occ(yard, &train, slot);
                let tag = format!("occ_{}_{}_s{}", yard.label(), train, slot);
                let x = model.add_bin(format!("{}_x", tag));
                let y = model.add_bin(format!("{}_y", tag));
                model.le(
                    format!("{}_started", tag),
                    LinExpr::constant(m + 1.0),
                    entry.clone() + LinExpr::term(x, big_m),
                );
                model.le(
                    format!("{}_not_ended", tag),
                    exit.clone(),
                    LinExpr::constant(m) + LinExpr::term(y, big_m),
                );
                model.ge(format!("{}_and", tag), occ, x + y - LinExpr::constant(1.0));
                let off = (LinExpr::constant(1.0) - occ) * big_m;
                model.le(
                    format!("{}_entry", tag),
                    entry.clone(),
                    LinExpr::constant(m) + off.clone(),
                );
                model.le(
                    format!("{}_exit", tag),
                    LinExpr::constant(m + 1.0),
                    exit.clone() + off,
                );
            }
        }
    }

    for yard in YardKind::ALL {
        let Some(info) = problem.yards.get(&yard) else { continue };
        for slot in 0..slots {
            let occupants = LinExpr::sum(
                vars.yard_occ
                    .iter()
                    .filter(|((y, _, s), _)| *y == yard && *s == slot)
                    .map(|(_, &v)| v),
            );
            model.le(
                format!("tracks_{}_s{}", yard.label(), slot),
                occupants.clone(),
                info.tracks as f64,
            );
            if let Some(&peak) = vars.yard_peak.get(&yard) {
                model.ge(format!("peak_{}_s{}", yard.label(), slot), peak, occupants);
            }
        }
    }
    log::debug!("occupancy constraints registered");
}

/// Symbolic `(train, entry, exit)` intervals for one yard, minutes.
fn intervals(
    vars: &VarModel,
    problem: &Problem,
    yard: YardKind,
) -> Vec<(TrainId, LinExpr, LinExpr)> {
    let mut out = Vec::new();
    match yard {
        YardKind::Reception => {
            let dur = problem.machine(MachineKind::Deb).duration as f64;
            for arr in &problem.arrivals {
                let a = vars.op(arr, MachineKind::Deb);
                out.push((
                    arr.clone(),
                    LinExpr::constant(arr.minute as f64),
                    a + LinExpr::constant(dur),
                ));
            }
        }
        YardKind::Formation => {
            let dur = problem.machine(MachineKind::Deg).duration as f64;
            for dep in &problem.departures {
                let b = vars.op(dep, MachineKind::For);
                let c = vars.op(dep, MachineKind::Deg);
                out.push((dep.clone(), b.into(), c + LinExpr::constant(dur)));
            }
            for arr in &problem.arrivals {
                let Some(dep) = problem.departure_requiring(arr) else { continue };
                let a = vars.op(arr, MachineKind::Deb);
                let b = vars.op(dep, MachineKind::For);
                out.push((arr.clone(), a.into(), b.into()));
            }
        }
        YardKind::Departure => {
            for dep in &problem.departures {
                let c = vars.op(dep, MachineKind::Deg);
                out.push((dep.clone(), c.into(), LinExpr::constant(dep.minute as f64)));
            }
        }
    }
    out
}
