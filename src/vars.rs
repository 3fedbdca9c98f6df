//! Decision-variable registry.
//!
//! All variables shared between constraint families are declared here in one
//! pass, keyed by domain objects, so every encoder looks variables up instead
//! of creating its own. Local big-M helper binaries stay inside the encoder
//! that needs them.

use std::collections::BTreeMap;

use crate::encode::Milestone;
use crate::model::{Model, Var};
use crate::problem::{Direction, MachineKind, PoolKind, Problem, TrainId, YardKind};

/// Pools allowed to take a given human task. The combined-duty pools carry
/// their own chain plus the departure-side brake test.
pub fn eligible_pools(direction: Direction, order: u8) -> &'static [PoolKind] {
    match (direction, order) {
        (Direction::Arrival, _) => &[PoolKind::Reception, PoolKind::ReceptionDeparture],
        (Direction::Departure, 4) => &[
            PoolKind::Departure,
            PoolKind::ReceptionDeparture,
            PoolKind::FormationDeparture,
        ],
        (Direction::Departure, _) => &[PoolKind::Formation, PoolKind::FormationDeparture],
    }
}

#[derive(Debug, Default)]
pub struct VarModel {
    /// Machine operation start, minutes from origin.
    pub op_start: BTreeMap<(TrainId, MachineKind), Var>,
    /// Human task start, minutes from origin (jalon 3).
    pub task_start: BTreeMap<(TrainId, u8), Var>,
    /// Train occupies a yard track during a slot (jalon 2+).
    pub yard_occ: BTreeMap<(YardKind, TrainId, i32), Var>,
    /// Running maximum of formation-yard occupancy (jalon 2+).
    pub yard_peak: BTreeMap<YardKind, Var>,
    /// Task handled by shift `idx` of a pool (jalon 3).
    pub assign: BTreeMap<(PoolKind, usize, TrainId, u8), Var>,
    pub shift_used: BTreeMap<(PoolKind, usize), Var>,
    /// Some used shift of the pool covers the slot (jalon 3).
    pub pool_active: BTreeMap<(PoolKind, i32), Var>,
    /// Task in progress during a slot (jalon 3).
    pub task_busy: BTreeMap<(TrainId, u8, i32), Var>,
    pub total_shifts: Option<Var>,
}

impl VarModel {
    pub fn declare(model: &mut Model, problem: &Problem, milestone: Milestone) -> Self {
        let mut vars = VarModel::default();
        let horizon = problem.horizon_minutes;

        for arr in &problem.arrivals {
            let v = model.add_int(format!("t_DEB_{}", arr), 0, horizon);
            vars.op_start.insert((arr.clone(), MachineKind::Deb), v);
        }
        for dep in &problem.departures {
            for op in [MachineKind::For, MachineKind::Deg] {
                let v = model.add_int(format!("t_{}_{}", op.label(), dep), 0, horizon);
                vars.op_start.insert((dep.clone(), op), v);
            }
        }

        if milestone >= Milestone::Jalon2 {
            vars.declare_occupancy(model, problem);
        }
        if milestone >= Milestone::Jalon3 {
            vars.declare_tasks(model, problem);
        }

        log::debug!(
            "declared {} variables for {} trains",
            model.num_vars(),
            problem.arrivals.len() + problem.departures.len()
        );
        vars
    }

    fn declare_occupancy(&mut self, model: &mut Model, problem: &Problem) {
        for slot in 0..problem.horizon_slots() {
            for arr in &problem.arrivals {
                let v = model.add_bin(format!("occ_REC_{}_s{}", arr, slot));
                self.yard_occ.insert((YardKind::Reception, arr.clone(), slot), v);
                if problem.departure_requiring(arr).is_some() {
                    let v = model.add_bin(format!("occ_FOR_{}_s{}", arr, slot));
                    self.yard_occ.insert((YardKind::Formation, arr.clone(), slot), v);
                }
            }
            for dep in &problem.departures {
                let v = model.add_bin(format!("occ_FOR_{}_s{}", dep, slot));
                self.yard_occ.insert((YardKind::Formation, dep.clone(), slot), v);
                let v = model.add_bin(format!("occ_DEP_{}_s{}", dep, slot));
                self.yard_occ.insert((YardKind::Departure, dep.clone(), slot), v);
            }
        }
        let tracks = problem.yard(YardKind::Formation).tracks;
        let peak = model.add_int("peak_FOR", 0, tracks);
        self.yard_peak.insert(YardKind::Formation, peak);
    }

    fn declare_tasks(&mut self, model: &mut Model, problem: &Problem) {
        let horizon = problem.horizon_minutes;
        let slots = problem.horizon_slots();

        let task_keys: Vec<(TrainId, u8)> = problem
            .arrivals
            .iter()
            .flat_map(|t| problem.arr_tasks.iter().map(move |d| (t.clone(), d.order)))
            .chain(
                problem
                    .departures
                    .iter()
                    .flat_map(|t| problem.dep_tasks.iter().map(move |d| (t.clone(), d.order))),
            )
            .collect();

        for (train, order) in &task_keys {
            let v = model.add_int(format!("th_{}_{}", train, order), 0, horizon);
            self.task_start.insert((train.clone(), *order), v);
            for slot in 0..slots {
                let v = model.add_bin(format!("busy_{}_{}_s{}", train, order, slot));
                self.task_busy.insert((train.clone(), *order, slot), v);
            }
            for &pool in eligible_pools(train.direction, *order) {
                let Some(info) = problem.pools.get(&pool) else { continue };
                for idx in 0..info.shifts.len() {
                    let v = model.add_bin(format!("assign_{}_{}_{}_{}", pool.label(), idx, train, order));
                    self.assign.insert((pool, idx, train.clone(), *order), v);
                }
            }
        }

        for (&pool, info) in &problem.pools {
            for idx in 0..info.shifts.len() {
                let v = model.add_bin(format!("used_{}_{}", pool.label(), idx));
                self.shift_used.insert((pool, idx), v);
            }
            for slot in 0..slots {
                let v = model.add_bin(format!("active_{}_s{}", pool.label(), slot));
                self.pool_active.insert((pool, slot), v);
            }
        }

        self.total_shifts = Some(model.add_int("total_shifts", 0, self.shift_used.len() as i32));
    }

    pub fn op(&self, train: &TrainId, op: MachineKind) -> Var {
        self.op_start[&(train.clone(), op)]
    }

    pub fn task(&self, train: &TrainId, order: u8) -> Var {
        self.task_start[&(train.clone(), order)]
    }

    pub fn occ(&self, yard: YardKind, train: &TrainId, slot: i32) -> Var {
        self.yard_occ[&(yard, train.clone(), slot)]
    }
}
