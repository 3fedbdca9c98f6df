//! Human tasks and crew shifts (jalon 3).
//!
//! Every task is handed to exactly one shift of an eligible pool and must fit
//! inside that shift's interval. A shift is "used" as soon as it carries a
//! task; a pool is "active" in a slot when a used shift covers it. Per slot,
//! the tasks in progress on a yard side may not outnumber the agents the
//! active pools bring there.

use crate::model::{LinExpr, Model, Var};
use crate::problem::{Direction, PoolKind, Problem};
use crate::time::SLOT_MINUTES;
use crate::vars::VarModel;

/// Dominates the number of tasks one shift can carry.
const TASKS_PER_SHIFT_BOUND: f64 = 100.0;

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem) {
    let big_m = problem.big_m();
    let slots = problem.horizon_slots();

    // Placement: an assigned task lies inside the shift.
    for ((pool, idx, train, order), &assign) in &vars.assign {
        let shift = problem.pools[pool].shifts[*idx];
        let th = vars.task(train, *order);
        let dur = problem.task(train.direction, *order).duration as f64;
        let unassigned = (LinExpr::constant(1.0) - assign) * big_m;
        let tag = format!("fit_{}_{}_{}_{}", pool.label(), idx, train, order);
        model.ge(
            format!("{}_lo", tag),
            th,
            LinExpr::constant(shift.start as f64) - unassigned.clone(),
        );
        model.le(
            format!("{}_hi", tag),
            th + LinExpr::constant(dur),
            LinExpr::constant(shift.end as f64) + unassigned,
        );
    }

    // Coverage: exactly one shift per task.
    for (train, order) in vars.task_start.keys() {
        let options = LinExpr::sum(
            vars.assign
                .iter()
                .filter(|((_, _, t, o), _)| t == train && o == order)
                .map(|(_, &v)| v),
        );
        assert!(
            !options.terms.is_empty(),
            "no eligible shift for task {} of {}",
            order,
            train
        );
        model.eq(format!("covered_{}_{}", train, order), options, 1.0);
    }

    // Task-in-progress binaries, same interval linearization as occupancy.
    for ((train, order), &th) in &vars.task_start {
        let dur = problem.task(train.direction, *order).duration as f64;
        for slot in 0..slots {
            let m = (slot * SLOT_MINUTES) as f64;
            let busy = vars.task_busy[&(train.clone(), *order, slot)];
            let tag = format!("busy_{}_{}_s{}", train, order, slot);
            let x = model.add_bin(format!("{}_x", tag));
            let y = model.add_bin(format!("{}_y", tag));
            model.le(
                format!("{}_started", tag),
                LinExpr::constant(m + 1.0),
                th + LinExpr::term(x, big_m),
            );
            model.le(
                format!("{}_not_ended", tag),
                th + LinExpr::constant(dur),
                LinExpr::constant(m) + LinExpr::term(y, big_m),
            );
            model.ge(format!("{}_and", tag), busy, x + y - LinExpr::constant(1.0));
            let idle = (LinExpr::constant(1.0) - busy) * big_m;
            model.le(format!("{}_entry", tag), th, LinExpr::constant(m) + idle.clone());
            model.le(
                format!("{}_exit", tag),
                LinExpr::constant(m + 1.0),
                th + LinExpr::constant(dur) + idle,
            );
        }
    }

    // Shift usage flags.
    for ((pool, idx), &used) in &vars.shift_used {
        let carried = LinExpr::sum(
            vars.assign
                .iter()
                .filter(|((p, i, _, _), _)| p == pool && i == idx)
                .map(|(_, &v)| v),
        );
        model.ge(format!("used_lo_{}_{}", pool.label(), idx), carried.clone(), used);
        model.le(
            format!("used_hi_{}_{}", pool.label(), idx),
            carried,
            LinExpr::term(used, TASKS_PER_SHIFT_BOUND),
        );
    }

    // Pool activity per slot: active iff some used shift covers the slot.
    for ((pool, slot), &active) in &vars.pool_active {
        let m = slot * SLOT_MINUTES;
        let covering: Vec<Var> = problem.pools[pool]
            .shifts
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start <= m && m < s.end)
            .map(|(i, _)| vars.shift_used[&(*pool, i)])
            .collect();
        let tag = format!("active_{}_s{}", pool.label(), slot);
        if covering.is_empty() {
            model.eq(tag, active, 0.0);
            continue;
        }
        for (k, &used) in covering.iter().enumerate() {
            model.ge(format!("{}_ge{}", tag, k), active, used);
        }
        model.le(format!("{}_le", tag), active, LinExpr::sum(covering));
    }

    // Agent capacity per yard side.
    for slot in 0..slots {
        let busy_where = |pred: &dyn Fn(Direction, u8) -> bool| {
            LinExpr::sum(
                vars.task_busy
                    .iter()
                    .filter(|((t, o, s), _)| *s == slot && pred(t.direction, *o))
                    .map(|(_, &v)| v),
            )
        };
        let capacity = |pools: &[PoolKind]| {
            let mut expr = LinExpr::default();
            for &pool in pools {
                let (Some(info), Some(&active)) =
                    (problem.pools.get(&pool), vars.pool_active.get(&(pool, slot)))
                else {
                    continue;
                };
                expr = expr + LinExpr::term(active, info.agents as f64);
            }
            expr
        };

        model.le(
            format!("agents_rec_s{}", slot),
            busy_where(&|d, _| d == Direction::Arrival),
            capacity(&[PoolKind::Reception, PoolKind::ReceptionDeparture]),
        );
        model.le(
            format!("agents_for_s{}", slot),
            busy_where(&|d, o| d == Direction::Departure && o < 4),
            capacity(&[PoolKind::Formation, PoolKind::FormationDeparture]),
        );
        model.le(
            format!("agents_dep_s{}", slot),
            busy_where(&|d, o| d == Direction::Departure && o == 4),
            capacity(&[
                PoolKind::Departure,
                PoolKind::ReceptionDeparture,
                PoolKind::FormationDeparture,
            ]),
        );
    }

    // Total shifts used, the jalon 3 objective.
    if let Some(total) = vars.total_shifts {
        model.eq(
            "total_shifts",
            total,
            LinExpr::sum(vars.shift_used.values().copied()),
        );
    }
    log::debug!("shift constraints registered");
}
