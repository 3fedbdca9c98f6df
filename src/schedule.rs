//! Solution projection: from raw variable values to the scheduled minutes,
//! and from there to the serializable report the CLI writes out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::problem::{MachineKind, PoolKind, Problem, TrainId, YardKind};
use crate::solve::Assignment;
use crate::time::{minute_to_day_time, slot_of};
use crate::vars::VarModel;

/// The decisions of one solved instance, in absolute minutes.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub operations: BTreeMap<(TrainId, MachineKind), i32>,
    pub tasks: BTreeMap<(TrainId, u8), i32>,
    /// Shift carrying each human task.
    pub task_shifts: BTreeMap<(TrainId, u8), (PoolKind, usize)>,
    pub objective: f64,
}

impl Schedule {
    pub fn from_assignment(vars: &VarModel, assignment: &Assignment) -> Schedule {
        let mut schedule = Schedule { objective: assignment.objective, ..Schedule::default() };
        for (key, &var) in &vars.op_start {
            schedule.operations.insert(key.clone(), assignment.int(var));
        }
        for (key, &var) in &vars.task_start {
            schedule.tasks.insert(key.clone(), assignment.int(var));
        }
        for ((pool, idx, train, order), &var) in &vars.assign {
            if assignment.int(var) == 1 {
                schedule
                    .task_shifts
                    .insert((train.clone(), *order), (*pool, *idx));
            }
        }
        schedule
    }
}

#[derive(Debug, Serialize)]
pub struct OperationRecord {
    pub train: String,
    pub operation: String,
    pub day: String,
    pub time: String,
    pub minute: i32,
}

#[derive(Debug, Serialize)]
pub struct YardRecord {
    pub yard: String,
    pub peak: i32,
    pub tracks: i32,
    pub utilization_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct TaskRecord {
    pub train: String,
    pub order: u8,
    pub label: String,
    pub day: String,
    pub time: String,
    pub pool: Option<String>,
    pub shift: Option<usize>,
}

/// Shifts activated by one pool on one calendar day.
#[derive(Debug, Serialize)]
pub struct ShiftDayRecord {
    pub pool: String,
    pub day: String,
    pub activated: usize,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub operations: Vec<OperationRecord>,
    pub yards: Vec<YardRecord>,
    pub tasks: Vec<TaskRecord>,
    pub shift_days: Vec<ShiftDayRecord>,
    pub total_shifts: usize,
    pub objective: f64,
}

pub fn report(problem: &Problem, schedule: &Schedule) -> Report {
    let operations = schedule
        .operations
        .iter()
        .map(|((train, op), &minute)| {
            let (day, time) = minute_to_day_time(minute, problem.origin);
            OperationRecord {
                train: train.to_string(),
                operation: op.label().to_string(),
                day,
                time,
                minute,
            }
        })
        .collect();

    let yards = YardKind::ALL
        .iter()
        .filter_map(|&yard| {
            let info = problem.yards.get(&yard)?;
            let peak = peak_occupancy(problem, schedule, yard);
            Some(YardRecord {
                yard: yard.label().to_string(),
                peak,
                tracks: info.tracks,
                utilization_pct: if info.tracks > 0 {
                    100.0 * peak as f64 / info.tracks as f64
                } else {
                    0.0
                },
            })
        })
        .collect();

    let tasks = schedule
        .tasks
        .iter()
        .map(|((train, order), &minute)| {
            let (day, time) = minute_to_day_time(minute, problem.origin);
            let assigned = schedule.task_shifts.get(&(train.clone(), *order));
            TaskRecord {
                train: train.to_string(),
                order: *order,
                label: problem.task(train.direction, *order).label.clone(),
                day,
                time,
                pool: assigned.map(|(pool, _)| pool.label().to_string()),
                shift: assigned.map(|(_, idx)| *idx),
            }
        })
        .collect();

    let mut per_day: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut used: Vec<(PoolKind, usize)> = schedule.task_shifts.values().copied().collect();
    used.sort();
    used.dedup();
    let total_shifts = used.len();
    for (pool, idx) in used {
        let shift = problem.pools[&pool].shifts[idx];
        let (day, _) = minute_to_day_time(shift.start, problem.origin);
        *per_day.entry((pool.label().to_string(), day)).or_default() += 1;
    }
    let shift_days = per_day
        .into_iter()
        .map(|((pool, day), activated)| ShiftDayRecord { pool, day, activated })
        .collect();

    Report {
        operations,
        yards,
        tasks,
        shift_days,
        total_shifts,
        objective: schedule.objective,
    }
}

/// Largest number of simultaneously held tracks over the horizon.
fn peak_occupancy(problem: &Problem, schedule: &Schedule, yard: YardKind) -> i32 {
    let intervals = problem.occupancy_intervals(schedule, yard);
    (0..problem.horizon_slots())
        .map(|slot| {
            intervals
                .iter()
                .filter(|(_, entry, exit)| slot_of(*entry) <= slot && slot < slot_of(*exit))
                .count() as i32
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{MachineInfo, YardInfo};
    use chrono::NaiveDate;

    #[test]
    fn peak_counts_overlapping_stays() {
        let mut machines = BTreeMap::new();
        machines.insert(MachineKind::Deb, MachineInfo { duration: 15, windows: vec![] });
        let mut yards = BTreeMap::new();
        yards.insert(YardKind::Reception, YardInfo { tracks: 3, windows: vec![] });
        let problem = Problem {
            origin: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            horizon_minutes: 480,
            machines,
            yards,
            arrivals: vec![TrainId::arrival("1", 0), TrainId::arrival("2", 30)],
            departures: vec![],
            requires: BTreeMap::new(),
            arr_tasks: vec![],
            dep_tasks: vec![],
            pools: BTreeMap::new(),
        };
        let mut schedule = Schedule::default();
        schedule
            .operations
            .insert((problem.arrivals[0].clone(), MachineKind::Deb), 120);
        schedule
            .operations
            .insert((problem.arrivals[1].clone(), MachineKind::Deb), 180);
        // Both trains sit in reception during slots 8..9.
        assert_eq!(peak_occupancy(&problem, &schedule, YardKind::Reception), 2);
        let report = report(&problem, &schedule);
        assert_eq!(report.yards.len(), 1);
        assert_eq!(report.yards[0].peak, 2);
    }
}
