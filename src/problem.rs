//! Normalized domain data for one planning run.
//!
//! Everything is expressed in absolute minutes from the horizon origin
//! (see [`crate::time`]); the parser is responsible for getting instances into
//! this shape. Trains are immutable facts taken from the timetable; the
//! solver decides *when* their operations run, never which trains exist.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::schedule::Schedule;
use crate::time::{slot_of, SLOT_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Arrival,
    Departure,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Arrival => "ARR",
            Direction::Departure => "DEP",
        }
    }
}

/// Identity of a train: direction, timetable number and reference minute
/// (arrival time for arrivals, departure time for departures). The full tuple
/// is the key everywhere; train numbers repeat across days.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrainId {
    pub direction: Direction,
    pub number: String,
    pub minute: i32,
}

impl TrainId {
    pub fn arrival(number: impl Into<String>, minute: i32) -> Self {
        TrainId { direction: Direction::Arrival, number: number.into(), minute }
    }

    pub fn departure(number: impl Into<String>, minute: i32) -> Self {
        TrainId { direction: Direction::Departure, number: number.into(), minute }
    }
}

impl std::fmt::Display for TrainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.direction.label(), self.number, self.minute)
    }
}

/// The three yard machines. Each one doubles as the name of the operation it
/// performs on a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MachineKind {
    /// Decoupling of an arrival train ("débranchement").
    Deb,
    /// Assembly of a departure train ("formation").
    For,
    /// Departure readying ("dégarage").
    Deg,
}

impl MachineKind {
    pub const ALL: [MachineKind; 3] = [MachineKind::Deb, MachineKind::For, MachineKind::Deg];

    pub fn label(&self) -> &'static str {
        match self {
            MachineKind::Deb => "DEB",
            MachineKind::For => "FOR",
            MachineKind::Deg => "DEG",
        }
    }

    /// Direction of the trains this machine operates on.
    pub fn direction(&self) -> Direction {
        match self {
            MachineKind::Deb => Direction::Arrival,
            MachineKind::For | MachineKind::Deg => Direction::Departure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum YardKind {
    Reception,
    Formation,
    Departure,
}

impl YardKind {
    pub const ALL: [YardKind; 3] = [YardKind::Reception, YardKind::Formation, YardKind::Departure];

    pub fn label(&self) -> &'static str {
        match self {
            YardKind::Reception => "WPY_REC",
            YardKind::Formation => "WPY_FOR",
            YardKind::Departure => "WPY_DEP",
        }
    }
}

/// One unavailability window, already expanded to its absolute occurrences
/// (one per week the horizon covers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub occurrences: Vec<(i32, i32)>,
}

#[derive(Debug, Clone)]
pub struct MachineInfo {
    /// Fixed processing time of one train, minutes.
    pub duration: i32,
    pub windows: Vec<Window>,
}

#[derive(Debug, Clone)]
pub struct YardInfo {
    pub tracks: i32,
    pub windows: Vec<Window>,
}

/// One step of the per-direction human-task sequence (jalon 3).
#[derive(Debug, Clone)]
pub struct TaskDef {
    /// 1-based position in the direction's fixed sequence.
    pub order: u8,
    pub duration: i32,
    pub yard: YardKind,
    pub label: String,
}

/// Crew pools a shift can belong to. The two combined-duty pools cover the
/// reception or formation chain plus the departure-side brake test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolKind {
    Reception,
    Formation,
    Departure,
    ReceptionDeparture,
    FormationDeparture,
}

impl PoolKind {
    pub const ALL: [PoolKind; 5] = [
        PoolKind::Reception,
        PoolKind::Formation,
        PoolKind::Departure,
        PoolKind::ReceptionDeparture,
        PoolKind::FormationDeparture,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PoolKind::Reception => "roulement_reception",
            PoolKind::Formation => "roulement_formation",
            PoolKind::Departure => "roulement_depart",
            PoolKind::ReceptionDeparture => "roulement_reception_depart",
            PoolKind::FormationDeparture => "roulement_formation_depart",
        }
    }
}

/// A concrete work shift ("journée de service") instantiated from the weekly
/// roster: one `[start, end)` interval in absolute minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Pool {
    pub shifts: Vec<Shift>,
    /// Agents on duty while one of this pool's shifts is active.
    pub agents: i32,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub origin: NaiveDate,
    pub horizon_minutes: i32,
    pub machines: BTreeMap<MachineKind, MachineInfo>,
    pub yards: BTreeMap<YardKind, YardInfo>,
    pub arrivals: Vec<TrainId>,
    pub departures: Vec<TrainId>,
    /// Departure train -> arrival trains whose wagons it incorporates.
    pub requires: BTreeMap<TrainId, Vec<TrainId>>,
    /// Ordered human-task sequences (empty outside jalon 3).
    pub arr_tasks: Vec<TaskDef>,
    pub dep_tasks: Vec<TaskDef>,
    pub pools: BTreeMap<PoolKind, Pool>,
}

impl Problem {
    pub fn horizon_slots(&self) -> i32 {
        self.horizon_minutes / SLOT_MINUTES
    }

    /// Big-M for every disjunction in the model. Some deactivated rows carry
    /// an end time (start plus duration) or a separation gap on one side, so
    /// M must dominate the horizon plus the longest duration and the widest
    /// gap, otherwise feasible points near the horizon edge get cut off.
    pub fn big_m(&self) -> f64 {
        let longest = self
            .machines
            .values()
            .map(|m| m.duration)
            .chain(self.arr_tasks.iter().chain(&self.dep_tasks).map(|t| t.duration))
            .max()
            .unwrap_or(0);
        (self.horizon_minutes + longest.max(SLOT_MINUTES) + 2) as f64
    }

    pub fn machine(&self, kind: MachineKind) -> &MachineInfo {
        self.machines
            .get(&kind)
            .unwrap_or_else(|| panic!("machine {} missing from instance", kind.label()))
    }

    pub fn yard(&self, kind: YardKind) -> &YardInfo {
        self.yards
            .get(&kind)
            .unwrap_or_else(|| panic!("yard {} missing from instance", kind.label()))
    }

    /// Latest departure train whose consist requires `arr`, if any. Its
    /// assembly is when the arrival's wagons leave the formation yard, so
    /// with several takers the last one to depart keeps the track.
    pub fn departure_requiring(&self, arr: &TrainId) -> Option<&TrainId> {
        self.requires
            .iter()
            .filter(|(_, arrs)| arrs.contains(arr))
            .map(|(dep, _)| dep)
            .max_by_key(|dep| (dep.minute, &dep.number))
    }

    pub fn task(&self, direction: Direction, order: u8) -> &TaskDef {
        let seq = match direction {
            Direction::Arrival => &self.arr_tasks,
            Direction::Departure => &self.dep_tasks,
        };
        seq.iter()
            .find(|t| t.order == order)
            .unwrap_or_else(|| panic!("no {} task with order {}", direction.label(), order))
    }

    /// Check a solved schedule against the invariants the model is supposed
    /// to enforce. Returns human-readable violations; empty means the
    /// schedule is consistent.
    pub fn verify_schedule(&self, schedule: &Schedule) -> Vec<String> {
        let mut violations = Vec::new();

        // Starts on the quarter-hour grid, inside the horizon.
        for ((train, op), &t) in &schedule.operations {
            if t < 0 || t % SLOT_MINUTES != 0 {
                violations.push(format!("{} {} starts at {} (off-grid)", op.label(), train, t));
            }
        }
        for ((train, order), &t) in &schedule.tasks {
            if t < 0 || t % SLOT_MINUTES != 0 {
                violations.push(format!("task {} of {} starts at {} (off-grid)", order, train, t));
            }
        }

        // One train per machine: pairwise disjoint processing intervals.
        for machine in MachineKind::ALL {
            let duration = self.machine(machine).duration;
            let starts: Vec<(&TrainId, i32)> = schedule
                .operations
                .iter()
                .filter(|((_, op), _)| *op == machine)
                .map(|((train, _), &t)| (train, t))
                .collect();
            for (i, (t1, s1)) in starts.iter().enumerate() {
                for (t2, s2) in starts.iter().skip(i + 1) {
                    if s1 + duration > *s2 && *s2 + duration > *s1 {
                        violations.push(format!(
                            "machine {}: {} [{}..{}) overlaps {} [{}..{})",
                            machine.label(),
                            t1,
                            s1,
                            s1 + duration,
                            t2,
                            s2,
                            s2 + duration
                        ));
                    }
                }
            }
        }

        // Required predecessors: assembly waits for every decoupling + buffer.
        for (dep, arrs) in &self.requires {
            let Some(&b) = schedule.operations.get(&(dep.clone(), MachineKind::For)) else {
                continue;
            };
            for arr in arrs {
                if let Some(&a) = schedule.operations.get(&(arr.clone(), MachineKind::Deb)) {
                    if b < a + 15 {
                        violations.push(format!(
                            "FOR of {} at {} precedes DEB of {} at {} + 15",
                            dep, b, arr, a
                        ));
                    }
                }
            }
        }

        // Track capacity, slot by slot, from the reconstructed intervals.
        for yard in YardKind::ALL {
            let tracks = match self.yards.get(&yard) {
                Some(info) => info.tracks,
                None => continue,
            };
            let intervals = self.occupancy_intervals(schedule, yard);
            for slot in 0..self.horizon_slots() {
                let occupied = intervals
                    .iter()
                    .filter(|(_, entry, exit)| slot_of(*entry) <= slot && slot < slot_of(*exit))
                    .count() as i32;
                if occupied > tracks {
                    violations.push(format!(
                        "yard {}: {} trains at slot {} exceeds {} tracks",
                        yard.label(),
                        occupied,
                        slot,
                        tracks
                    ));
                }
            }
        }

        // Shift containment; assignment uniqueness is structural in the map.
        for ((train, order), (pool, shift_idx)) in &schedule.task_shifts {
            let Some(&t) = schedule.tasks.get(&(train.clone(), *order)) else {
                violations.push(format!("task {} of {} assigned but unscheduled", order, train));
                continue;
            };
            let duration = self.task(train.direction, *order).duration;
            let shift = self.pools[pool].shifts[*shift_idx];
            if t < shift.start || t + duration > shift.end {
                violations.push(format!(
                    "task {} of {} [{}..{}) outside {} shift [{}..{})",
                    order,
                    train,
                    t,
                    t + duration,
                    pool.label(),
                    shift.start,
                    shift.end
                ));
            }
        }

        violations
    }

    /// `(train, entry, exit)` occupancy intervals of a yard, in minutes.
    pub(crate) fn occupancy_intervals(&self, schedule: &Schedule, yard: YardKind) -> Vec<(TrainId, i32, i32)> {
        let mut out = Vec::new();
        match yard {
            YardKind::Reception => {
                let dur = self.machine(MachineKind::Deb).duration;
                for arr in &self.arrivals {
                    if let Some(&a) = schedule.operations.get(&(arr.clone(), MachineKind::Deb)) {
                        out.push((arr.clone(), arr.minute, a + dur));
                    }
                }
            }
            YardKind::Formation => {
                let dur = self.machine(MachineKind::Deg).duration;
                for dep in &self.departures {
                    let b = schedule.operations.get(&(dep.clone(), MachineKind::For));
                    let c = schedule.operations.get(&(dep.clone(), MachineKind::Deg));
                    if let (Some(&b), Some(&c)) = (b, c) {
                        out.push((dep.clone(), b, c + dur));
                    }
                }
                for arr in &self.arrivals {
                    let Some(dep) = self.departure_requiring(arr) else { continue };
                    let a = schedule.operations.get(&(arr.clone(), MachineKind::Deb));
                    let b = schedule.operations.get(&(dep.clone(), MachineKind::For));
                    if let (Some(&a), Some(&b)) = (a, b) {
                        out.push((arr.clone(), a, b));
                    }
                }
            }
            YardKind::Departure => {
                for dep in &self.departures {
                    if let Some(&c) = schedule.operations.get(&(dep.clone(), MachineKind::Deg)) {
                        out.push((dep.clone(), c, dep.minute));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_problem() -> Problem {
        let mut machines = BTreeMap::new();
        machines.insert(MachineKind::Deb, MachineInfo { duration: 15, windows: vec![] });
        machines.insert(MachineKind::For, MachineInfo { duration: 15, windows: vec![] });
        machines.insert(MachineKind::Deg, MachineInfo { duration: 15, windows: vec![] });
        Problem {
            origin: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            horizon_minutes: 24 * 60,
            machines,
            yards: BTreeMap::new(),
            arrivals: vec![TrainId::arrival("1", 60)],
            departures: vec![TrainId::departure("9", 20 * 60)],
            requires: BTreeMap::new(),
            arr_tasks: vec![],
            dep_tasks: vec![],
            pools: BTreeMap::new(),
        }
    }

    #[test]
    fn off_grid_start_is_flagged() {
        let problem = base_problem();
        let mut schedule = Schedule::default();
        schedule
            .operations
            .insert((problem.arrivals[0].clone(), MachineKind::Deb), 127);
        let violations = problem.verify_schedule(&schedule);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("off-grid"));
    }

    #[test]
    fn overlapping_machine_use_is_flagged() {
        let mut problem = base_problem();
        problem.arrivals.push(TrainId::arrival("2", 70));
        let mut schedule = Schedule::default();
        schedule
            .operations
            .insert((problem.arrivals[0].clone(), MachineKind::Deb), 150);
        schedule
            .operations
            .insert((problem.arrivals[1].clone(), MachineKind::Deb), 150);
        let violations = problem.verify_schedule(&schedule);
        assert!(violations.iter().any(|v| v.contains("overlaps")));
    }

    #[test]
    fn wagons_wait_for_the_last_requiring_departure() {
        let mut problem = base_problem();
        problem.departures = vec![TrainId::departure("1", 200), TrainId::departure("9", 400)];
        for dep in problem.departures.clone() {
            problem.requires.insert(dep, vec![problem.arrivals[0].clone()]);
        }
        let dep = problem.departure_requiring(&problem.arrivals[0]).unwrap();
        assert_eq!(dep.minute, 400);
    }

    #[test]
    fn big_m_covers_end_times_at_the_horizon_edge() {
        let mut problem = base_problem();
        problem.machines.get_mut(&MachineKind::Deb).unwrap().duration = 45;
        assert!(problem.big_m() > (problem.horizon_minutes + 45) as f64);
    }

    #[test]
    fn predecessor_buffer_is_checked() {
        let mut problem = base_problem();
        problem
            .requires
            .insert(problem.departures[0].clone(), vec![problem.arrivals[0].clone()]);
        let mut schedule = Schedule::default();
        schedule
            .operations
            .insert((problem.arrivals[0].clone(), MachineKind::Deb), 120);
        schedule
            .operations
            .insert((problem.departures[0].clone(), MachineKind::For), 120);
        let violations = problem.verify_schedule(&schedule);
        assert!(violations.iter().any(|v| v.contains("precedes")));
    }
}
