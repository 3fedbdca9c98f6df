//! End-to-end solves of small hand-built instances, one per planning depth.
//! Horizons are kept to a few hours so the pure-Rust backend stays fast.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use yardsched::encode::{self, Milestone};
use yardsched::problem::{
    Direction, MachineInfo, MachineKind, Pool, PoolKind, Problem, Shift, TaskDef, TrainId, Window,
    YardInfo, YardKind,
};
use yardsched::schedule::Schedule;
use yardsched::solve::{solve, SolveOptions, SolveOutcome};

fn base_problem(horizon_minutes: i32) -> Problem {
    let mut machines = BTreeMap::new();
    for kind in MachineKind::ALL {
        machines.insert(kind, MachineInfo { duration: 15, windows: vec![] });
    }
    let mut yards = BTreeMap::new();
    yards.insert(YardKind::Reception, YardInfo { tracks: 4, windows: vec![] });
    yards.insert(YardKind::Formation, YardInfo { tracks: 4, windows: vec![] });
    yards.insert(YardKind::Departure, YardInfo { tracks: 4, windows: vec![] });
    Problem {
        origin: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        horizon_minutes,
        machines,
        yards,
        arrivals: vec![],
        departures: vec![],
        requires: BTreeMap::new(),
        arr_tasks: vec![],
        dep_tasks: vec![],
        pools: BTreeMap::new(),
    }
}

fn task_sequences(problem: &mut Problem) {
    problem.arr_tasks = vec![
        TaskDef { order: 1, duration: 15, yard: YardKind::Reception, label: "preparation".into() },
        TaskDef { order: 2, duration: 15, yard: YardKind::Reception, label: "inspection".into() },
        TaskDef { order: 3, duration: 15, yard: YardKind::Reception, label: "decoupling".into() },
    ];
    problem.dep_tasks = vec![
        TaskDef { order: 1, duration: 15, yard: YardKind::Formation, label: "assembly".into() },
        TaskDef { order: 2, duration: 15, yard: YardKind::Formation, label: "coupling".into() },
        TaskDef { order: 3, duration: 15, yard: YardKind::Formation, label: "readying".into() },
        TaskDef { order: 4, duration: 15, yard: YardKind::Departure, label: "brake test".into() },
    ];
}

fn solve_to_schedule(problem: &Problem, milestone: Milestone) -> Schedule {
    let encoding = encode::build(problem, milestone);
    match solve(&encoding.model, &SolveOptions::default()).unwrap() {
        SolveOutcome::Optimal(assignment) => Schedule::from_assignment(&encoding.vars, &assignment),
        SolveOutcome::Infeasible(iis) => {
            panic!("unexpected infeasibility, core: {:?}", iis.constraints)
        }
    }
}

#[test]
fn close_arrivals_share_the_decoupling_machine_in_turn() {
    let mut problem = base_problem(480);
    problem.arrivals = vec![TrainId::arrival("1", 0), TrainId::arrival("2", 5)];
    let schedule = solve_to_schedule(&problem, Milestone::Jalon1);

    let a1 = schedule.operations[&(problem.arrivals[0].clone(), MachineKind::Deb)];
    let a2 = schedule.operations[&(problem.arrivals[1].clone(), MachineKind::Deb)];
    assert!(a1 >= 60 && a2 >= 65, "decoupling waits an hour after arrival");
    assert_eq!(a1 % 15, 0);
    assert_eq!(a2 % 15, 0);
    assert!((a1 - a2).abs() >= 15, "one decoupling at a time");
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn machine_closure_pushes_decoupling_past_the_window() {
    let mut problem = base_problem(480);
    problem.arrivals = vec![TrainId::arrival("1", 0)];
    problem.departures = vec![TrainId::departure("9", 470)];
    problem
        .requires
        .insert(problem.departures[0].clone(), vec![problem.arrivals[0].clone()]);
    problem.machines.get_mut(&MachineKind::Deb).unwrap().windows =
        vec![Window { occurrences: vec![(60, 105)] }];
    let schedule = solve_to_schedule(&problem, Milestone::Jalon1);

    let a = schedule.operations[&(problem.arrivals[0].clone(), MachineKind::Deb)];
    // The hour wait rules out finishing before the window opens.
    assert!(a >= 120, "decoupling lands after the closure, got {}", a);
    // The closure propagates through the hand-over to assembly.
    let b = schedule.operations[&(problem.departures[0].clone(), MachineKind::For)];
    assert!(b >= a + 15, "assembly waits for the decoupling hand-over");
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn impossible_connection_yields_an_infeasible_core() {
    let mut problem = base_problem(480);
    problem.arrivals = vec![TrainId::arrival("1", 0)];
    problem.departures = vec![TrainId::departure("9", 100)];
    problem
        .requires
        .insert(problem.departures[0].clone(), vec![problem.arrivals[0].clone()]);

    let encoding = encode::build(&problem, Milestone::Jalon1);
    match solve(&encoding.model, &SolveOptions::default()).unwrap() {
        SolveOutcome::Infeasible(iis) => {
            assert!(!iis.constraints.is_empty());
            assert!(
                iis.constraints.iter().any(|n| n.contains("deg_deadline")),
                "departure deadline belongs to the conflict: {:?}",
                iis.constraints
            );
        }
        SolveOutcome::Optimal(_) => panic!("a 100-minute turnaround cannot be feasible"),
    }
}

#[test]
fn formation_yard_peak_is_minimized_and_capacity_held() {
    let mut problem = base_problem(330);
    problem.arrivals = vec![TrainId::arrival("1", 0)];
    problem.departures = vec![TrainId::departure("9", 300)];
    problem
        .requires
        .insert(problem.departures[0].clone(), vec![problem.arrivals[0].clone()]);
    problem.yards.get_mut(&YardKind::Formation).unwrap().tracks = 2;

    let schedule = solve_to_schedule(&problem, Milestone::Jalon2);
    // The wagons move from the decoupling hand-over straight into assembly,
    // so a single formation track suffices.
    assert!((schedule.objective - 1.0).abs() < 1e-6);
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn arrival_at_the_horizon_edge_stays_schedulable() {
    let mut problem = base_problem(480);
    problem.arrivals = vec![TrainId::arrival("1", 420)];

    // The hour wait leaves only the last grid point; its reception stay
    // then runs past the horizon, which the disjunction rows must absorb.
    let schedule = solve_to_schedule(&problem, Milestone::Jalon2);
    let a = schedule.operations[&(problem.arrivals[0].clone(), MachineKind::Deb)];
    assert_eq!(a, 480);
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn single_formation_track_serializes_two_departures() {
    let mut problem = base_problem(720);
    problem.departures = vec![TrainId::departure("8", 600), TrainId::departure("9", 660)];
    problem.yards.get_mut(&YardKind::Formation).unwrap().tracks = 1;

    let schedule = solve_to_schedule(&problem, Milestone::Jalon2);
    assert!((schedule.objective - 1.0).abs() < 1e-6);
    assert!(problem.verify_schedule(&schedule).is_empty());

    let b1 = schedule.operations[&(problem.departures[0].clone(), MachineKind::For)];
    let c1 = schedule.operations[&(problem.departures[0].clone(), MachineKind::Deg)];
    let b2 = schedule.operations[&(problem.departures[1].clone(), MachineKind::For)];
    let c2 = schedule.operations[&(problem.departures[1].clone(), MachineKind::Deg)];
    let disjoint = c1 + 15 <= b2 || c2 + 15 <= b1;
    assert!(disjoint, "formation stays overlap: [{},{}] vs [{},{}]", b1, c1, b2, c2);
}

#[test]
fn human_tasks_fit_their_shifts_and_shift_count_is_minimal() {
    let mut problem = base_problem(330);
    task_sequences(&mut problem);
    problem.departures = vec![TrainId::departure("9", 300)];
    problem.pools.insert(
        PoolKind::Formation,
        Pool { shifts: vec![Shift { start: 0, end: 330 }], agents: 2 },
    );
    problem.pools.insert(
        PoolKind::Departure,
        Pool { shifts: vec![Shift { start: 0, end: 330 }], agents: 1 },
    );

    let schedule = solve_to_schedule(&problem, Milestone::Jalon3);
    assert!((schedule.objective - 2.0).abs() < 1e-6, "one shift per pool suffices");
    assert_eq!(schedule.task_shifts.len(), 4, "every task carried by a shift");
    for ((train, order), (pool, _)) in &schedule.task_shifts {
        assert_eq!(train.direction, Direction::Departure);
        if *order == 4 {
            assert_eq!(*pool, PoolKind::Departure);
        } else {
            assert_eq!(*pool, PoolKind::Formation);
        }
    }
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn long_task_chain_spills_into_a_second_shift() {
    let mut problem = base_problem(330);
    task_sequences(&mut problem);
    problem.departures = vec![TrainId::departure("9", 300)];
    // Assembly must start before the machine closes at minute 30; the
    // formation yard itself reopens for the remaining escort tasks only at
    // minute 180, past the first formation shift.
    problem.machines.get_mut(&MachineKind::For).unwrap().windows =
        vec![Window { occurrences: vec![(30, 300)] }];
    problem.yards.get_mut(&YardKind::Formation).unwrap().windows =
        vec![Window { occurrences: vec![(30, 180)] }];
    problem.pools.insert(
        PoolKind::Formation,
        Pool {
            shifts: vec![Shift { start: 0, end: 150 }, Shift { start: 150, end: 330 }],
            agents: 2,
        },
    );
    problem.pools.insert(
        PoolKind::Departure,
        Pool { shifts: vec![Shift { start: 0, end: 330 }], agents: 1 },
    );

    let schedule = solve_to_schedule(&problem, Milestone::Jalon3);
    assert!((schedule.objective - 3.0).abs() < 1e-6, "both formation shifts activate");
    let (_, first_shift) = schedule.task_shifts[&(problem.departures[0].clone(), 1)];
    let (_, late_shift) = schedule.task_shifts[&(problem.departures[0].clone(), 3)];
    assert_eq!(first_shift, 0);
    assert_eq!(late_shift, 1);
    assert!(problem.verify_schedule(&schedule).is_empty());
}

#[test]
fn building_twice_yields_the_same_model() {
    let mut problem = base_problem(720);
    problem.arrivals = vec![TrainId::arrival("1", 0), TrainId::arrival("2", 30)];
    problem.departures = vec![TrainId::departure("9", 660)];
    problem
        .requires
        .insert(problem.departures[0].clone(), vec![problem.arrivals[0].clone()]);

    let first = encode::build(&problem, Milestone::Jalon2);
    let second = encode::build(&problem, Milestone::Jalon2);
    assert_eq!(first.model.num_vars(), second.model.num_vars());
    assert_eq!(first.model.num_constrs(), second.model.num_constrs());
    assert_eq!(first.model.write_lp(), second.model.write_lp());
}
