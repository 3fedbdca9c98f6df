//! JSON instance loading.
//!
//! An instance file carries the timetable (dated arrival and departure
//! trains), the wagon correspondences between them, the machine and yard
//! descriptions with their weekly closure windows, and for jalon 3 the human
//! task sequences and crew rosters. Weekly windows and shifts use the
//! `"(weekday,HH:MM-HH:MM);..."` notation with 1 = Monday; they are expanded
//! here onto the absolute-minute horizon so the rest of the crate never sees
//! calendars again.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::problem::{
    Direction, MachineInfo, MachineKind, Pool, PoolKind, Problem, Shift, TaskDef, TrainId, Window,
    YardInfo, YardKind,
};
use crate::time::{event_minute, parse_date, parse_hm, weekly_window, MINUTES_PER_DAY};
use crate::vars::eligible_pools;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read instance: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed instance JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Format(String),
}

fn format_err(msg: impl Into<String>) -> ParseError {
    ParseError::Format(msg.into())
}

#[derive(Debug, Deserialize)]
struct InstanceFile {
    first_day: String,
    horizon_days: i32,
    machines: Vec<MachineRow>,
    yards: Vec<YardRow>,
    arrivals: Vec<TrainRow>,
    departures: Vec<TrainRow>,
    #[serde(default)]
    correspondences: Vec<CorrespondenceRow>,
    #[serde(default)]
    tasks: Vec<TaskRow>,
    #[serde(default)]
    pools: Vec<PoolRow>,
}

#[derive(Debug, Deserialize)]
struct MachineRow {
    machine: String,
    duration: i32,
    #[serde(default)]
    unavailability: String,
}

#[derive(Debug, Deserialize)]
struct YardRow {
    yard: String,
    tracks: i32,
    #[serde(default)]
    unavailability: String,
}

#[derive(Debug, Deserialize)]
struct TrainRow {
    number: String,
    day: String,
    time: String,
}

#[derive(Debug, Deserialize)]
struct CorrespondenceRow {
    arrival_number: String,
    arrival_day: String,
    departure_number: String,
    departure_day: String,
}

#[derive(Debug, Deserialize)]
struct TaskRow {
    direction: String,
    order: u8,
    duration: i32,
    yard: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct PoolRow {
    pool: String,
    #[serde(default)]
    shifts: String,
    agents: i32,
}

pub fn load_problem(path: &Path) -> Result<Problem, ParseError> {
    let _p = hprof::enter("load instance");
    let text = std::fs::read_to_string(path)?;
    let file: InstanceFile = serde_json::from_str(&text)?;
    build_problem(file)
}

fn build_problem(file: InstanceFile) -> Result<Problem, ParseError> {
    let origin = parse_date(&file.first_day)
        .ok_or_else(|| format_err(format!("bad first_day '{}'", file.first_day)))?;
    if file.horizon_days <= 0 {
        return Err(format_err("horizon_days must be positive"));
    }
    let horizon_days = file.horizon_days;
    let horizon_minutes = horizon_days * MINUTES_PER_DAY;

    let mut machines = BTreeMap::new();
    for row in &file.machines {
        let kind = machine_kind(&row.machine)?;
        if row.duration <= 0 {
            return Err(format_err(format!("machine {} has no duration", row.machine)));
        }
        let windows = parse_windows(&row.unavailability, origin, horizon_days)?;
        machines.insert(kind, MachineInfo { duration: row.duration, windows });
    }
    for kind in MachineKind::ALL {
        if !machines.contains_key(&kind) {
            return Err(format_err(format!("instance lacks machine {}", kind.label())));
        }
    }

    let mut yards = BTreeMap::new();
    for row in &file.yards {
        let kind = yard_kind(&row.yard)?;
        let windows = parse_windows(&row.unavailability, origin, horizon_days)?;
        yards.insert(kind, YardInfo { tracks: row.tracks, windows });
    }
    for kind in YardKind::ALL {
        if !yards.contains_key(&kind) {
            return Err(format_err(format!("instance lacks yard {}", kind.label())));
        }
    }

    let arrivals = trains(&file.arrivals, Direction::Arrival, origin, horizon_minutes)?;
    let departures = trains(&file.departures, Direction::Departure, origin, horizon_minutes)?;

    let mut requires: BTreeMap<TrainId, Vec<TrainId>> = BTreeMap::new();
    for row in &file.correspondences {
        let arr = find_train(&arrivals, &row.arrival_number, &row.arrival_day, origin)?;
        let dep = find_train(&departures, &row.departure_number, &row.departure_day, origin)?;
        requires.entry(dep).or_default().push(arr);
    }

    let mut arr_tasks = Vec::new();
    let mut dep_tasks = Vec::new();
    for row in &file.tasks {
        let def = TaskDef {
            order: row.order,
            duration: row.duration,
            yard: yard_kind(&row.yard)?,
            label: row.label.clone(),
        };
        match row.direction.as_str() {
            "ARR" => arr_tasks.push(def),
            "DEP" => dep_tasks.push(def),
            other => return Err(format_err(format!("unknown task direction '{}'", other))),
        }
    }
    arr_tasks.sort_by_key(|t| t.order);
    dep_tasks.sort_by_key(|t| t.order);

    let mut pools = BTreeMap::new();
    for row in &file.pools {
        let kind = pool_kind(&row.pool)?;
        let shifts = parse_windows(&row.shifts, origin, horizon_days)?
            .into_iter()
            .flat_map(|w| w.occurrences)
            .map(|(start, end)| Shift { start, end })
            .collect();
        pools.insert(kind, Pool { shifts, agents: row.agents });
    }

    // Every task must have at least one rostered shift able to take it,
    // otherwise the jalon 3 coverage rows have nothing to sum over.
    let sequences = [(Direction::Arrival, &arr_tasks), (Direction::Departure, &dep_tasks)];
    for (direction, seq) in sequences {
        for def in seq {
            let covered = eligible_pools(direction, def.order)
                .iter()
                .any(|p| pools.get(p).is_some_and(|pool| !pool.shifts.is_empty()));
            if !covered {
                return Err(format_err(format!(
                    "no rostered shift can take {} task {} ({})",
                    direction.label(),
                    def.order,
                    def.label
                )));
            }
        }
    }

    Ok(Problem {
        origin,
        horizon_minutes,
        machines,
        yards,
        arrivals,
        departures,
        requires,
        arr_tasks,
        dep_tasks,
        pools,
    })
}

fn trains(
    rows: &[TrainRow],
    direction: Direction,
    origin: chrono::NaiveDate,
    horizon_minutes: i32,
) -> Result<Vec<TrainId>, ParseError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let date = parse_date(&row.day)
            .ok_or_else(|| format_err(format!("bad day '{}' for train {}", row.day, row.number)))?;
        let time = parse_hm(&row.time)
            .ok_or_else(|| format_err(format!("bad time '{}' for train {}", row.time, row.number)))?;
        let minute = event_minute(date, time, origin);
        if minute < 0 || minute >= horizon_minutes {
            return Err(format_err(format!(
                "train {} at {} {} falls outside the horizon",
                row.number, row.day, row.time
            )));
        }
        out.push(TrainId { direction, number: row.number.clone(), minute });
    }
    out.sort();
    Ok(out)
}

fn find_train(
    trains: &[TrainId],
    number: &str,
    day: &str,
    origin: chrono::NaiveDate,
) -> Result<TrainId, ParseError> {
    let date =
        parse_date(day).ok_or_else(|| format_err(format!("bad correspondence day '{}'", day)))?;
    let day_start = (date - origin).num_days() as i32 * MINUTES_PER_DAY;
    trains
        .iter()
        .find(|t| t.number == number && t.minute >= day_start && t.minute < day_start + MINUTES_PER_DAY)
        .cloned()
        .ok_or_else(|| format_err(format!("correspondence names unknown train {} on {}", number, day)))
}

/// Parse `"(weekday,HH:MM-HH:MM);..."` into expanded windows. Empty input
/// means always available.
fn parse_windows(
    notation: &str,
    origin: chrono::NaiveDate,
    horizon_days: i32,
) -> Result<Vec<Window>, ParseError> {
    let mut out = Vec::new();
    for part in notation.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let inner = part
            .strip_prefix('(')
            .and_then(|p| p.strip_suffix(')'))
            .ok_or_else(|| format_err(format!("bad window '{}'", part)))?;
        let (day_str, span) = inner
            .split_once(',')
            .ok_or_else(|| format_err(format!("bad window '{}'", part)))?;
        let weekday: u32 = day_str
            .trim()
            .parse()
            .map_err(|_| format_err(format!("bad weekday in '{}'", part)))?;
        if !(1..=7).contains(&weekday) {
            return Err(format_err(format!("weekday out of range in '{}'", part)));
        }
        let (start_str, end_str) = span
            .split_once('-')
            .ok_or_else(|| format_err(format!("bad window '{}'", part)))?;
        let start = parse_hm(start_str)
            .ok_or_else(|| format_err(format!("bad start time in '{}'", part)))?;
        let end =
            parse_hm(end_str).ok_or_else(|| format_err(format!("bad end time in '{}'", part)))?;
        if end <= start {
            return Err(format_err(format!("window '{}' ends before it starts", part)));
        }
        let occurrences = weekly_window(weekday, start, end, origin, horizon_days);
        if !occurrences.is_empty() {
            out.push(Window { occurrences });
        }
    }
    Ok(out)
}

fn machine_kind(label: &str) -> Result<MachineKind, ParseError> {
    MachineKind::ALL
        .iter()
        .find(|k| k.label() == label)
        .copied()
        .ok_or_else(|| format_err(format!("unknown machine '{}'", label)))
}

fn yard_kind(label: &str) -> Result<YardKind, ParseError> {
    YardKind::ALL
        .iter()
        .find(|k| k.label() == label)
        .copied()
        .ok_or_else(|| format_err(format!("unknown yard '{}'", label)))
}

fn pool_kind(label: &str) -> Result<PoolKind, ParseError> {
    PoolKind::ALL
        .iter()
        .find(|k| k.label() == label)
        .copied()
        .ok_or_else(|| format_err(format!("unknown pool '{}'", label)))
}
