//! MILP encoding of the yard-scheduling problem, one constraint family per
//! submodule. `build` declares all shared variables first, then registers the
//! families a milestone needs, in a fixed order so two builds of the same
//! instance produce the same model row for row.

pub mod exclusion;
pub mod occupancy;
pub mod precedence;
pub mod shifts;
pub mod slots;
pub mod unavailability;

use crate::model::Model;
use crate::problem::Problem;
use crate::vars::VarModel;

/// Planning depth. Each milestone keeps everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Milestone {
    /// Machine scheduling only, feasibility.
    Jalon1,
    /// + quarter-hour grid, yard occupancy and capacity, min formation peak.
    Jalon2,
    /// + human tasks and shift assignment, min shifts used.
    Jalon3,
}

impl Milestone {
    pub fn label(&self) -> &'static str {
        match self {
            Milestone::Jalon1 => "jalon1",
            Milestone::Jalon2 => "jalon2",
            Milestone::Jalon3 => "jalon3",
        }
    }

    /// Margin added around windows and gaps in strict disjunctions. Starts
    /// are integer minutes throughout, so any value in (0, 1] separates them;
    /// 0.5 keeps jalon 1 rows away from rounding trouble, and with the grid
    /// active a full minute is safe and keeps the LP relaxation tighter.
    pub fn epsilon(&self) -> f64 {
        match self {
            Milestone::Jalon1 => 0.5,
            Milestone::Jalon2 | Milestone::Jalon3 => 1.0,
        }
    }
}

impl std::str::FromStr for Milestone {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "jalon1" => Ok(Milestone::Jalon1),
            "2" | "jalon2" => Ok(Milestone::Jalon2),
            "3" | "jalon3" => Ok(Milestone::Jalon3),
            other => Err(format!("unknown milestone '{}'", other)),
        }
    }
}

pub struct Encoding {
    pub model: Model,
    pub vars: VarModel,
}

pub fn build(problem: &Problem, milestone: Milestone) -> Encoding {
    let _p = hprof::enter("build model");
    let mut model = Model::new(format!("yardsched_{}", milestone.label()));
    let vars = VarModel::declare(&mut model, problem, milestone);

    slots::encode(&mut model, &vars, problem);
    unavailability::encode(&mut model, &vars, problem, milestone);
    exclusion::encode(&mut model, &vars, problem, milestone);
    precedence::encode(&mut model, &vars, problem, milestone);
    if milestone >= Milestone::Jalon2 {
        occupancy::encode(&mut model, &vars, problem);
    }
    if milestone >= Milestone::Jalon3 {
        shifts::encode(&mut model, &vars, problem);
    }
    crate::objective::set(&mut model, &vars, milestone);

    log::info!(
        "{}: {} vars, {} constraints",
        model.name,
        model.num_vars(),
        model.num_constrs()
    );
    Encoding { model, vars }
}
