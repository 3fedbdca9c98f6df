//! Objective per milestone: nothing for pure feasibility, then the
//! formation-yard peak, then the number of activated shifts.

use crate::encode::Milestone;
use crate::model::{LinExpr, Model};
use crate::problem::YardKind;
use crate::vars::VarModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Feasibility,
    MinPeakFormation,
    MinShiftsUsed,
}

impl Objective {
    pub fn for_milestone(milestone: Milestone) -> Objective {
        match milestone {
            Milestone::Jalon1 => Objective::Feasibility,
            Milestone::Jalon2 => Objective::MinPeakFormation,
            Milestone::Jalon3 => Objective::MinShiftsUsed,
        }
    }
}

pub fn set(model: &mut Model, vars: &VarModel, milestone: Milestone) {
    let expr = match Objective::for_milestone(milestone) {
        Objective::Feasibility => LinExpr::default(),
        Objective::MinPeakFormation => vars.yard_peak[&YardKind::Formation].into(),
        Objective::MinShiftsUsed => {
            let total = vars
                .total_shifts
                .unwrap_or_else(|| panic!("shift variables not declared"));
            total.into()
        }
    };
    model.set_objective(expr);
}
