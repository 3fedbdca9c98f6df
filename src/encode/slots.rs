//! Quarter-hour grid: every start equals 15 times a fresh slot-index
//! variable, so the solver can only place work on :00/:15/:30/:45.

use crate::model::{LinExpr, Model};
use crate::problem::Problem;
use crate::time::SLOT_MINUTES;
use crate::vars::VarModel;

pub fn encode(model: &mut Model, vars: &VarModel, problem: &Problem) {
    let slots = problem.horizon_slots();

    let pin = |model: &mut Model, name: String, start| {
        let index = model.add_int(format!("{}_slot", name), 0, slots);
        model.eq(name, start, LinExpr::term(index, SLOT_MINUTES as f64));
    };

    for ((train, op), &start) in &vars.op_start {
        pin(model, format!("grid_{}_{}", op.label(), train), start);
    }
    for ((train, order), &start) in &vars.task_start {
        pin(model, format!("grid_th_{}_{}", train, order), start);
    }
    log::debug!("grid constraints registered");
}
