use std::path::PathBuf;

use structopt::StructOpt;

use yardsched::config::Config;
use yardsched::encode::{self, Milestone};
use yardsched::schedule::{self, Schedule};
use yardsched::solve::{self, SolveOptions, SolveOutcome};
use yardsched::{parser, problem::Problem};

#[derive(Debug, StructOpt)]
#[structopt(name = "yardsched", about = "MILP scheduling of marshalling-yard operations")]
struct Opt {
    /// Instance JSON file.
    #[structopt(parse(from_os_str))]
    instance: PathBuf,

    /// Planning depth: 1 (machines), 2 (+yards), 3 (+crews).
    #[structopt(short, long, default_value = "1")]
    jalon: Milestone,

    /// Write the model in LP format to this path before solving.
    #[structopt(long, parse(from_os_str))]
    dump_lp: Option<PathBuf>,

    /// Directory for schedules and infeasibility artifacts.
    #[structopt(long, parse(from_os_str))]
    results: Option<PathBuf>,

    /// Solve budget, seconds.
    #[structopt(long)]
    time_limit: Option<f64>,

    /// Re-check the solved schedule against the yard rules.
    #[structopt(long)]
    verify: bool,
}

fn main() {
    pretty_env_logger::init();
    if let Err(e) = run(Opt::from_args()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let results_dir = opt.results.unwrap_or(config.results_dir);

    let problem = parser::load_problem(&opt.instance)?;
    log::info!(
        "{}: {} arrivals, {} departures, horizon {} days",
        opt.instance.display(),
        problem.arrivals.len(),
        problem.departures.len(),
        problem.horizon_minutes / (24 * 60)
    );

    let encoding = encode::build(&problem, opt.jalon);
    if let Some(path) = opt.dump_lp.or(config.dump_lp) {
        std::fs::write(&path, encoding.model.write_lp())?;
        log::info!("model dumped to {}", path.display());
    }

    let options = SolveOptions {
        time_limit: opt.time_limit.or(config.time_limit),
        ..SolveOptions::default()
    };
    match solve::solve(&encoding.model, &options)? {
        SolveOutcome::Optimal(assignment) => {
            let schedule = Schedule::from_assignment(&encoding.vars, &assignment);
            if opt.verify {
                check(&problem, &schedule)?;
            }
            let report = schedule::report(&problem, &schedule);
            std::fs::create_dir_all(&results_dir)?;
            let path = results_dir.join(format!("schedule_{}.json", opt.jalon.label()));
            std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
            log::info!("schedule written to {}", path.display());
        }
        SolveOutcome::Infeasible(iis) => {
            std::fs::create_dir_all(&results_dir)?;
            let path = results_dir.join("infeasible_core.txt");
            let rows: Vec<String> = encoding
                .model
                .constrs
                .iter()
                .filter(|c| iis.constraints.contains(&c.name))
                .map(|c| encoding.model.render_constr(c))
                .collect();
            std::fs::write(&path, rows.join("\n"))?;
            log::error!(
                "instance infeasible; {} conflicting constraints written to {}",
                iis.constraints.len(),
                path.display()
            );
            std::process::exit(1);
        }
    }

    hprof::profiler().print_timing();
    Ok(())
}

fn check(problem: &Problem, schedule: &Schedule) -> Result<(), Box<dyn std::error::Error>> {
    let violations = problem.verify_schedule(schedule);
    for v in &violations {
        log::error!("verification: {}", v);
    }
    if violations.is_empty() {
        log::info!("schedule verified");
        Ok(())
    } else {
        Err("schedule verification failed".into())
    }
}
