use std::env;
use std::fs;

use clap::{App, AppSettings, ArgGroup};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use anyhow::Error;

use buildsat::{Solver, SolverError, Verdict};
use buildsat_dimacs::{DimacsParser, EvalDirectives};

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_SAT: i32 = 10;
const EXIT_UNSAT: i32 = 20;
const EXIT_BUILDABLE: i32 = 30;
const EXIT_INCOMPLETE: i32 = 40;
const EXIT_INVALID: i32 = 50;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            EXIT_ERROR
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        use std::io::Write;
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("BUILDSAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is buildsat {}", env!("BUILDSAT_VERSION"));
    info!(
        "  {} build - {}",
        env!("BUILDSAT_PROFILE"),
        env!("BUILDSAT_RUSTC_VERSION")
    );
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("buildsat")
        .version(env!("BUILDSAT_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The DIMACS CNF file to read'")
        .arg_from_usage("--propagate 'Propagate the selection from the input and report the decided literals'")
        .arg_from_usage("--status 'Check whether the selection from the input is consistent'")
        .group(ArgGroup::with_name("mode").args(&["propagate", "status"]))
        .get_matches();

    init_logging();

    let path = match matches.value_of("INPUT") {
        Some(path) => path,
        None => {
            println!("{}", matches.usage());
            return Ok(EXIT_OK);
        }
    };

    banner();

    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(_) => {
            println!("c FILE NOT FOUND");
            return Ok(EXIT_ERROR);
        }
    };

    info!("Reading file '{}'", path);

    let mut parser = DimacsParser::parse_incremental(file, |_| Ok(()))?;
    let formula = parser.take_formula();
    let directives = parser.take_directives();

    let mut solver = Solver::new();
    if let Err(err) = solver.add_formula(&formula) {
        return Ok(report_solver_error(err));
    }

    if solver.is_known_unsat() {
        // The input is unsatisfiable on its own. In status mode no selection can be valid
        // against it; the other modes report the unsatisfiability itself.
        if matches.is_present("status") {
            return Ok(report_verdict(Verdict::Invalid));
        }
        println!("s UNSATISFIABLE");
        return Ok(EXIT_UNSAT);
    }

    if matches.is_present("propagate") {
        run_propagate(&mut solver, &directives)
    } else if matches.is_present("status") {
        run_status(&mut solver, &directives)
    } else {
        run_solve(&mut solver)
    }
}

fn run_solve(solver: &mut Solver) -> Result<i32, Error> {
    match solver.solve() {
        Ok(true) => {
            println!("s SATISFIABLE");
            Ok(EXIT_SAT)
        }
        Ok(false) => {
            println!("s UNSATISFIABLE");
            Ok(EXIT_UNSAT)
        }
        Err(err) => Ok(report_solver_error(err)),
    }
}

fn run_propagate(solver: &mut Solver, directives: &EvalDirectives) -> Result<i32, Error> {
    let outcome =
        match solver.propagate_selection(&directives.dead_vars, &directives.assignment) {
            Ok(outcome) => outcome,
            Err(err) => return Ok(report_solver_error(err)),
        };

    print!("v");
    for lit in &outcome.decided {
        print!(" {}", lit);
    }
    println!();

    Ok(report_verdict(outcome.verdict))
}

fn run_status(solver: &mut Solver, directives: &EvalDirectives) -> Result<i32, Error> {
    let verdict = solver.check_selection(&directives.dead_vars, &directives.assignment);
    Ok(report_verdict(verdict))
}

fn report_verdict(verdict: Verdict) -> i32 {
    println!("s {}", verdict);
    match verdict {
        Verdict::Buildable => EXIT_BUILDABLE,
        Verdict::Incomplete => EXIT_INCOMPLETE,
        Verdict::Invalid => EXIT_INVALID,
    }
}

fn report_solver_error(err: SolverError) -> i32 {
    match err {
        SolverError::OutOfMemory => {
            println!("c OUT OF MEMORY");
            EXIT_ERROR
        }
    }
}
