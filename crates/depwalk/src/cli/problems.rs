//! `depwalk problems` command implementation.

use colored::Colorize;

use super::Request;
use super::display::print_problem;

/// Run the problems command.
///
/// Returns whether the graph was problem-free.
pub fn run(request: &Request<'_>) -> Result<bool, depwalk::Error> {
    let graph = request.build()?;

    if graph.is_problem_free() {
        println!("{}", "No problems found.".green());
        return Ok(true);
    }

    println!(
        "Found {} problems:",
        graph.problems().len().to_string().red().bold()
    );
    println!();
    for problem in graph.problems() {
        print_problem(&graph, problem);
    }

    Ok(false)
}
