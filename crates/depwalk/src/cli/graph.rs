//! `depwalk graph` command implementation.

use colored::Colorize;
use serde_json::json;

use super::Request;
use super::display::{kind_label, print_names, print_problem};

/// Run the graph command.
pub fn run(request: &Request<'_>, as_json: bool) -> Result<(), depwalk::Error> {
    let graph = request.build()?;

    if as_json {
        let containers: Vec<_> = graph
            .containers()
            .map(|c| {
                json!({
                    "path": c.path(),
                    "name": graph.relative_name(c.path()),
                    "kind": c.kind(),
                    "package": c.package(),
                })
            })
            .collect();
        let problems: Vec<_> = graph
            .problems()
            .iter()
            .map(|p| {
                json!({
                    "code": p.code.as_str(),
                    "message": p.message,
                    "source_path": p.source_path,
                    "location": p.location,
                })
            })
            .collect();
        let document = json!({
            "root": graph.root(),
            "containers": containers,
            "edges": graph.edges(),
            "whitelisted": graph.whitelisted_names(),
            "problems": problems,
        });
        let rendered = serde_json::to_string_pretty(&document)
            .map_err(|e| depwalk::Error::Config(format!("JSON error: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", "Dependency graph".cyan().bold());
    println!();
    for (depth, container) in graph.walk() {
        println!(
            "  {}{} {}",
            "  ".repeat(depth),
            graph.relative_name(container.path()),
            kind_label(container.kind())
        );
    }
    println!();

    println!("  {}:", "Whitelisted modules".white().bold());
    print_names(
        graph.whitelisted_names().iter().map(String::as_str),
        "none",
    );
    println!();

    println!(
        "  {} containers, {} edges, {} problems",
        graph.len().to_string().green(),
        graph.edges().len().to_string().green(),
        if graph.is_problem_free() {
            "0".green()
        } else {
            graph.problems().len().to_string().red()
        }
    );
    for problem in graph.problems() {
        print_problem(&graph, problem);
    }

    Ok(())
}
