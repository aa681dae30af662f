//! `depwalk cycles` command implementation.

use colored::Colorize;

use super::Request;

/// Run the cycles command.
pub fn run(request: &Request<'_>) -> Result<(), depwalk::Error> {
    let graph = request.build()?;

    let cycles = graph.detect_cycles();

    if cycles.is_empty() {
        println!("{}", "No circular dependencies detected.".green());
        return Ok(());
    }

    println!(
        "Found {} circular dependencies:",
        cycles.len().to_string().red().bold()
    );
    println!();

    for (i, cycle) in cycles.iter().enumerate() {
        println!("  {} {}:", "Cycle".yellow().bold(), i + 1);

        // Display cycle as: a -> b -> c -> a
        let names: Vec<String> = cycle
            .paths
            .iter()
            .map(|p| graph.relative_name(p))
            .collect();
        let mut path_str = names.join(" → ");
        if let Some(first) = names.first() {
            path_str.push_str(" → ");
            path_str.push_str(first);
        }

        println!("    {}", path_str.dimmed());
    }

    Ok(())
}
