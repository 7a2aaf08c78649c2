/// Preview — interactive shell for generating and inspecting casts.
///
/// Usage: preview --templates <path> [--pools <dir>] [--config <path>] [--count <n>] [--seed <n>]
///
/// Commands:
///   generate [n]   — generate a cast of n characters (default: configured count)
///   show <i>       — print one member in full
///   phantoms       — list roles nobody could play
///   json | ron     — dump the current cast
///   seed <n>       — set RNG seed
///   bulk <n>       — generate n casts and report averages
///   help           — list commands
///   quit           — exit

use cast_engine::core::pipeline::{Cast, CastGenerator};
use cast_engine::core::random::SeededRandom;
use std::io::{self, BufRead, Write};

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut templates_path = None;
    let mut pools_dir = None;
    let mut config_path = None;
    let mut count = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--templates" if i + 1 < args.len() => {
                i += 1;
                templates_path = Some(args[i].clone());
            }
            "--pools" if i + 1 < args.len() => {
                i += 1;
                pools_dir = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                count = args[i].parse().ok();
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(templates_path) = templates_path else {
        eprintln!("--templates is required");
        print_usage();
        std::process::exit(1);
    };

    let mut builder = CastGenerator::builder().templates_file(&templates_path).seed(seed);
    if let Some(ref dir) = pools_dir {
        builder = builder.pools_dir(dir);
    }
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    if let Some(n) = count {
        builder = builder.character_count(n);
    }
    let generator = match builder.build() {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} situations, {} roles",
        generator.library().situations.len(),
        generator.library().roles.len()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut current_seed = seed;
    let mut cast: Option<Cast> = None;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "generate" | "g" => {
                let n = match parts.get(1) {
                    Some(arg) => match arg.parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => {
                            println!("Usage: generate [n]");
                            continue;
                        }
                    },
                    None => generator.config().character_count,
                };
                let sized = generator_with_count(&generator, n);
                let generated = sized.generate_with(&mut SeededRandom::new(current_seed));
                print_cast(&generated);
                cast = Some(generated);
            }
            "show" => {
                let Some(ref current) = cast else {
                    println!("No cast yet. Use 'generate' first.");
                    continue;
                };
                match parts.get(1).and_then(|s| s.parse::<usize>().ok()) {
                    Some(index) if index < current.members.len() => {
                        print_member(current, index);
                    }
                    _ => println!("Usage: show <0..{}>", current.members.len()),
                }
            }
            "phantoms" => {
                let Some(ref current) = cast else {
                    println!("No cast yet. Use 'generate' first.");
                    continue;
                };
                let library = generator.library();
                for role in current.graph.phantom_roles() {
                    let situation = current.graph.situation(role.situation);
                    let owner = situation
                        .owner
                        .map(|c| current.members[c.0].name.as_str())
                        .unwrap_or("nobody");
                    println!(
                        "  {} in {} (owned by {}){}",
                        library.role(role.template).name,
                        library.situation(situation.template).name,
                        owner,
                        if role.is_dead() { " [dead]" } else { "" }
                    );
                }
            }
            "json" | "ron" => {
                let Some(ref current) = cast else {
                    println!("No cast yet. Use 'generate' first.");
                    continue;
                };
                let dumped = if cmd == "json" {
                    current.to_json()
                } else {
                    current.to_ron()
                };
                match dumped {
                    Ok(text) => println!("{}", text),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "seed" => {
                if parts.len() < 2 {
                    println!("Current seed: {}", current_seed);
                    continue;
                }
                match parts[1].parse::<u64>() {
                    Ok(s) => {
                        current_seed = s;
                        println!("Seed set to {}", s);
                    }
                    Err(_) => println!("Invalid seed: {}", parts[1]),
                }
            }
            "bulk" => {
                let Some(runs) = parts.get(1).and_then(|s| s.parse::<usize>().ok()) else {
                    println!("Usage: bulk <n>");
                    continue;
                };
                if runs == 0 {
                    println!("Nothing to do.");
                    continue;
                }
                let mut members = 0;
                let mut families = 0;
                let mut phantoms = 0;
                let mut roles = 0;
                for run in 0..runs {
                    let c = generator.generate_with(&mut SeededRandom::new(bulk_seed(current_seed, run)));
                    members += c.members.len();
                    families += c.family_count;
                    phantoms += c.phantom_roles;
                    roles += c.members.iter().map(|m| m.roles.len()).sum::<usize>();
                }
                let runs_f = runs as f64;
                println!("--- {} casts ---", runs);
                println!("  Members per cast:  {:.1}", members as f64 / runs_f);
                println!("  Families per cast: {:.1}", families as f64 / runs_f);
                println!("  Phantom roles:     {:.1}", phantoms as f64 / runs_f);
                if members > 0 {
                    println!("  Roles per member:  {:.2}", roles as f64 / members as f64);
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

/// Seed for the `run`th cast of a bulk batch; wraps past `u64::MAX`.
fn bulk_seed(base: u64, run: usize) -> u64 {
    base.wrapping_add(run as u64)
}

fn generator_with_count(generator: &CastGenerator, count: usize) -> CastGenerator {
    let mut config = generator.config().clone();
    config.character_count = count;
    match CastGenerator::builder()
        .with_library(generator.library().clone())
        .with_pools(generator.pools().clone())
        .with_config(config)
        .build()
    {
        Ok(sized) => sized,
        Err(_) => generator.clone(),
    }
}

fn print_cast(cast: &Cast) {
    println!(
        "{} characters, {} families, {} phantom roles\n",
        cast.members.len(),
        cast.family_count,
        cast.phantom_roles
    );
    for (index, member) in cast.members.iter().enumerate() {
        println!(
            "[{}] {} ({}, {}), {}, family {}: {}",
            index,
            member.name,
            member.age,
            member.gender.label(),
            member.occupation,
            member.family_id,
            member.roles.join(", ")
        );
    }
}

fn print_member(cast: &Cast, index: usize) {
    let member = &cast.members[index];
    println!("{}", member.name);
    println!("  Age:        {}", member.age);
    println!("  Gender:     {}", member.gender.label());
    println!("  Occupation: {}", member.occupation);
    println!("  Location:   {}", member.location);
    println!("  Family:     {}", member.family_id);
    println!("  Traits:     {}", member.personality_traits.join(", "));
    println!("  Roles:");
    for (situation, role) in member.situations.iter().zip(&member.roles) {
        println!("    {} in {}", role, situation);
    }
    println!("  Relations:");
    for line in &member.relations {
        println!("    {}", line);
    }
}

fn print_usage() {
    println!("Usage: preview --templates <path> [--pools <dir>] [--config <path>] [--count <n>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  generate [n]   Generate a cast of n characters");
    println!("  show <i>       Print one member in full");
    println!("  phantoms       List roles nobody could play");
    println!("  json | ron     Dump the current cast");
    println!("  seed <n>       Set RNG seed");
    println!("  bulk <n>       Generate n casts and report averages");
    println!("  help           Show this help");
    println!("  quit           Exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_seeds_wrap_at_the_top() {
        assert_eq!(bulk_seed(7, 3), 10);
        assert_eq!(bulk_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(bulk_seed(u64::MAX, 1), 0);
        assert_eq!(bulk_seed(u64::MAX - 1, 5), 3);
    }
}
