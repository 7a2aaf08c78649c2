/// Template Linter — validates situation template libraries.
///
/// Usage: template_linter <templates_path>
///
/// `templates_path` may be a single RON file or a directory searched
/// recursively for `.ron` files.

use cast_engine::schema::relation::RelationKind;
use cast_engine::schema::template::{ExpressionNode, RoleTemplateId, TemplateLibrary};
use std::collections::HashSet;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: template_linter <templates_path>");
        process::exit(0);
    }

    let templates_dir = &args[1];
    let mut library = TemplateLibrary::new();
    let templates_path = Path::new(templates_dir);

    if templates_path.is_file() {
        match TemplateLibrary::load_from_ron(templates_path) {
            Ok(lib) => library.merge(lib),
            Err(e) => {
                eprintln!("ERROR: Failed to load template file: {}", e);
                process::exit(1);
            }
        }
    } else if templates_path.is_dir() {
        load_templates_recursive(templates_path, &mut library);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", templates_dir);
        process::exit(1);
    }

    println!(
        "Loaded {} situations, {} roles",
        library.situations.len(),
        library.roles.len()
    );

    let (errors, warnings) = lint_templates(&library);

    println!("\n=== Template Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_templates_recursive(dir: &Path, library: &mut TemplateLibrary) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_templates_recursive(&path, library);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match TemplateLibrary::load_from_ron(&path) {
                    Ok(lib) => {
                        println!("  Loaded: {}", path.display());
                        library.merge(lib);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

/// True when every branch of an Or node is empty, so the node can never
/// contribute a role.
fn has_dead_or(node: &ExpressionNode) -> bool {
    match node {
        ExpressionNode::Role(_) => false,
        ExpressionNode::And(children) => children.iter().flatten().any(has_dead_or),
        ExpressionNode::Or(children) => {
            children.iter().all(|c| c.is_none()) || children.iter().flatten().any(has_dead_or)
        }
    }
}

fn lint_templates(library: &TemplateLibrary) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut referenced: HashSet<RoleTemplateId> = HashSet::new();

    let mut seen_ids = HashSet::new();
    for situation in &library.situations {
        if !seen_ids.insert(situation.id.as_str()) {
            warnings.push(format!("Situation id '{}' appears more than once", situation.id));
        }

        let Some(root) = situation.root.as_ref() else {
            errors.push(format!("Situation '{}' has no root expression", situation.id));
            continue;
        };

        if has_dead_or(root) {
            errors.push(format!(
                "Situation '{}' has an Or node whose branches are all empty",
                situation.id
            ));
        }

        let roles = root.referenced_roles();
        referenced.extend(roles.iter().copied());

        if roles.iter().all(|r| library.role(*r).is_dead()) {
            errors.push(format!(
                "Situation '{}' has no living role and can never seed a character",
                situation.id
            ));
        }

        // Relations pointing outside the situation are silently dropped at
        // instantiation; flag targets no branch can ever provide.
        for role_id in &roles {
            let role = library.role(*role_id);
            for rel in &role.relations {
                if !roles.contains(&rel.target) {
                    warnings.push(format!(
                        "Role '{}' relates to '{}', which situation '{}' never includes",
                        role.name,
                        library.role(rel.target).name,
                        situation.id
                    ));
                }
                if rel.target == *role_id {
                    errors.push(format!("Role '{}' relates to itself", role.name));
                }
            }
        }
    }

    for (index, role) in library.roles.iter().enumerate() {
        if !referenced.contains(&RoleTemplateId(index)) {
            warnings.push(format!("Role '{}' is not used by any situation", role.name));
        }
        if role.constraints.ages.is_empty() {
            errors.push(format!(
                "Role '{}' has an empty age range {}..={}",
                role.name, role.constraints.ages.min, role.constraints.ages.max
            ));
        }
        if role.constraints.genders.is_empty() {
            errors.push(format!("Role '{}' allows no gender", role.name));
        }
        let exclusive = role
            .relations
            .iter()
            .filter(|r| r.kind.is_exclusive())
            .map(|r| r.kind)
            .collect::<Vec<RelationKind>>();
        for (i, kind) in exclusive.iter().enumerate() {
            if exclusive[..i].contains(kind) {
                errors.push(format!(
                    "Role '{}' holds the exclusive relation {:?} more than once",
                    role.name, kind
                ));
            }
        }
    }

    (errors, warnings)
}
