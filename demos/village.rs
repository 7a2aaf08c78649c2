//! Generates a small village from the bundled Polti templates and prints
//! every villager with their relations.
//!
//! Run with: cargo run --example village -- [seed] [count]

use cast_engine::core::biography::{BiographyRequest, ProseError};
use cast_engine::core::config::GeneratorConfig;
use cast_engine::CastGenerator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);
    let count = args.next().and_then(|s| s.parse().ok()).unwrap_or(8);

    let templates = concat!(env!("CARGO_MANIFEST_DIR"), "/template_data/polti.ron");
    let generator = CastGenerator::builder()
        .templates_file(templates)
        .with_config(GeneratorConfig {
            locations: vec![
                "Millbrook".to_string(),
                "Crow's Ferry".to_string(),
                "Ashdown Mill".to_string(),
            ],
            ..GeneratorConfig::default()
        })
        .seed(seed)
        .character_count(count)
        .build()?;

    let mut cast = generator.generate();

    // Stand-in for a text generation service: one line built from the facts.
    let mut writer = |request: &BiographyRequest, _prompt: &str| {
        let role = request.roles.first().map(String::as_str).unwrap_or("bystander");
        let situation = request
            .situations
            .first()
            .map(String::as_str)
            .unwrap_or("village life");
        let bio = format!(
            "I am {}, the {} of {}, and I am the {} in a tale of {}.",
            request.name,
            request.occupation.to_lowercase(),
            request.location,
            role.to_lowercase(),
            situation.to_lowercase()
        );
        serde_json::to_string(&serde_json::json!({ "bio": bio }))
            .map_err(ProseError::from)
    };
    cast.attach_biographies(&mut writer);

    println!(
        "=== {} villagers, {} families, {} phantom roles ===\n",
        cast.members.len(),
        cast.family_count,
        cast.phantom_roles
    );
    for member in &cast.members {
        println!(
            "{} ({}, {}), {} in {}",
            member.name,
            member.age,
            member.gender.label(),
            member.occupation,
            member.location
        );
        if let Some(ref bio) = member.biography {
            println!("  \"{}\"", bio.bio);
        }
        for (role, situation) in member.roles.iter().zip(&member.situations) {
            println!("  - {} in {}", role, situation);
        }
        for line in &member.relations {
            println!("  * {}", line);
        }
        println!();
    }

    Ok(())
}
