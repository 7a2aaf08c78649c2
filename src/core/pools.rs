/// Name, surname, occupation and trait pools, plus the draws that turn a
/// constrained character into a concrete person.

use rustc_hash::FxHashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::random::RandomSource;
use crate::schema::character::{AgeRange, Gender, GenderSet};

const UNIQUE_ATTEMPTS: usize = 50;
const FALLBACK_WORD: &str = "Unknown";

/// Weighted age bands as (cumulative weight in percent, first age, last age).
const AGE_BANDS: [(u32, u32, u32); 5] = [
    (15, 18, 25),
    (35, 26, 35),
    (70, 36, 50),
    (90, 51, 65),
    (100, 66, 80),
];

const MALE_NAMES: &[&str] = &[
    "Aldric", "Bram", "Cedric", "Doran", "Edmund", "Fenwick", "Gareth", "Hollis", "Ivo",
    "Jasper", "Leoric", "Merrick", "Osric", "Percival", "Roland", "Tobias", "Wendel",
];
const FEMALE_NAMES: &[&str] = &[
    "Agatha", "Beatrix", "Clemence", "Delphine", "Edith", "Fenella", "Greta", "Hester",
    "Isolde", "Juniper", "Lavinia", "Mirabel", "Odile", "Rosalind", "Sybil", "Wilhelmina",
];
const SURNAMES: &[&str] = &[
    "Ashdown", "Blackwood", "Crane", "Dunmore", "Everly", "Fairweather", "Greaves", "Hollow",
    "Ironside", "Marsh", "Nettle", "Pike", "Quill", "Thorne", "Underhill", "Wick",
];
const OCCUPATIONS: &[&str] = &[
    "Baker", "Blacksmith", "Butcher", "Candlemaker", "Cooper", "Gravedigger", "Herbalist",
    "Innkeeper", "Miller", "Midwife", "Physician", "Priest", "Tanner", "Tax Collector",
    "Undertaker", "Weaver",
];
const TRAITS: &[&str] = &[
    "Ambitious", "Charming", "Cowardly", "Devout", "Envious", "Gluttonous", "Jovial",
    "Melancholic", "Meticulous", "Paranoid", "Proud", "Secretive", "Stubborn", "Vengeful",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Word lists that finalized characters are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePools {
    pub male_names: Vec<String>,
    pub female_names: Vec<String>,
    pub surnames: Vec<String>,
    pub occupations: Vec<String>,
    pub traits: Vec<String>,
}

impl Default for NamePools {
    fn default() -> Self {
        Self {
            male_names: owned(MALE_NAMES),
            female_names: owned(FEMALE_NAMES),
            surnames: owned(SURNAMES),
            occupations: owned(OCCUPATIONS),
            traits: owned(TRAITS),
        }
    }
}

/// Split a newline-separated list, trimming entries and dropping blanks.
pub fn parse_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl NamePools {
    /// Load `male_names.txt`, `female_names.txt`, `surnames.txt`,
    /// `occupations.txt` and `traits.txt` from `dir`. A missing or empty
    /// file keeps the built-in list for that pool.
    pub fn load_from_dir(dir: &Path) -> Result<NamePools, std::io::Error> {
        let mut pools = NamePools::default();
        let slots: [(&str, &mut Vec<String>); 5] = [
            ("male_names.txt", &mut pools.male_names),
            ("female_names.txt", &mut pools.female_names),
            ("surnames.txt", &mut pools.surnames),
            ("occupations.txt", &mut pools.occupations),
            ("traits.txt", &mut pools.traits),
        ];
        for (file, slot) in slots {
            let path = dir.join(file);
            if !path.exists() {
                debug!(file, "pool file missing, using defaults");
                continue;
            }
            let entries = parse_list(&std::fs::read_to_string(&path)?);
            if entries.is_empty() {
                warn!(file, "pool file is empty, using defaults");
            } else {
                *slot = entries;
            }
        }
        Ok(pools)
    }

    pub fn first_names(&self, gender: Gender) -> &[String] {
        match gender {
            Gender::Male => &self.male_names,
            Gender::Female => &self.female_names,
        }
    }
}

fn draw<R: RandomSource>(list: &[String], rng: &mut R) -> String {
    rng.pick(list)
        .cloned()
        .unwrap_or_else(|| FALLBACK_WORD.to_string())
}

/// Draw a gender uniformly from the allowed set. An empty set never reaches
/// finalization, but falls back to any gender.
pub fn draw_gender<R: RandomSource>(allowed: GenderSet, rng: &mut R) -> Gender {
    let options: Vec<Gender> = if allowed.is_empty() {
        Gender::ALL.to_vec()
    } else {
        allowed.iter().collect()
    };
    options[rng.range(options.len())]
}

/// Draw an age from the weighted bands; when the band lands outside
/// `range`, draw uniformly inside `range` instead.
pub fn draw_age<R: RandomSource>(range: AgeRange, rng: &mut R) -> u32 {
    let roll = rng.range(100) as u32;
    let (_, lo, hi) = AGE_BANDS
        .iter()
        .copied()
        .find(|(cumulative, _, _)| roll < *cumulative)
        .unwrap_or(AGE_BANDS[AGE_BANDS.len() - 1]);
    let age = lo + rng.range((hi - lo + 1) as usize) as u32;
    if range.contains(age) {
        age
    } else {
        range.min + rng.range((range.max - range.min + 1) as usize) as u32
    }
}

/// Hands out names and occupations without repeats within one cast.
#[derive(Debug)]
pub struct Registry<'p> {
    pools: &'p NamePools,
    used_names: FxHashSet<String>,
    used_occupations: FxHashSet<String>,
}

impl<'p> Registry<'p> {
    pub fn new(pools: &'p NamePools) -> Self {
        Self {
            pools,
            used_names: FxHashSet::default(),
            used_occupations: FxHashSet::default(),
        }
    }

    pub fn surname<R: RandomSource>(&self, rng: &mut R) -> String {
        draw(&self.pools.surnames, rng)
    }

    /// A full name not yet handed out, trying up to 50 first names before
    /// falling back to a numbered placeholder.
    pub fn full_name<R: RandomSource>(&mut self, gender: Gender, surname: &str, rng: &mut R) -> String {
        for _ in 0..UNIQUE_ATTEMPTS {
            let name = format!("{} {}", draw(self.pools.first_names(gender), rng), surname);
            if self.used_names.insert(name.clone()) {
                return name;
            }
        }
        let mut n = self.used_names.len();
        loop {
            let name = format!("Name{}", n);
            if self.used_names.insert(name.clone()) {
                warn!(%name, "name pool exhausted");
                return name;
            }
            n += 1;
        }
    }

    /// An occupation not yet handed out, or any occupation once 50 draws
    /// have all collided.
    pub fn occupation<R: RandomSource>(&mut self, rng: &mut R) -> String {
        for _ in 0..UNIQUE_ATTEMPTS {
            let occupation = draw(&self.pools.occupations, rng);
            if self.used_occupations.insert(occupation.clone()) {
                return occupation;
            }
        }
        draw(&self.pools.occupations, rng)
    }

    /// Up to `count` distinct personality traits.
    pub fn traits<R: RandomSource>(&self, count: usize, rng: &mut R) -> Vec<String> {
        let mut remaining = self.pools.traits.clone();
        let mut picked = Vec::with_capacity(count);
        while picked.len() < count && !remaining.is_empty() {
            picked.push(remaining.swap_remove(rng.range(remaining.len())));
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::{ScriptedRandom, SeededRandom};

    #[test]
    fn parse_list_trims_and_skips_blanks() {
        assert_eq!(parse_list("  Ada \r\n\nBram\n   \n"), vec!["Ada", "Bram"]);
    }

    #[test]
    fn age_bands_follow_the_roll() {
        let full = AgeRange::new(18, 81);
        assert_eq!(draw_age(full, &mut ScriptedRandom::new(&[0, 0])), 18);
        assert_eq!(draw_age(full, &mut ScriptedRandom::new(&[14, 7])), 25);
        assert_eq!(draw_age(full, &mut ScriptedRandom::new(&[15, 0])), 26);
        assert_eq!(draw_age(full, &mut ScriptedRandom::new(&[69, 3])), 39);
        assert_eq!(draw_age(full, &mut ScriptedRandom::new(&[99, 14])), 80);
    }

    #[test]
    fn age_outside_range_is_redrawn_inside() {
        let narrow = AgeRange::new(60, 62);
        // Band 18..=25 misses the range; the redraw picks offset 2.
        assert_eq!(draw_age(narrow, &mut ScriptedRandom::new(&[0, 0, 2])), 62);
        let mut rng = SeededRandom::new(5);
        for _ in 0..200 {
            assert!(narrow.contains(draw_age(narrow, &mut rng)));
        }
    }

    #[test]
    fn gender_comes_from_allowed_set() {
        let mut rng = SeededRandom::new(3);
        for _ in 0..50 {
            assert_eq!(draw_gender(GenderSet::only(Gender::Female), &mut rng), Gender::Female);
        }
        assert_eq!(draw_gender(GenderSet::any(), &mut ScriptedRandom::new(&[1])), Gender::Female);
    }

    #[test]
    fn names_are_unique_then_fall_back() {
        let pools = NamePools {
            male_names: vec!["Bram".into()],
            ..NamePools::default()
        };
        let mut registry = Registry::new(&pools);
        let mut rng = ScriptedRandom::zeros();
        assert_eq!(registry.full_name(Gender::Male, "Pike", &mut rng), "Bram Pike");
        assert_eq!(registry.full_name(Gender::Male, "Wick", &mut rng), "Bram Wick");
        let fallback = registry.full_name(Gender::Male, "Pike", &mut rng);
        assert!(fallback.starts_with("Name"));
        assert_ne!(registry.full_name(Gender::Male, "Pike", &mut rng), fallback);
    }

    #[test]
    fn occupations_repeat_only_when_exhausted() {
        let pools = NamePools {
            occupations: vec!["Baker".into(), "Miller".into()],
            ..NamePools::default()
        };
        let mut registry = Registry::new(&pools);
        let mut rng = SeededRandom::new(9);
        let a = registry.occupation(&mut rng);
        let b = registry.occupation(&mut rng);
        assert_ne!(a, b);
        let c = registry.occupation(&mut rng);
        assert!(c == "Baker" || c == "Miller");
    }

    #[test]
    fn traits_are_distinct() {
        let pools = NamePools::default();
        let registry = Registry::new(&pools);
        let traits = registry.traits(2, &mut SeededRandom::new(1));
        assert_eq!(traits.len(), 2);
        assert_ne!(traits[0], traits[1]);
        let empty = NamePools { traits: Vec::new(), ..NamePools::default() };
        assert!(Registry::new(&empty).traits(2, &mut SeededRandom::new(1)).is_empty());
    }

    #[test]
    fn empty_pools_yield_placeholder() {
        let pools = NamePools { surnames: Vec::new(), ..NamePools::default() };
        assert_eq!(Registry::new(&pools).surname(&mut ScriptedRandom::zeros()), "Unknown");
    }

    #[test]
    fn load_from_dir_overrides_present_files() {
        let dir = std::env::temp_dir().join(format!("cast_engine_pools_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("surnames.txt"), "Oakheart\nMossback\n").unwrap();
        std::fs::write(dir.join("traits.txt"), "\n\n").unwrap();

        let pools = NamePools::load_from_dir(&dir).unwrap();
        assert_eq!(pools.surnames, vec!["Oakheart", "Mossback"]);
        assert_eq!(pools.traits, NamePools::default().traits);
        assert_eq!(pools.male_names, NamePools::default().male_names);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
