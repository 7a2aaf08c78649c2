/// The cast generation pipeline: templates → seeded characters → cross-cast
/// search → families → finalized, described cast.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::biography::{request_biography, Biography, BiographyRequest, BiographyWriter};
use crate::core::config::{ConfigError, GeneratorConfig};
use crate::core::family::{derive_kinship, group_families};
use crate::core::graph::CastGraph;
use crate::core::narrative::{describe_character, Persona};
use crate::core::pools::{draw_age, draw_gender, NamePools, Registry};
use crate::core::random::{RandomSource, SeededRandom};
use crate::core::resolver::{instantiate, resolve};
use crate::core::search::{candidates_for, fill_open_roles, fill_situation};
use crate::schema::character::{CharacterId, Gender};
use crate::schema::template::{SituationTemplateId, TemplateError, TemplateLibrary};

const DEFAULT_LOCATION: &str = "Village";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
    #[error("template library has no situations")]
    NoTemplates,
}

/// One finalized character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: CharacterId,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub occupation: String,
    pub location: String,
    pub family_id: usize,
    /// Situation name for each role played, parallel to `roles`.
    pub situations: Vec<String>,
    pub roles: Vec<String>,
    pub relations: Vec<String>,
    pub personality_traits: Vec<String>,
    pub biography: Option<Biography>,
}

impl CastMember {
    pub fn biography_request(&self) -> BiographyRequest {
        BiographyRequest {
            name: self.name.clone(),
            age: self.age,
            gender: self.gender.label().to_string(),
            occupation: self.occupation.clone(),
            location: self.location.clone(),
            situations: self.situations.clone(),
            roles: self.roles.clone(),
            relations: self.relations.clone(),
            personality_traits: self.personality_traits.clone(),
        }
    }
}

/// The finished roster handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cast {
    pub members: Vec<CastMember>,
    pub family_count: usize,
    pub phantom_roles: usize,
    /// The relation graph the roster was derived from.
    #[serde(skip)]
    pub graph: CastGraph,
}

impl Cast {
    pub fn to_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_ron(&self) -> Result<String, GeneratorError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Ask `writer` for a biography of every member, in roster order.
    /// Failures are logged and leave that member without one. Returns the
    /// number of biographies attached.
    pub fn attach_biographies<W: BiographyWriter>(&mut self, writer: &mut W) -> usize {
        let mut attached = 0;
        for member in &mut self.members {
            match request_biography(writer, &member.biography_request()) {
                Ok(biography) => {
                    member.biography = Some(biography);
                    attached += 1;
                }
                Err(e) => warn!(name = %member.name, error = %e, "biography skipped"),
            }
        }
        info!(attached, total = self.members.len(), "biographies attached");
        attached
    }
}

/// Generates casts from a template library. Built via `CastGenerator::builder()`.
#[derive(Debug, Clone)]
pub struct CastGenerator {
    library: TemplateLibrary,
    pools: NamePools,
    config: GeneratorConfig,
}

/// Builder for constructing a `CastGenerator`.
pub struct CastGeneratorBuilder {
    templates_path: Option<String>,
    pools_dir: Option<String>,
    config_path: Option<String>,
    seed: Option<u64>,
    character_count: Option<usize>,
    /// Directly provided library (for testing without files).
    library: Option<TemplateLibrary>,
    /// Directly provided pools (for testing without files).
    pools: Option<NamePools>,
    /// Directly provided config (for testing without files).
    config: Option<GeneratorConfig>,
}

impl CastGenerator {
    pub fn builder() -> CastGeneratorBuilder {
        CastGeneratorBuilder {
            templates_path: None,
            pools_dir: None,
            config_path: None,
            seed: None,
            character_count: None,
            library: None,
            pools: None,
            config: None,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn pools(&self) -> &NamePools {
        &self.pools
    }

    /// Generate a cast from the configured seed.
    pub fn generate(&self) -> Cast {
        let mut rng = SeededRandom::new(self.config.seed);
        self.generate_with(&mut rng)
    }

    /// Generate a cast drawing every random choice from `rng`.
    pub fn generate_with<R: RandomSource>(&self, rng: &mut R) -> Cast {
        let mut graph = CastGraph::new();

        // 1. Seed each character into a fresh situation
        for n in 0..self.config.character_count {
            if self.seed_character(&mut graph, rng).is_none() {
                warn!(
                    character = n,
                    attempts = self.config.max_situation_attempts,
                    "no situation could seed this character"
                );
            }
        }
        info!(
            characters = graph.characters.len(),
            situations = graph.situations.len(),
            "characters seeded"
        );

        // 2. Cross-cast the remaining living roles, owner by owner
        let seeded = graph.clone();
        let mut cross_cast = 0;
        for index in 0..graph.situations.len() {
            let situation = graph.situations[index].id;
            if graph.unassigned_living_roles(situation).is_empty() {
                continue;
            }
            match fill_situation(&mut graph, situation, rng, self.config.search_node_budget) {
                Ok(plan) => cross_cast += plan.assignments.len(),
                Err(e) => warn!(situation = situation.0, error = %e, "open roles left as phantoms"),
            }
        }
        // Owner-by-owner filling can strand a role whose only free character
        // is its own owner. Retry every open role together from the seeded
        // graph and keep whichever leaves fewer living roles open.
        let left_open = graph.open_living_roles();
        if left_open.iter().any(|role| !candidates_for(&seeded, *role).is_empty()) {
            let mut retry = seeded;
            match fill_open_roles(&mut retry, rng, self.config.repair_node_budget) {
                Ok(plan) if retry.open_living_roles().len() < left_open.len() => {
                    info!(
                        before = left_open.len(),
                        after = retry.open_living_roles().len(),
                        "global cross-casting filled stranded roles"
                    );
                    cross_cast = plan.assignments.len();
                    graph = retry;
                }
                Ok(_) => debug!(open = left_open.len(), "global cross-casting did no better"),
                Err(e) => warn!(error = %e, "global cross-casting failed"),
            }
        }
        let phantom_roles = graph.phantom_roles().count();
        info!(cross_cast, phantom_roles, "cross-casting finished");

        // 3. Families and derived kinship
        let family_count = group_families(&mut graph);
        let derived = derive_kinship(&graph);

        // 4. Concrete attributes
        let members = self.finalize(&graph, family_count, rng);

        // 5. Relation text
        let personas: Vec<Persona> = members
            .iter()
            .map(|m| Persona {
                name: &m.name,
                gender: m.gender,
            })
            .collect();
        let relations: Vec<Vec<String>> = members
            .iter()
            .map(|m| describe_character(&graph, &personas, m.id, &derived))
            .collect();
        let mut members = members;
        for (member, lines) in members.iter_mut().zip(relations) {
            member.relations = lines;
        }

        Cast {
            members,
            family_count,
            phantom_roles,
            graph,
        }
    }

    /// Try up to `max_situation_attempts` situations for one new character.
    /// The situation and character are only kept if the primary assignment
    /// succeeds.
    fn seed_character<R: RandomSource>(
        &self,
        graph: &mut CastGraph,
        rng: &mut R,
    ) -> Option<CharacterId> {
        for _ in 0..self.config.max_situation_attempts {
            let template = SituationTemplateId(rng.range(self.library.situations.len()));
            let resolved = match resolve(&self.library, template, rng) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(error = %e, "situation skipped");
                    continue;
                }
            };
            if resolved.iter().all(|r| self.library.role(*r).is_dead()) {
                warn!(situation = %self.library.situation(template).id, "situation has no living role");
                continue;
            }

            let mut scratch = graph.clone();
            let situation = instantiate(&mut scratch, &self.library, template, &resolved);
            let character = scratch.add_character(self.config.default_age);
            let living = scratch.unassigned_living_roles(situation);
            let Some(&role) = rng.pick(&living) else {
                continue;
            };
            match scratch.try_assign_role(character, role) {
                Ok(_) => {
                    scratch.set_owner(situation, character);
                    *graph = scratch;
                    return Some(character);
                }
                Err(e) => warn!(error = %e, "primary role rejected"),
            }
        }
        None
    }

    fn finalize<R: RandomSource>(
        &self,
        graph: &CastGraph,
        family_count: usize,
        rng: &mut R,
    ) -> Vec<CastMember> {
        let mut registry = Registry::new(&self.pools);
        let mut surnames: Vec<Option<String>> = vec![None; family_count];
        let mut members = Vec::with_capacity(graph.characters.len());

        for character in &graph.characters {
            let family_id = character.family_id.unwrap_or(0);
            let gender = draw_gender(character.genders, rng);
            let surname = match surnames.get_mut(family_id) {
                Some(slot) => slot.get_or_insert_with(|| registry.surname(rng)).clone(),
                None => registry.surname(rng),
            };
            let name = registry.full_name(gender, &surname, rng);
            let age = draw_age(character.ages, rng);
            let occupation = registry.occupation(rng);
            let location = rng
                .pick(&self.config.locations)
                .cloned()
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
            let personality_traits = registry.traits(self.config.traits_per_character, rng);

            let (situations, roles): (Vec<String>, Vec<String>) = character
                .assigned_roles
                .iter()
                .map(|r| {
                    let role = graph.role(*r);
                    let situation = graph.situation(role.situation);
                    (
                        self.library.situation(situation.template).name.clone(),
                        self.library.role(role.template).name.clone(),
                    )
                })
                .unzip();

            members.push(CastMember {
                id: character.id,
                name,
                age,
                gender,
                occupation,
                location,
                family_id,
                situations,
                roles,
                relations: Vec::new(),
                personality_traits,
                biography: None,
            });
        }
        members
    }
}

impl CastGeneratorBuilder {
    pub fn templates_file(mut self, path: &str) -> Self {
        self.templates_path = Some(path.to_string());
        self
    }

    pub fn pools_dir(mut self, path: &str) -> Self {
        self.pools_dir = Some(path.to_string());
        self
    }

    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn character_count(mut self, count: usize) -> Self {
        self.character_count = Some(count);
        self
    }

    /// Provide a template library directly (for testing without files).
    pub fn with_library(mut self, library: TemplateLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Provide name pools directly (for testing without files).
    pub fn with_pools(mut self, pools: NamePools) -> Self {
        self.pools = Some(pools);
        self
    }

    /// Provide a config directly (for testing without files).
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<CastGenerator, GeneratorError> {
        let mut library = self.library.unwrap_or_default();
        if let Some(ref path) = self.templates_path {
            library.merge(TemplateLibrary::load_from_ron(Path::new(path))?);
        }
        if library.situations.is_empty() {
            return Err(GeneratorError::NoTemplates);
        }

        let pools = match (self.pools, self.pools_dir) {
            (Some(pools), _) => pools,
            (None, Some(dir)) => NamePools::load_from_dir(Path::new(&dir))?,
            (None, None) => NamePools::default(),
        };

        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => GeneratorConfig::load_from_ron(Path::new(&path))?,
            (None, None) => GeneratorConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(count) = self.character_count {
            config.character_count = count;
        }

        info!(
            situations = library.situations.len(),
            roles = library.roles.len(),
            "cast generator ready"
        );
        Ok(CastGenerator {
            library,
            pools,
            config,
        })
    }
}
