//! WASM bindings for cast-engine — powers the interactive web demo.

use wasm_bindgen::prelude::*;

use cast_engine::core::pipeline::{Cast, CastGenerator};
use cast_engine::core::random::SeededRandom;
use cast_engine::schema::template::TemplateLibrary;

// ---------------------------------------------------------------------------
// Embedded template data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const POLTI_TEMPLATES: &str = include_str!("../../template_data/polti.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct SituationInfo {
    id: String,
    name: String,
    category: String,
    roles: Vec<String>,
}

#[derive(serde::Serialize)]
struct PhantomInfo {
    role: String,
    situation: String,
    dead: bool,
}

fn build_generator(templates_ron: &str, seed: u64) -> Result<CastGenerator, JsError> {
    let library = TemplateLibrary::parse_ron(templates_ron)
        .map_err(|e| JsError::new(&format!("Template parse error: {e}")))?;
    CastGenerator::builder()
        .with_library(library)
        .seed(seed)
        .build()
        .map_err(|e| JsError::new(&format!("Generator build error: {e}")))
}

fn cast_json(cast: &Cast) -> Result<String, JsError> {
    cast.to_json()
        .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// Generate a cast from a caller-supplied template library and return it
/// as JSON.
#[wasm_bindgen]
pub fn generate_cast(templates_ron: &str, count: usize, seed: u64) -> Result<String, JsError> {
    let generator = build_generator(templates_ron, seed)?;
    let mut demo = CastDemo {
        generator,
        cast: None,
        seed,
    };
    demo.generate(count)
}

/// Generate a cast from the bundled Polti templates.
#[wasm_bindgen]
pub fn sample_cast(count: usize, seed: u64) -> Result<String, JsError> {
    generate_cast(data::POLTI_TEMPLATES, count, seed)
}

// ---------------------------------------------------------------------------
// Stateful demo object
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct CastDemo {
    generator: CastGenerator,
    cast: Option<Cast>,
    seed: u64,
}

#[wasm_bindgen]
impl CastDemo {
    /// Create a demo over the bundled templates.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<CastDemo, JsError> {
        Ok(CastDemo {
            generator: build_generator(data::POLTI_TEMPLATES, seed)?,
            cast: None,
            seed,
        })
    }

    /// Create a demo over a template library given as RON text.
    pub fn with_templates(templates_ron: &str, seed: u64) -> Result<CastDemo, JsError> {
        Ok(CastDemo {
            generator: build_generator(templates_ron, seed)?,
            cast: None,
            seed,
        })
    }

    /// Generate a fresh cast of `count` characters and return it as JSON.
    pub fn generate(&mut self, count: usize) -> Result<String, JsError> {
        let mut config = self.generator.config().clone();
        config.character_count = count;
        let sized = CastGenerator::builder()
            .with_library(self.generator.library().clone())
            .with_pools(self.generator.pools().clone())
            .with_config(config)
            .build()
            .map_err(|e| JsError::new(&format!("Generator build error: {e}")))?;
        let cast = sized.generate_with(&mut SeededRandom::new(self.seed));
        let json = cast_json(&cast)?;
        self.cast = Some(cast);
        Ok(json)
    }

    /// Return one member of the current cast as JSON.
    pub fn member(&self, index: usize) -> Result<String, JsError> {
        let cast = self
            .cast
            .as_ref()
            .ok_or_else(|| JsError::new("No cast generated yet"))?;
        let member = cast
            .members
            .get(index)
            .ok_or_else(|| JsError::new(&format!("No member at index {index}")))?;
        serde_json::to_string(member)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Return JSON array of the roles in the current cast nobody plays.
    pub fn phantoms(&self) -> String {
        let Some(ref cast) = self.cast else {
            return "[]".to_string();
        };
        let library = self.generator.library();
        let phantoms: Vec<PhantomInfo> = cast
            .graph
            .phantom_roles()
            .map(|role| PhantomInfo {
                role: library.role(role.template).name.clone(),
                situation: library
                    .situation(cast.graph.situation(role.situation).template)
                    .name
                    .clone(),
                dead: role.is_dead(),
            })
            .collect();
        serde_json::to_string(&phantoms).unwrap_or_else(|_| "[]".to_string())
    }

    /// Return JSON array describing every loaded situation template.
    pub fn situations(&self) -> String {
        let library = self.generator.library();
        let infos: Vec<SituationInfo> = library
            .situations
            .iter()
            .map(|s| SituationInfo {
                id: s.id.clone(),
                name: s.name.clone(),
                category: s.category.clone(),
                roles: s
                    .root
                    .as_ref()
                    .map(|root| {
                        root.referenced_roles()
                            .into_iter()
                            .map(|r| library.role(r).name.clone())
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();
        serde_json::to_string(&infos).unwrap_or_else(|_| "[]".to_string())
    }

    /// Change the seed used by the next `generate` call.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.cast = None;
    }
}
