pub mod biography;
pub mod config;
pub mod family;
pub mod graph;
pub mod kinship;
pub mod narrative;
pub mod pipeline;
pub mod pools;
pub mod random;
pub mod resolver;
pub mod search;
