pub mod ast;
pub mod config;
pub mod enumerator;
pub mod environment;
pub mod error;
pub mod graph;
pub mod parser;
pub mod postprocess;
pub mod schema;
pub mod sketches;
pub mod solver;
pub mod synthesizer;

pub use config::SynthesisConfig;
pub use error::{SynthesisFailure, SynthesisResult};
pub use graph::{ClassHierarchy, TypeCatalog};
pub use postprocess::RenderedBody;
pub use schema::Hole;
pub use sketches::SketchNode;
pub use solver::{BatchReport, Solver};
pub use synthesizer::Synthesizer;

/// Fill `hole` with Java code following `sketch`, looking types up in
/// `catalog`.
pub fn synthesize(
    catalog: &dyn TypeCatalog,
    sketch: &SketchNode,
    hole: &Hole,
    config: SynthesisConfig,
) -> SynthesisResult<RenderedBody> {
    Synthesizer::new(catalog, config).synthesize(sketch, hole)
}
