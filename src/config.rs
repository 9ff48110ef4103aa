/// Search bounds and knobs for one synthesis run.
///
/// Every bound here is what guarantees termination; there is no timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// How many times a loop body is unrolled when deriving call sequences.
    pub loop_unroll: usize,
    /// Deepest argument nesting at which constructors and composition are tried.
    pub max_argument_depth: usize,
    /// Calls a composed chain may have beyond its first one.
    pub max_compose_length: usize,
    pub max_sequences: usize,
    pub max_sequence_length: usize,
    /// Shuffle equal-arity constructors and methods before trying them.
    pub randomize: bool,
    // None draws from entropy
    pub seed: Option<u64>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            loop_unroll: 2,
            max_argument_depth: 1,
            max_compose_length: 2,
            max_sequences: 1024,
            max_sequence_length: 64,
            randomize: true,
            seed: None,
        }
    }
}

impl SynthesisConfig {
    pub fn deterministic() -> Self {
        SynthesisConfig {
            randomize: false,
            seed: Some(0),
            ..Default::default()
        }
    }
}
