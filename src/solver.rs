use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::{
    config::SynthesisConfig,
    error::{SynthesisFailure, SynthesisResult},
    graph::TypeCatalog,
    parser::sketch_from_json,
    postprocess::RenderedBody,
    schema::Hole,
    sketches::SketchNode,
    synthesizer::Synthesizer,
};

/// Outcome of running every candidate sketch of a query against one hole.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Distinct rendered bodies, in candidate order.
    pub results: Vec<RenderedBody>,
    /// Index of the failed candidate and why it failed.
    pub failures: Vec<(usize, SynthesisFailure)>,
    /// Successful candidates dropped because an earlier one rendered the same.
    pub duplicates: usize,
}

impl BatchReport {
    pub fn failure_stats(&self) -> BTreeMap<&'static str, usize> {
        let mut stats = BTreeMap::new();
        for (_, failure) in &self.failures {
            *stats.entry(failure.kind()).or_insert(0) += 1;
        }
        stats
    }
}

/// Batch driver over many candidate sketches.
pub struct Solver<'a> {
    synthesizer: Synthesizer<'a>,
}

impl<'a> Solver<'a> {
    pub fn new(catalog: &'a dyn TypeCatalog, config: SynthesisConfig) -> Solver<'a> {
        Solver {
            synthesizer: Synthesizer::new(catalog, config),
        }
    }

    pub fn solve(&mut self, sketches: &[SketchNode], hole: &Hole) -> BatchReport {
        let attempts = sketches.iter().map(Ok).collect::<Vec<_>>();
        self.run(attempts, hole)
    }

    /// Like `solve`, for candidates still in JSON form. A candidate that does
    /// not parse counts as a failed candidate.
    pub fn solve_json(&mut self, candidates: &[Value], hole: &Hole) -> BatchReport {
        let parsed: Vec<SynthesisResult<SketchNode>> = candidates.iter().map(sketch_from_json).collect();
        let attempts = parsed
            .iter()
            .map(|p| p.as_ref().map_err(Clone::clone))
            .collect::<Vec<_>>();
        self.run(attempts, hole)
    }

    fn run(&mut self, attempts: Vec<SynthesisResult<&SketchNode>>, hole: &Hole) -> BatchReport {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        for (index, attempt) in attempts.into_iter().enumerate() {
            match attempt.and_then(|sketch| self.attempt(sketch, hole)) {
                Ok(body) => {
                    if seen.insert(body.normalized()) {
                        report.results.push(body);
                    } else {
                        log::debug!("candidate {} duplicates an earlier result", index);
                        report.duplicates += 1;
                    }
                }
                Err(failure) => {
                    log::debug!("candidate {} failed: {}", index, failure);
                    report.failures.push((index, failure));
                }
            }
        }
        log::info!(
            "{} result(s), {} duplicate(s), failures {:?}",
            report.results.len(),
            report.duplicates,
            report.failure_stats()
        );
        report
    }

    fn attempt(&mut self, sketch: &SketchNode, hole: &Hole) -> SynthesisResult<RenderedBody> {
        let config = self.synthesizer.config();
        let sequences = sketch
            .update_sequences(config.max_sequences, config.max_sequence_length, config.loop_unroll)
            .map_err(SynthesisFailure::SequenceExplosion)?;
        log::debug!(
            "sketch with {} statement(s) has {} sequence(s)",
            sketch.num_statements(),
            sequences.len()
        );
        self.synthesizer.synthesize(sketch, hole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SequenceBound,
        graph::tests::jdk,
        parser::{candidates_from_json, hole_from_json, json_from_file},
    };

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn readline_query() {
        init();
        let cat = jdk();
        let query = json_from_file("tests/readline-query.json").unwrap();
        let hole = hole_from_json(&query).unwrap();
        let mut solver = Solver::new(&cat, SynthesisConfig::deterministic());
        let report = solver.solve_json(&candidates_from_json(&query), &hole);

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert!(report.results[0].body.contains("s = br.readLine();"));
        assert!(report.results[1]
            .body
            .contains("while ((s = br.readLine()) != null) {\n    }\n"));
        assert!(report.results[1].body.contains("br.close();"));

        let failed: Vec<usize> = report.failures.iter().map(|(i, _)| *i).collect();
        assert_eq!(failed, vec![2, 4, 5]);
        assert_eq!(
            report.failures[0].1,
            SynthesisFailure::SearchExhausted("java.sql.Connection".into())
        );
        assert!(matches!(report.failures[1].1, SynthesisFailure::UnknownSignature(_)));
        assert!(matches!(report.failures[2].1, SynthesisFailure::MalformedSketch(_)));

        let stats = report.failure_stats();
        assert_eq!(stats["search-exhausted"], 1);
        assert_eq!(stats["unknown-signature"], 1);
        assert_eq!(stats["malformed-sketch"], 1);
    }

    #[test]
    fn exploding_sketches_are_skipped() {
        let cat = jdk();
        let config = SynthesisConfig {
            max_sequences: 1,
            ..SynthesisConfig::deterministic()
        };
        let sketch = SketchNode::Branch {
            cond: vec![],
            then_body: vec![SketchNode::call("java.io.File.exists()").unwrap()],
            else_body: vec![SketchNode::call("java.io.File.getName()").unwrap()],
        };
        let plain = SketchNode::call("java.io.File.getName()").unwrap();
        let mut solver = Solver::new(&cat, config);
        let report = solver.solve(&[sketch, plain], &Hole::new(&[("f", "java.io.File")]));
        assert_eq!(
            report.failures,
            vec![(0, SynthesisFailure::SequenceExplosion(SequenceBound::Count))]
        );
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].body, "String s = null;\ns = f.getName();\n");
    }
}
