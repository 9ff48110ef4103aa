use core::fmt;
use std::{
    collections::HashSet,
    fmt::Debug,
    hash::{Hash, Hasher},
};

use serde_json::{json, Value};

use crate::{
    error::{SequenceBound, SynthesisResult},
    parser::parse_signature_str,
    schema::{CallKind, Signature},
};

/// An abstract call site. Two calls are the same call when their signature
/// strings are equal, regardless of where they sit in the tree.
#[derive(Clone)]
pub struct ApiCall {
    pub call: String,
    pub signature: Signature,
    pub kind: CallKind,
}

impl ApiCall {
    pub fn new(signature: Signature) -> Self {
        ApiCall {
            call: signature.to_string(),
            kind: signature.kind(),
            signature,
        }
    }

    pub fn parse(call: &str) -> SynthesisResult<Self> {
        let signature = parse_signature_str(call)?;
        Ok(ApiCall {
            call: call.to_string(),
            kind: signature.kind(),
            signature,
        })
    }
}

impl PartialEq for ApiCall {
    fn eq(&self, other: &Self) -> bool {
        self.call == other.call
    }
}

impl Eq for ApiCall {}

impl Hash for ApiCall {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.call.hash(state)
    }
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.call)
    }
}

impl Debug for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SketchNode {
    ApiCall(ApiCall),
    Block(Vec<SketchNode>),
    Branch {
        cond: Vec<ApiCall>,
        then_body: Vec<SketchNode>,
        else_body: Vec<SketchNode>,
    },
    Loop {
        cond: Vec<ApiCall>,
        body: Vec<SketchNode>,
    },
    ExceptionHandler {
        try_body: Vec<SketchNode>,
        catch_body: Vec<SketchNode>,
    },
}

/// One linear path of call signatures through a sketch.
#[derive(PartialEq, Eq, Hash, Clone, Default)]
pub struct Sequence {
    pub calls: Vec<String>,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.calls.join(", "))
    }
}

impl Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

struct SequenceLimits {
    max_count: usize,
    max_length: usize,
    unroll: usize,
}

fn merge_unique(into: &mut Vec<Sequence>, from: Vec<Sequence>) {
    let mut seen: HashSet<Sequence> = into.iter().cloned().collect();
    for seq in from {
        if seen.insert(seq.clone()) {
            into.push(seq);
        }
    }
}

impl SketchNode {
    pub fn call(call: &str) -> SynthesisResult<Self> {
        Ok(SketchNode::ApiCall(ApiCall::parse(call)?))
    }

    /// Every call signature reachable from this node, deduplicated.
    pub fn bag_of_api_calls(&self) -> HashSet<ApiCall> {
        let mut bag = HashSet::new();
        self.collect_calls(&mut bag);
        bag
    }

    fn collect_calls(&self, bag: &mut HashSet<ApiCall>) {
        match self {
            SketchNode::ApiCall(call) => {
                bag.insert(call.clone());
            }
            SketchNode::Block(children) => children.iter().for_each(|c| c.collect_calls(bag)),
            SketchNode::Branch {
                cond,
                then_body,
                else_body,
            } => {
                bag.extend(cond.iter().cloned());
                then_body.iter().for_each(|c| c.collect_calls(bag));
                else_body.iter().for_each(|c| c.collect_calls(bag));
            }
            SketchNode::Loop { cond, body } => {
                bag.extend(cond.iter().cloned());
                body.iter().for_each(|c| c.collect_calls(bag));
            }
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => {
                try_body.iter().for_each(|c| c.collect_calls(bag));
                catch_body.iter().for_each(|c| c.collect_calls(bag));
            }
        }
    }

    /// The linear call sequences this sketch can execute.
    ///
    /// Fails as soon as either bound is crossed; the caller is expected to
    /// discard the sketch rather than work with a truncated set.
    pub fn update_sequences(
        &self,
        max_count: usize,
        max_length: usize,
        unroll: usize,
    ) -> Result<Vec<Sequence>, SequenceBound> {
        let limits = SequenceLimits {
            max_count,
            max_length,
            unroll,
        };
        let mut so_far = vec![Sequence::default()];
        self.extend_sequences(&mut so_far, &limits)?;
        Ok(so_far)
    }

    fn extend_sequences(
        &self,
        so_far: &mut Vec<Sequence>,
        limits: &SequenceLimits,
    ) -> Result<(), SequenceBound> {
        match self {
            SketchNode::ApiCall(call) => append_call(so_far, call, limits)?,
            SketchNode::Block(children) => extend_all(children, so_far, limits)?,
            SketchNode::Branch {
                cond,
                then_body,
                else_body,
            } => {
                for call in cond {
                    append_call(so_far, call, limits)?;
                }
                let mut then_seqs = so_far.clone();
                extend_all(then_body, &mut then_seqs, limits)?;
                let mut else_seqs = so_far.clone();
                extend_all(else_body, &mut else_seqs, limits)?;
                so_far.clear();
                merge_unique(so_far, then_seqs);
                merge_unique(so_far, else_seqs);
            }
            SketchNode::Loop { cond, body } => {
                for _ in 0..limits.unroll {
                    for call in cond {
                        append_call(so_far, call, limits)?;
                    }
                    extend_all(body, so_far, limits)?;
                }
                for call in cond {
                    append_call(so_far, call, limits)?;
                }
            }
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => {
                extend_all(try_body, so_far, limits)?;
                let mut caught = so_far.clone();
                extend_all(catch_body, &mut caught, limits)?;
                merge_unique(so_far, caught);
            }
        }
        if so_far.len() > limits.max_count {
            return Err(SequenceBound::Count);
        }
        Ok(())
    }

    pub fn num_statements(&self) -> usize {
        match self {
            SketchNode::ApiCall(_) => 1,
            SketchNode::Block(children) => sum(children, SketchNode::num_statements),
            SketchNode::Branch {
                cond,
                then_body,
                else_body,
            } => {
                cond.len()
                    + sum(then_body, SketchNode::num_statements)
                    + sum(else_body, SketchNode::num_statements)
            }
            SketchNode::Loop { cond, body } => cond.len() + sum(body, SketchNode::num_statements),
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => sum(try_body, SketchNode::num_statements) + sum(catch_body, SketchNode::num_statements),
        }
    }

    pub fn num_loops(&self) -> usize {
        self.count_nested(SketchNode::num_loops) + matches!(self, SketchNode::Loop { .. }) as usize
    }

    pub fn num_branches(&self) -> usize {
        self.count_nested(SketchNode::num_branches) + matches!(self, SketchNode::Branch { .. }) as usize
    }

    pub fn num_excepts(&self) -> usize {
        self.count_nested(SketchNode::num_excepts)
            + matches!(self, SketchNode::ExceptionHandler { .. }) as usize
    }

    fn count_nested(&self, f: fn(&SketchNode) -> usize) -> usize {
        match self {
            SketchNode::ApiCall(_) => 0,
            SketchNode::Block(children) => sum(children, f),
            SketchNode::Branch {
                then_body,
                else_body,
                ..
            } => sum(then_body, f) + sum(else_body, f),
            SketchNode::Loop { body, .. } => sum(body, f),
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => sum(try_body, f) + sum(catch_body, f),
        }
    }

    /// Serialize back into the predictor's JSON shape.
    pub fn to_json(&self) -> Value {
        fn calls(cond: &[ApiCall]) -> Vec<Value> {
            cond.iter()
                .map(|c| json!({"node": "APICall", "_call": c.call}))
                .collect()
        }
        fn nodes(children: &[SketchNode]) -> Vec<Value> {
            children.iter().map(SketchNode::to_json).collect()
        }
        match self {
            SketchNode::ApiCall(call) => json!({"node": "APICall", "_call": call.call}),
            SketchNode::Block(children) => json!({"node": "Block", "_nodes": nodes(children)}),
            SketchNode::Branch {
                cond,
                then_body,
                else_body,
            } => json!({
                "node": "Branch",
                "_cond": calls(cond),
                "_then": nodes(then_body),
                "_else": nodes(else_body),
            }),
            SketchNode::Loop { cond, body } => json!({
                "node": "Loop",
                "_cond": calls(cond),
                "_body": nodes(body),
            }),
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => json!({
                "node": "Except",
                "_try": nodes(try_body),
                "_catch": nodes(catch_body),
            }),
        }
    }
}

fn sum(nodes: &[SketchNode], f: fn(&SketchNode) -> usize) -> usize {
    nodes.iter().map(f).sum()
}

fn extend_all(
    nodes: &[SketchNode],
    so_far: &mut Vec<Sequence>,
    limits: &SequenceLimits,
) -> Result<(), SequenceBound> {
    for node in nodes {
        node.extend_sequences(so_far, limits)?;
    }
    Ok(())
}

fn append_call(
    so_far: &mut [Sequence],
    call: &ApiCall,
    limits: &SequenceLimits,
) -> Result<(), SequenceBound> {
    for seq in so_far.iter_mut() {
        seq.calls.push(call.call.clone());
        if seq.calls.len() > limits.max_length {
            return Err(SequenceBound::Length);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(sig: &str) -> SketchNode {
        SketchNode::call(sig).unwrap()
    }

    fn api(sig: &str) -> ApiCall {
        ApiCall::parse(sig).unwrap()
    }

    fn seq(calls: &[&str]) -> Sequence {
        Sequence {
            calls: calls.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn block_concatenates() {
        let sketch = SketchNode::Block(vec![call("A.a()"), call("B.b()")]);
        let seqs = sketch.update_sequences(1, 2, 2).unwrap();
        assert_eq!(seqs, vec![seq(&["A.a()", "B.b()"])]);
    }

    #[test]
    fn except_keeps_try_only_path() {
        let sketch = SketchNode::ExceptionHandler {
            try_body: vec![call("A.a()")],
            catch_body: vec![call("B.b()")],
        };
        let seqs = sketch.update_sequences(10, 10, 2).unwrap();
        assert_eq!(seqs, vec![seq(&["A.a()"]), seq(&["A.a()", "B.b()"])]);
    }

    #[test]
    fn loop_unrolls_with_trailing_condition() {
        let sketch = SketchNode::Loop {
            cond: vec![api("C.c()")],
            body: vec![call("B.b()")],
        };
        let seqs = sketch.update_sequences(10, 10, 2).unwrap();
        assert_eq!(seqs, vec![seq(&["C.c()", "B.b()", "C.c()", "B.b()", "C.c()"])]);
    }

    #[test]
    fn branch_keeps_both_paths() {
        let sketch = SketchNode::Branch {
            cond: vec![api("C.c()")],
            then_body: vec![call("T.t()")],
            else_body: vec![call("E.e()")],
        };
        let seqs = sketch.update_sequences(10, 10, 2).unwrap();
        assert_eq!(seqs, vec![seq(&["C.c()", "T.t()"]), seq(&["C.c()", "E.e()"])]);
    }

    #[test]
    fn identical_branches_collapse() {
        let sketch = SketchNode::Branch {
            cond: vec![],
            then_body: vec![call("T.t()")],
            else_body: vec![call("T.t()")],
        };
        let seqs = sketch.update_sequences(1, 10, 2).unwrap();
        assert_eq!(seqs.len(), 1);
    }

    #[test]
    fn bounds_fail_with_distinct_signals() {
        let long = SketchNode::Block(vec![call("A.a()"), call("A.a()"), call("A.a()")]);
        assert_eq!(long.update_sequences(10, 2, 2), Err(SequenceBound::Length));

        let wide = SketchNode::Block(vec![
            SketchNode::ExceptionHandler {
                try_body: vec![call("A.a()")],
                catch_body: vec![call("B.b()")],
            },
            SketchNode::ExceptionHandler {
                try_body: vec![call("C.c()")],
                catch_body: vec![call("D.d()")],
            },
        ]);
        assert_eq!(wide.update_sequences(3, 10, 2), Err(SequenceBound::Count));
        assert_eq!(wide.update_sequences(4, 10, 2).unwrap().len(), 4);
    }

    #[test]
    fn bag_deduplicates_by_signature() {
        let sketch = SketchNode::Block(vec![
            call("java.io.Reader.close()"),
            call("java.io.Reader.close()"),
        ]);
        assert_eq!(sketch.bag_of_api_calls().len(), 1);
    }

    #[test]
    fn structural_counters() {
        let sketch = SketchNode::Block(vec![
            SketchNode::Loop {
                cond: vec![api("C.c()")],
                body: vec![SketchNode::Branch {
                    cond: vec![api("D.d()")],
                    then_body: vec![call("T.t()")],
                    else_body: vec![],
                }],
            },
            SketchNode::ExceptionHandler {
                try_body: vec![call("A.a()")],
                catch_body: vec![call("B.b()")],
            },
        ]);
        assert_eq!(sketch.num_statements(), 5);
        assert_eq!(sketch.num_loops(), 1);
        assert_eq!(sketch.num_branches(), 1);
        assert_eq!(sketch.num_excepts(), 1);
    }
}
