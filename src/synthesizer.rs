use rand::{rngs::StdRng, SeedableRng};

use crate::{
    ast::{CatchClause, Expr, Stmt},
    config::SynthesisConfig,
    enumerator::{consume, Enumerator},
    environment::Environment,
    error::{SynthesisFailure, SynthesisResult},
    graph::{order_subtypes_first, TypeCatalog},
    postprocess::{postprocess, RenderedBody},
    schema::{is_numeric_primitive, CallKind, Hole},
    sketches::{ApiCall, SketchNode},
};

const CATCH_ALL: &str = "java.lang.Exception";

/// Walks a sketch and emits concrete statements for it.
pub struct Synthesizer<'a> {
    catalog: &'a dyn TypeCatalog,
    config: SynthesisConfig,
    rng: StdRng,
}

impl<'a> Synthesizer<'a> {
    pub fn new(catalog: &'a dyn TypeCatalog, config: SynthesisConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Synthesizer {
            catalog,
            config,
            rng,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Fill `hole` with code for `sketch`. Every attempt gets its own
    /// environment; nothing carries over between calls except the random
    /// state.
    pub fn synthesize(&mut self, sketch: &SketchNode, hole: &Hole) -> SynthesisResult<RenderedBody> {
        let mut env = Environment::new(self.catalog, hole);
        let mut body = Vec::new();
        self.emit(sketch, &mut env, &mut body)?;
        Ok(postprocess(body, &mut env))
    }

    fn enumerator(&mut self) -> Enumerator<'_> {
        Enumerator::new(self.catalog, &self.config, &mut self.rng)
    }

    fn emit_all(
        &mut self,
        nodes: &[SketchNode],
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<()> {
        for node in nodes {
            self.emit(node, env, out)?;
        }
        Ok(())
    }

    fn emit(&mut self, node: &SketchNode, env: &mut Environment, out: &mut Vec<Stmt>) -> SynthesisResult<()> {
        match node {
            SketchNode::ApiCall(call) => {
                let (expr, produced) = self.invoke(call, env, out)?;
                match produced {
                    Some(ty) => {
                        let name = env.add_variable(&ty);
                        out.push(Stmt::assign(&name, expr));
                    }
                    None => out.push(Stmt::Expr(expr)),
                }
            }
            SketchNode::Block(children) => self.emit_all(children, env, out)?,
            SketchNode::Branch {
                cond,
                then_body,
                else_body,
            } => {
                let (cond, _) = self.condition(cond, env, out)?;
                let scope = env.snapshot_scope();
                let mut then_out = Vec::new();
                self.emit_all(then_body, env, &mut then_out)?;
                env.restore_scope(scope.clone());
                let mut else_out = Vec::new();
                self.emit_all(else_body, env, &mut else_out)?;
                env.restore_scope(scope);
                out.push(Stmt::If {
                    cond,
                    then_body: then_out,
                    else_body: else_out,
                });
            }
            SketchNode::Loop { cond, body } => {
                let (cond, repeated) = self.condition(cond, env, out)?;
                let scope = env.snapshot_scope();
                let mut body_out = Vec::new();
                self.emit_all(body, env, &mut body_out)?;
                // void condition calls run again before every re-test
                body_out.extend(repeated);
                env.restore_scope(scope);
                out.push(Stmt::While {
                    cond,
                    body: body_out,
                });
            }
            SketchNode::ExceptionHandler {
                try_body,
                catch_body,
            } => self.emit_try(try_body, catch_body, env, out)?,
        }
        Ok(())
    }

    /// Build the call expression for `call`, resolving its receiver and
    /// arguments. Returns the expression and the type it produces, if any.
    fn invoke(
        &mut self,
        call: &ApiCall,
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<(Expr, Option<String>)> {
        let meta = self
            .catalog
            .resolve(&call.signature)
            .ok_or_else(|| SynthesisFailure::UnknownSignature(call.call.clone()))?;
        let receiver = match meta.kind {
            CallKind::Method if meta.is_static => Some(Expr::TypeRef(meta.declaring_type.clone())),
            CallKind::Method => {
                let receiver_ty = self.catalog.canonical_name(&call.signature.declaring_type);
                Some(self.enumerator().resolve_receiver(&receiver_ty, env, out)?)
            }
            CallKind::Constructor => None,
        };
        let mut args = Vec::with_capacity(meta.params.len());
        for param in &meta.params {
            args.push(self.enumerator().resolve(param, env, out)?);
        }
        consume(&meta, env);
        log::debug!("emitting {}", meta);
        let expr = match receiver {
            Some(receiver) => Expr::call(receiver, &meta.name, args),
            None => Expr::New {
                ty: meta.declaring_type.clone(),
                args,
            },
        };
        Ok((expr, meta.produced_type().map(|t| t.to_string())))
    }

    /// AND of the condition calls; falls back to a boolean variable when the
    /// sketch gives no usable condition. Void calls become statements ahead
    /// of the construct and are also returned on their own.
    fn condition(
        &mut self,
        cond: &[ApiCall],
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<(Expr, Vec<Stmt>)> {
        let mut parts = Vec::new();
        let mut void_calls = Vec::new();
        for call in cond {
            let (expr, produced) = self.invoke(call, env, out)?;
            match produced.as_deref() {
                None => {
                    out.push(Stmt::Expr(expr.clone()));
                    void_calls.push(Stmt::Expr(expr));
                }
                Some("boolean") => parts.push(expr),
                Some(ty) => {
                    let literal = if is_numeric_primitive(ty) { "0" } else { "null" };
                    let name = env.add_variable(ty);
                    parts.push(Expr::not_equal(Expr::assign(&name, expr), literal));
                }
            }
        }
        if parts.is_empty() {
            let name = env.search_or_add_variable("boolean", true);
            parts.push(Expr::Var(name));
        }
        Ok((Expr::and(parts), void_calls))
    }

    fn emit_try(
        &mut self,
        try_body: &[SketchNode],
        catch_body: &[SketchNode],
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<()> {
        let before = env.exception_counts();
        let scope = env.snapshot_scope();
        let mut try_out = Vec::new();
        self.emit_all(try_body, env, &mut try_out)?;
        env.restore_scope(scope.clone());

        // what the try body added on top of what was already pending
        let thrown: Vec<(String, usize)> = env
            .exception_counts()
            .into_iter()
            .filter_map(|(ty, count)| {
                let prior = before.get(&ty).copied().unwrap_or(0);
                (count > prior).then(|| (ty, count - prior))
            })
            .collect();
        let mut caught = order_subtypes_first(
            self.catalog,
            thrown.iter().map(|(ty, _)| ty.clone()).collect(),
        );
        if caught.is_empty() {
            caught.push(CATCH_ALL.to_string());
        }

        let mut catches = Vec::new();
        for ty in caught {
            let name = env.add_scoped_variable(&ty);
            let mut catch_out = Vec::new();
            self.emit_all(catch_body, env, &mut catch_out)?;
            env.restore_scope(scope.clone());
            let added = thrown
                .iter()
                .find(|(t, _)| *t == ty)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            for _ in 0..added {
                env.record_exception_caught(&ty);
            }
            catches.push(CatchClause {
                ty,
                name,
                body: catch_out,
            });
        }
        out.push(Stmt::Try {
            body: try_out,
            catches,
        });
        Ok(())
    }
}
