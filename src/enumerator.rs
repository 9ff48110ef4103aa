use std::collections::VecDeque;

use rand::{rngs::StdRng, seq::SliceRandom};

use crate::{
    ast::{Expr, Stmt},
    config::SynthesisConfig,
    environment::{Checkpoint, Environment},
    error::{SynthesisFailure, SynthesisResult},
    graph::TypeCatalog,
    schema::{default_value, CallMetadata},
};

/// How a requested type was obtained.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Found {
    Reused(Expr),
    Stub(Expr),
    Built(Expr),
}

impl Found {
    pub fn into_expr(self) -> Expr {
        match self {
            Found::Reused(e) | Found::Stub(e) | Found::Built(e) => e,
        }
    }
}

/// A breadth-first composition frontier entry.
struct Link {
    ty: String,
    expr: Expr,
    length: usize,
    root: String,
    // environment state with every call of this chain consumed
    state: Checkpoint,
}

/// Type-directed search for an expression of a requested type.
pub struct Enumerator<'a> {
    catalog: &'a dyn TypeCatalog,
    config: &'a SynthesisConfig,
    rng: &'a mut StdRng,
}

impl<'a> Enumerator<'a> {
    pub fn new(catalog: &'a dyn TypeCatalog, config: &'a SynthesisConfig, rng: &'a mut StdRng) -> Self {
        Enumerator {
            catalog,
            config,
            rng,
        }
    }

    /// Resolve `ty` for use by a statement. Constructed or composed values are
    /// bound to a fresh variable first, so that later lookups reuse them.
    pub fn resolve(
        &mut self,
        ty: &str,
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<Expr> {
        match self.search(ty, env, 0) {
            Some(Found::Built(expr)) => Ok(bind(ty, expr, env, out)),
            Some(found) => Ok(found.into_expr()),
            None => Err(SynthesisFailure::SearchExhausted(self.catalog.canonical_name(ty))),
        }
    }

    /// Like `resolve`, for the receiver of a call. A lambda has no target
    /// type in receiver position, so stubs are bound to a variable too.
    pub fn resolve_receiver(
        &mut self,
        ty: &str,
        env: &mut Environment,
        out: &mut Vec<Stmt>,
    ) -> SynthesisResult<Expr> {
        match self.search(ty, env, 0) {
            Some(Found::Built(expr)) | Some(Found::Stub(expr)) => Ok(bind(ty, expr, env, out)),
            Some(Found::Reused(expr)) => Ok(expr),
            None => Err(SynthesisFailure::SearchExhausted(self.catalog.canonical_name(ty))),
        }
    }

    pub fn search(&mut self, target: &str, env: &mut Environment, arg_depth: usize) -> Option<Found> {
        let target = self.catalog.canonical_name(target);
        if let Some(name) = env.find_variable(&target) {
            return Some(Found::Reused(Expr::Var(name)));
        }
        if let Some(method) = self.catalog.functional_method(&target) {
            log::debug!("stubbing {} through {}", target, method);
            env.require_import(&target);
            return Some(Found::Stub(self.stub(&method, env)));
        }
        if arg_depth > self.config.max_argument_depth {
            return None;
        }
        if let Some(expr) = self.construct(&target, env, arg_depth) {
            return Some(Found::Built(expr));
        }
        let found = self.compose(&target, env, arg_depth).map(Found::Built);
        if found.is_none() {
            log::debug!("search for {} exhausted at depth {}", target, arg_depth);
        }
        found
    }

    fn stub(&self, method: &CallMetadata, env: &mut Environment) -> Expr {
        Expr::Lambda {
            params: method.params.iter().map(|p| env.reserve_name(p)).collect(),
            result: method
                .return_type
                .as_deref()
                .map(|r| default_value(r).to_string()),
        }
    }

    /// Fewest parameters first; equal arities in random order if configured.
    fn order(&mut self, calls: &mut Vec<CallMetadata>) {
        if self.config.randomize {
            calls.shuffle(&mut *self.rng);
        }
        calls.sort_by_key(CallMetadata::arity);
    }

    fn resolve_args(
        &mut self,
        params: &[String],
        env: &mut Environment,
        arg_depth: usize,
    ) -> Option<Vec<Expr>> {
        params
            .iter()
            .map(|p| self.search(p, env, arg_depth).map(Found::into_expr))
            .collect()
    }

    fn construct(&mut self, target: &str, env: &mut Environment, arg_depth: usize) -> Option<Expr> {
        let mut constructors = self.catalog.list_constructors(target);
        self.order(&mut constructors);
        for ctor in constructors {
            let before = env.checkpoint();
            match self.resolve_args(&ctor.params, env, arg_depth + 1) {
                Some(args) => {
                    log::debug!("constructing {} with {}", target, ctor);
                    consume(&ctor, env);
                    return Some(Expr::New {
                        ty: ctor.declaring_type.clone(),
                        args,
                    });
                }
                None => env.rollback(before),
            }
        }
        None
    }

    fn compose(&mut self, target: &str, env: &mut Environment, arg_depth: usize) -> Option<Expr> {
        let base = env.checkpoint();
        let mut frontier: VecDeque<Link> = env
            .variables()
            .map(|v| Link {
                ty: v.ty.clone(),
                expr: Expr::Var(v.name.clone()),
                length: 0,
                root: v.name.clone(),
                state: base.clone(),
            })
            .collect();
        while let Some(link) = frontier.pop_front() {
            let mut methods = self.catalog.list_instance_methods(&link.ty);
            methods.retain(|m| m.return_type.is_some());
            self.order(&mut methods);
            for method in methods {
                env.rollback(link.state.clone());
                let Some(args) = self.resolve_args(&method.params, env, arg_depth + 1) else {
                    continue;
                };
                consume(&method, env);
                let call = Expr::call(link.expr.clone(), &method.name, args);
                let ret = method.return_type.clone().unwrap_or_default();
                if ret == target {
                    log::debug!("composed {} from {} via {}", target, link.root, method);
                    env.reference(&link.root);
                    return Some(call);
                }
                if link.length < self.config.max_compose_length {
                    frontier.push_back(Link {
                        ty: ret,
                        expr: call,
                        length: link.length + 1,
                        root: link.root.clone(),
                        state: env.checkpoint(),
                    });
                }
            }
        }
        env.rollback(base);
        None
    }
}

fn bind(ty: &str, expr: Expr, env: &mut Environment, out: &mut Vec<Stmt>) -> Expr {
    let name = env.add_variable(ty);
    out.push(Stmt::assign(&name, expr));
    Expr::Var(name)
}

/// Ledger and import bookkeeping for a constructor or method that ends up in
/// the emitted code.
pub(crate) fn consume(call: &CallMetadata, env: &mut Environment) {
    for exception in &call.exceptions {
        env.record_exception_thrown(exception);
    }
    env.require_import(&call.declaring_type);
    if let Some(ret) = &call.return_type {
        env.require_import(ret);
    }
    for param in &call.params {
        env.require_import(param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::JavaPrinter, graph::tests::jdk, schema::Hole};
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn print(expr: &Expr) -> String {
        JavaPrinter::new().print_expr(expr)
    }

    #[test]
    fn exact_variable_is_never_rebuilt() {
        init();
        let cat = jdk();
        let config = SynthesisConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let hole = Hole::new(&[("reader", "java.io.BufferedReader")]);
        let mut env = Environment::new(&cat, &hole);
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        let found = en.search("java.io.BufferedReader", &mut env, 0);
        assert_eq!(found, Some(Found::Reused(Expr::var("reader"))));
        assert!(env.outstanding_exceptions().is_empty());
        assert!(env.imports().is_empty());
    }

    #[test]
    fn chains_constructors_through_subtypes() {
        init();
        let cat = jdk();
        let config = SynthesisConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let hole = Hole::new(&[("file", "java.lang.String")]);
        let mut env = Environment::new(&cat, &hole);
        let mut out = Vec::new();
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        let expr = en.resolve("java.io.BufferedReader", &mut env, &mut out).unwrap();
        assert_eq!(expr, Expr::var("br"));
        assert_eq!(
            JavaPrinter::new().print(&out),
            "br = new BufferedReader(new FileReader(file));\n"
        );
        assert_eq!(env.outstanding_exceptions(), vec!["java.io.FileNotFoundException"]);
        assert!(env.imports().contains(&"java.io.FileReader".to_string()));
        assert!(env.imports().contains(&"java.io.BufferedReader".to_string()));
    }

    #[test]
    fn argument_depth_bounds_construction() {
        let cat = jdk();
        let config = SynthesisConfig {
            max_argument_depth: 0,
            ..SynthesisConfig::deterministic()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let hole = Hole::new(&[("file", "java.lang.String")]);
        let mut env = Environment::new(&cat, &hole);
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        assert_eq!(en.search("java.io.BufferedReader", &mut env, 0), None);
        // the failed attempts left nothing behind
        assert!(env.outstanding_exceptions().is_empty());
        assert!(env.imports().is_empty());
    }

    #[test]
    fn composes_from_scope() {
        init();
        let cat = jdk();
        let config = SynthesisConfig::deterministic();
        let mut rng = StdRng::seed_from_u64(0);
        let hole = Hole::new(&[("list", "java.util.List")]);
        let mut env = Environment::new(&cat, &hole);
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        let found = en.search("java.util.Iterator", &mut env, 0).unwrap();
        assert_eq!(print(&found.into_expr()), "list.iterator()");
        assert_eq!(env.variables().next().unwrap().ref_count, 1);
    }

    #[test]
    fn compose_length_bounds_chains() {
        init();
        let cat = jdk();
        let hole = Hole::new(&[("ds", "javax.sql.DataSource")]);

        let config = SynthesisConfig::deterministic();
        let mut rng = StdRng::seed_from_u64(0);
        let mut env = Environment::new(&cat, &hole);
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        let found = en.search("java.sql.Statement", &mut env, 0).unwrap();
        assert_eq!(print(&found.into_expr()), "ds.getConnection().createStatement()");
        assert_eq!(env.outstanding_exceptions(), vec!["java.sql.SQLException"]);

        let config = SynthesisConfig {
            max_compose_length: 0,
            ..SynthesisConfig::deterministic()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut env = Environment::new(&cat, &hole);
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        assert_eq!(en.search("java.sql.Statement", &mut env, 0), None);
        assert!(env.outstanding_exceptions().is_empty());
        // a single call is still within reach
        let found = en.search("java.sql.Connection", &mut env, 0).unwrap();
        assert_eq!(print(&found.into_expr()), "ds.getConnection()");
    }

    #[test]
    fn shuffle_keeps_arity_order() {
        let cat = jdk();
        let config = SynthesisConfig::default();
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut en = Enumerator::new(&cat, &config, &mut rng);
            let mut ctors = cat.list_constructors("java.io.Reader");
            en.order(&mut ctors);
            assert!(ctors.windows(2).all(|w| w[0].arity() <= w[1].arity()));
        }
    }

    #[test]
    fn seed_fixes_the_tie_break() {
        let cat = jdk();
        let config = SynthesisConfig::default();
        let hole = Hole::new(&[("s", "String"), ("f", "java.io.File")]);
        let build = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut env = Environment::new(&cat, &hole);
            let mut en = Enumerator::new(&cat, &config, &mut rng);
            print(&en.search("java.io.FileReader", &mut env, 0).unwrap().into_expr())
        };
        let mut seen = HashSet::new();
        for seed in 0..30 {
            let first = build(seed);
            assert_eq!(first, build(seed));
            seen.insert(first);
        }
        let both: HashSet<String> = ["new FileReader(f)", "new FileReader(s)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(seen, both);
    }

    #[test]
    fn functional_interfaces_get_stubs() {
        let cat = jdk();
        let config = SynthesisConfig::deterministic();
        let mut rng = StdRng::seed_from_u64(0);
        let mut env = Environment::new(&cat, &Hole::default());
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        let found = en.search("java.util.Comparator", &mut env, 5).unwrap();
        assert!(matches!(found, Found::Stub(_)));
        assert_eq!(print(&found.into_expr()), "(o, o1) -> 0");
        assert_eq!(env.imports(), vec!["java.util.Comparator"]);
    }

    #[test]
    fn unreachable_type_is_exhausted() {
        let cat = jdk();
        let config = SynthesisConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let hole = Hole::new(&[("file", "java.lang.String")]);
        let mut env = Environment::new(&cat, &hole);
        let mut out = Vec::new();
        let mut en = Enumerator::new(&cat, &config, &mut rng);
        assert_eq!(
            en.resolve("java.sql.Connection", &mut env, &mut out),
            Err(SynthesisFailure::SearchExhausted("java.sql.Connection".into()))
        );
        assert!(out.is_empty());
    }
}
