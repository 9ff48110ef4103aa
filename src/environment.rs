use core::fmt;
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt::Debug,
};

use crate::{
    graph::TypeCatalog,
    schema::{is_primitive, needs_import, simple_name, Hole},
};

#[derive(PartialEq, Eq, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: String,
    pub ref_count: usize,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} (x{})", self.name, self.ty, self.ref_count)
    }
}

impl Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Clone, Debug)]
pub struct ScopeSnapshot {
    given: Vec<Variable>,
    synthesized: Vec<Variable>,
}

#[derive(Clone, Debug)]
pub struct Checkpoint {
    scope: ScopeSnapshot,
    exceptions: BTreeMap<String, usize>,
    imports: BTreeSet<String>,
}

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null",
];

// initial capitals of the simple name, else its first letter
fn base_name(ty: &str) -> String {
    let simple = simple_name(ty);
    let caps: String = simple
        .chars()
        .filter(|c| c.is_uppercase())
        .flat_map(char::to_lowercase)
        .collect();
    if !is_primitive(simple) && !caps.is_empty() {
        return caps;
    }
    simple
        .chars()
        .next()
        .map(|c| c.to_lowercase().collect())
        .unwrap_or_else(|| "v".to_string())
}

/// Mutable context of one synthesis attempt against one hole.
pub struct Environment<'c> {
    catalog: &'c dyn TypeCatalog,
    given: Vec<Variable>,
    synthesized: Vec<Variable>,
    // every variable that needs a hoisted declaration, in creation order
    declared: Vec<Variable>,
    taken_names: HashSet<String>,
    exceptions: BTreeMap<String, usize>,
    imports: BTreeSet<String>,
}

impl<'c> Environment<'c> {
    pub fn new(catalog: &'c dyn TypeCatalog, hole: &Hole) -> Self {
        let given: Vec<Variable> = hole
            .parameters
            .iter()
            .map(|p| Variable {
                name: p.name.clone(),
                ty: catalog.canonical_name(&p.ty),
                ref_count: 0,
            })
            .collect();
        let taken_names = given.iter().map(|v| v.name.clone()).collect();
        Environment {
            catalog,
            given,
            synthesized: Vec::new(),
            declared: Vec::new(),
            taken_names,
            exceptions: BTreeMap::new(),
            imports: BTreeSet::new(),
        }
    }

    pub fn catalog(&self) -> &'c dyn TypeCatalog {
        self.catalog
    }

    // given before synthesized
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.given.iter().chain(self.synthesized.iter())
    }

    pub fn declared_variables(&self) -> &[Variable] {
        &self.declared
    }

    /// Reuse the least used variable assignable to `ty`, if any.
    pub fn find_variable(&mut self, ty: &str) -> Option<String> {
        let catalog = self.catalog;
        let var = self
            .given
            .iter_mut()
            .chain(self.synthesized.iter_mut())
            .filter(|v| catalog.is_assignable(&v.ty, ty))
            // min_by_key keeps the first of equal counts
            .min_by_key(|v| v.ref_count)?;
        var.ref_count += 1;
        log::debug!("reusing {} for {}", var, ty);
        Some(var.name.clone())
    }

    pub fn search_or_add_variable(&mut self, ty: &str, allow_reuse: bool) -> String {
        if allow_reuse {
            if let Some(name) = self.find_variable(ty) {
                return name;
            }
        }
        self.add_variable(ty)
    }

    pub fn add_variable(&mut self, ty: &str) -> String {
        let ty = self.catalog.canonical_name(ty);
        let name = self.reserve_name(&ty);
        let var = Variable {
            name: name.clone(),
            ty: ty.clone(),
            ref_count: 1,
        };
        self.synthesized.push(var.clone());
        self.declared.push(var);
        self.require_import(&ty);
        name
    }

    /// A fresh variable whose declaration is the binding site itself, such as
    /// a catch parameter.
    pub fn add_scoped_variable(&mut self, ty: &str) -> String {
        let ty = self.catalog.canonical_name(ty);
        let name = self.reserve_name(&ty);
        self.synthesized.push(Variable {
            name: name.clone(),
            ty: ty.clone(),
            ref_count: 1,
        });
        self.require_import(&ty);
        name
    }

    pub fn reserve_name(&mut self, ty: &str) -> String {
        let base = base_name(ty);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.taken_names.contains(&name) || JAVA_KEYWORDS.contains(&name.as_str()) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        self.taken_names.insert(name.clone());
        name
    }

    pub fn reference(&mut self, name: &str) {
        if let Some(var) = self
            .given
            .iter_mut()
            .chain(self.synthesized.iter_mut())
            .find(|v| v.name == name)
        {
            var.ref_count += 1;
        }
    }

    pub fn require_import(&mut self, ty: &str) {
        let ty = self.catalog.canonical_name(ty);
        let base = ty.split('<').next().unwrap_or(&ty).trim_end_matches("[]");
        if needs_import(base) {
            self.imports.insert(base.to_string());
        }
    }

    pub fn imports(&self) -> Vec<String> {
        self.imports.iter().cloned().collect()
    }

    pub fn record_exception_thrown(&mut self, ty: &str) {
        let ty = self.catalog.canonical_name(ty);
        *self.exceptions.entry(ty).or_insert(0) += 1;
    }

    pub fn record_exception_caught(&mut self, ty: &str) {
        let ty = self.catalog.canonical_name(ty);
        let remaining = match self.exceptions.get_mut(&ty) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            self.exceptions.remove(&ty);
        }
    }

    pub fn exception_counts(&self) -> BTreeMap<String, usize> {
        self.exceptions.clone()
    }

    pub fn outstanding_exceptions(&self) -> Vec<String> {
        self.exceptions
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(ty, _)| ty.clone())
            .collect()
    }

    pub fn snapshot_scope(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            given: self.given.clone(),
            synthesized: self.synthesized.clone(),
        }
    }

    /// Forget variables and usage bumps made since `snapshot`. The exception
    /// ledger and imports are not part of a scope and stay as they are.
    pub fn restore_scope(&mut self, snapshot: ScopeSnapshot) {
        self.given = snapshot.given;
        self.synthesized = snapshot.synthesized;
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            scope: self.snapshot_scope(),
            exceptions: self.exceptions.clone(),
            imports: self.imports.clone(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.restore_scope(checkpoint.scope);
        self.exceptions = checkpoint.exceptions;
        self.imports = checkpoint.imports;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::jdk;

    #[test]
    fn names_from_capitals() {
        assert_eq!(base_name("java.io.BufferedReader"), "br");
        assert_eq!(base_name("java.lang.String"), "s");
        assert_eq!(base_name("int"), "i");
        assert_eq!(base_name("boolean"), "b");
        assert_eq!(base_name("foo"), "f");
    }

    #[test]
    fn fresh_names_are_disambiguated() {
        let cat = jdk();
        let hole = Hole::new(&[("s", "java.lang.String")]);
        let mut env = Environment::new(&cat, &hole);
        assert_eq!(env.add_variable("java.lang.String"), "s1");
        assert_eq!(env.add_variable("java.lang.String"), "s2");
        // `do` is a keyword
        assert_eq!(env.reserve_name("DataOutput"), "do1");
        assert_eq!(env.declared_variables().len(), 2);
    }

    #[test]
    fn reuse_prefers_least_used() {
        let cat = jdk();
        let hole = Hole::new(&[("a", "String"), ("b", "String")]);
        let mut env = Environment::new(&cat, &hole);
        assert_eq!(env.search_or_add_variable("java.lang.String", true), "a");
        assert_eq!(env.search_or_add_variable("java.lang.String", true), "b");
        assert_eq!(env.search_or_add_variable("java.lang.String", true), "a");
        // subtypes are assignable
        assert_eq!(env.search_or_add_variable("java.lang.CharSequence", true), "b");
        // no reuse means a new variable even when one fits
        assert_eq!(env.search_or_add_variable("java.lang.String", false), "s");
        assert!(env.imports().is_empty());
    }

    #[test]
    fn fresh_reference_types_become_imports() {
        let cat = jdk();
        let mut env = Environment::new(&cat, &Hole::default());
        env.add_variable("BufferedReader");
        env.add_variable("int");
        assert_eq!(env.imports(), vec!["java.io.BufferedReader"]);
    }

    #[test]
    fn ledger_counts() {
        let cat = jdk();
        let mut env = Environment::new(&cat, &Hole::default());
        env.record_exception_thrown("java.io.IOException");
        env.record_exception_thrown("IOException");
        env.record_exception_caught("java.io.IOException");
        assert_eq!(env.outstanding_exceptions(), vec!["java.io.IOException"]);
        env.record_exception_caught("java.io.IOException");
        assert!(env.outstanding_exceptions().is_empty());
    }

    #[test]
    fn scope_snapshots_do_not_touch_the_ledger() {
        let cat = jdk();
        let mut env = Environment::new(&cat, &Hole::default());
        let snapshot = env.snapshot_scope();
        env.add_variable("java.io.File");
        env.record_exception_thrown("java.io.IOException");
        env.restore_scope(snapshot);
        assert_eq!(env.variables().count(), 0);
        assert_eq!(env.declared_variables().len(), 1);
        assert_eq!(env.outstanding_exceptions(), vec!["java.io.IOException"]);
        assert_eq!(env.imports(), vec!["java.io.File"]);
    }
}
