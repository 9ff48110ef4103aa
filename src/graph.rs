use std::{
    collections::{HashMap, HashSet},
    env,
    fs::File,
    io::Write,
};

use petgraph::{
    algo::{has_path_connecting, toposort},
    dot::Dot,
    graph::{DiGraph, NodeIndex},
    visit::{Bfs, Reversed},
};

use crate::schema::{is_primitive, simple_name, CallKind, CallMetadata, Signature};

/// Declaration metadata of public, accessible members.
pub trait TypeCatalog {
    fn canonical_name(&self, ty: &str) -> String;

    fn resolve(&self, signature: &Signature) -> Option<CallMetadata>;

    /// Constructors that produce a value assignable to `ty`: its own, then
    /// those of its concrete subtypes.
    fn list_constructors(&self, ty: &str) -> Vec<CallMetadata>;

    fn list_instance_methods(&self, ty: &str) -> Vec<CallMetadata>;

    fn is_assignable(&self, from: &str, to: &str) -> bool;

    /// The single abstract method of a functional interface.
    fn functional_method(&self, ty: &str) -> Option<CallMetadata>;
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TypeKind {
    Class,
    Abstract,
    Interface,
}

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub supertypes: Vec<String>,
    pub functional: bool,
    pub constructors: Vec<CallMetadata>,
    pub methods: Vec<CallMetadata>,
}

const OBJECT: &str = "java.lang.Object";

/// In-memory catalog backed by the subtype graph; an edge runs from a type
/// to each of its direct supertypes.
pub struct ClassHierarchy {
    pub graph: DiGraph<String, ()>,
    pub graph_node_map: HashMap<String, NodeIndex>,
    simple_names: HashMap<String, String>,
    decls: HashMap<String, TypeDecl>,
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassHierarchy {
    pub fn new() -> Self {
        ClassHierarchy {
            graph: DiGraph::new(),
            graph_node_map: HashMap::new(),
            simple_names: HashMap::new(),
            decls: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.graph_node_map.get(name) {
            return *index;
        }
        let node_index = self.graph.add_node(name.to_string());
        self.graph_node_map.insert(name.to_string(), node_index);
        self.simple_names
            .entry(simple_name(name).to_string())
            .or_insert_with(|| name.to_string());
        node_index
    }

    pub fn add_type(&mut self, decl: TypeDecl) {
        let node = self.add_node(&decl.name);
        for sup in &decl.supertypes {
            let sup_node = self.add_node(sup);
            if node != sup_node && self.graph.find_edge(node, sup_node).is_none() {
                self.graph.add_edge(node, sup_node, ());
            }
        }
        log::debug!(
            "catalog: {} with {} constructors, {} methods",
            decl.name,
            decl.constructors.len(),
            decl.methods.len()
        );
        self.decls.insert(decl.name.clone(), decl);
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Write the hierarchy as dot to `$DEBUG_TYPE_GRAPH`, if set.
    pub fn dump_graph(&self) {
        if let Ok(path) = env::var("DEBUG_TYPE_GRAPH") {
            match File::create(&path) {
                Ok(mut file) => {
                    if let Err(e) = write!(file, "{:?}", Dot::new(&self.graph)) {
                        log::warn!("cannot write type graph to {}: {}", path, e);
                    }
                }
                Err(e) => log::warn!("cannot create {}: {}", path, e),
            }
        }
    }

    fn decl(&self, ty: &str) -> Option<&TypeDecl> {
        self.decls.get(&self.canonical_name(ty))
    }

    fn same_params(&self, declared: &[String], wanted: &[String]) -> bool {
        declared.len() == wanted.len()
            && declared
                .iter()
                .zip(wanted)
                .all(|(d, w)| self.canonical_name(d) == self.canonical_name(w))
    }

    // nearest first
    fn lineage(&self, ty: &str) -> Vec<&TypeDecl> {
        let Some(&start) = self.graph_node_map.get(&self.canonical_name(ty)) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(nx) = bfs.next(&self.graph) {
            if let Some(decl) = self.decls.get(&self.graph[nx]) {
                out.push(decl);
            }
        }
        out
    }

    fn canonical_method(&self, m: &CallMetadata) -> CallMetadata {
        CallMetadata {
            kind: m.kind,
            declaring_type: self.canonical_name(&m.declaring_type),
            name: m.name.clone(),
            params: m.params.iter().map(|p| self.canonical_name(p)).collect(),
            return_type: m.return_type.as_ref().map(|r| self.canonical_name(r)),
            exceptions: m.exceptions.iter().map(|e| self.canonical_name(e)).collect(),
            is_static: m.is_static,
        }
    }
}

impl TypeCatalog for ClassHierarchy {
    fn canonical_name(&self, ty: &str) -> String {
        if is_primitive(ty) || self.graph_node_map.contains_key(ty) || ty.contains('.') {
            return ty.to_string();
        }
        if let Some(array) = ty.strip_suffix("[]") {
            return format!("{}[]", self.canonical_name(array));
        }
        self.simple_names
            .get(ty)
            .cloned()
            .unwrap_or_else(|| ty.to_string())
    }

    fn resolve(&self, signature: &Signature) -> Option<CallMetadata> {
        match signature.kind() {
            CallKind::Constructor => {
                let decl = self.decl(&signature.declaring_type)?;
                decl.constructors
                    .iter()
                    .find(|c| self.same_params(&c.params, &signature.params))
                    .map(|c| self.canonical_method(c))
            }
            CallKind::Method => self
                .lineage(&signature.declaring_type)
                .into_iter()
                .flat_map(|d| d.methods.iter())
                .find(|m| m.name == signature.member && self.same_params(&m.params, &signature.params))
                .map(|m| self.canonical_method(m)),
        }
    }

    fn list_constructors(&self, ty: &str) -> Vec<CallMetadata> {
        let Some(&start) = self.graph_node_map.get(&self.canonical_name(ty)) else {
            return Vec::new();
        };
        let subtypes = Reversed(&self.graph);
        let mut bfs = Bfs::new(subtypes, start);
        let mut out = Vec::new();
        while let Some(nx) = bfs.next(subtypes) {
            match self.decls.get(&self.graph[nx]) {
                Some(decl) if decl.kind == TypeKind::Class => {
                    out.extend(decl.constructors.iter().map(|c| self.canonical_method(c)))
                }
                _ => {}
            }
        }
        out
    }

    fn list_instance_methods(&self, ty: &str) -> Vec<CallMetadata> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for decl in self.lineage(ty) {
            for m in decl.methods.iter().filter(|m| !m.is_static) {
                let m = self.canonical_method(m);
                // nearest declaration wins over the ones it overrides
                if seen.insert((m.name.clone(), m.params.clone())) {
                    out.push(m);
                }
            }
        }
        out
    }

    fn is_assignable(&self, from: &str, to: &str) -> bool {
        let from = self.canonical_name(from);
        let to = self.canonical_name(to);
        if from == to {
            return true;
        }
        if is_primitive(&from) || is_primitive(&to) {
            return false;
        }
        if to == OBJECT {
            return true;
        }
        match (self.graph_node_map.get(&from), self.graph_node_map.get(&to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    fn functional_method(&self, ty: &str) -> Option<CallMetadata> {
        let decl = self.decl(ty)?;
        if !decl.functional || decl.kind != TypeKind::Interface {
            return None;
        }
        decl.methods
            .iter()
            .find(|m| !m.is_static)
            .map(|m| self.canonical_method(m))
    }
}

/// Order exception types so that every subtype precedes its supertypes.
pub fn order_subtypes_first(catalog: &dyn TypeCatalog, types: Vec<String>) -> Vec<String> {
    let mut g = DiGraph::<String, ()>::new();
    let nodes: Vec<NodeIndex> = types.iter().map(|t| g.add_node(t.clone())).collect();
    for (i, a) in types.iter().enumerate() {
        for (j, b) in types.iter().enumerate() {
            if i != j && a != b && catalog.is_assignable(a, b) {
                g.add_edge(nodes[i], nodes[j], ());
            }
        }
    }
    match toposort(&g, None) {
        Ok(order) => order.into_iter().map(|nx| g[nx].clone()).collect(),
        Err(_) => types,
    }
}
