use core::fmt;
use std::fmt::Debug;

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
pub enum CallKind {
    Constructor,
    Method,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallKind::Constructor => write!(f, "constructor"),
            CallKind::Method => write!(f, "method"),
        }
    }
}

impl Debug for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A call site identity: `declaringType.member(paramType1,paramType2)`.
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Signature {
    pub declaring_type: String,
    pub member: String,
    pub params: Vec<String>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}({})", self.declaring_type, self.member, self.params.join(","))
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Signature {
    /// Constructors are named after the simple name of their declaring type.
    pub fn kind(&self) -> CallKind {
        if self.member == simple_name(&self.declaring_type) {
            CallKind::Constructor
        } else {
            CallKind::Method
        }
    }
}

/// Declaration metadata of a constructor or method, as the catalog reports it.
#[derive(PartialEq, Eq, Clone)]
pub struct CallMetadata {
    pub kind: CallKind,
    pub declaring_type: String,
    pub name: String,
    pub params: Vec<String>,
    // None for constructors and void methods
    pub return_type: Option<String>,
    pub exceptions: Vec<String>,
    pub is_static: bool,
}

impl fmt::Display for CallMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}({})", self.declaring_type, self.name, self.params.join(","))?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        if !self.exceptions.is_empty() {
            write!(f, " throws {}", self.exceptions.join(","))?;
        }
        Ok(())
    }
}

impl Debug for CallMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl CallMetadata {
    /// The type of value this call yields, if any.
    pub fn produced_type(&self) -> Option<&str> {
        match self.kind {
            CallKind::Constructor => Some(&self.declaring_type),
            CallKind::Method => self.return_type.as_deref(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A declared parameter of the hole being filled.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub ty: String,
}

/// The procedure body nominated for replacement.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Hole {
    pub parameters: Vec<Parameter>,
}

impl Hole {
    pub fn new(parameters: &[(&str, &str)]) -> Self {
        Hole {
            parameters: parameters
                .iter()
                .map(|(name, ty)| Parameter {
                    name: name.to_string(),
                    ty: ty.to_string(),
                })
                .collect(),
        }
    }
}

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

pub fn is_primitive(ty: &str) -> bool {
    PRIMITIVES.contains(&ty)
}

pub fn is_numeric_primitive(ty: &str) -> bool {
    is_primitive(ty) && ty != "boolean" && ty != "void"
}

/// The last dotted segment, without generic arguments or array suffixes.
pub fn simple_name(ty: &str) -> &str {
    let ty = ty.split('<').next().unwrap_or(ty);
    let ty = ty.trim_end_matches("[]");
    ty.rsplit('.').next().unwrap_or(ty)
}

/// Types that never need an import: primitives, unqualified names, `java.lang`.
pub fn needs_import(ty: &str) -> bool {
    let ty = ty.split('<').next().unwrap_or(ty).trim_end_matches("[]");
    if is_primitive(ty) || !ty.contains('.') {
        return false;
    }
    match ty.strip_prefix("java.lang.") {
        Some(rest) => rest.contains('.'),
        None => true,
    }
}

/// The value a hoisted declaration of `ty` starts with.
pub fn default_value(ty: &str) -> &'static str {
    match ty {
        "boolean" => "false",
        "char" => "'\\0'",
        "long" => "0L",
        "float" => "0f",
        "double" => "0d",
        t if is_primitive(t) => "0",
        _ => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_kind_follows_simple_name() {
        let sig = Signature {
            declaring_type: "java.io.FileReader".into(),
            member: "FileReader".into(),
            params: vec!["java.lang.String".into()],
        };
        assert_eq!(sig.kind(), CallKind::Constructor);
        assert_eq!(sig.to_string(), "java.io.FileReader.FileReader(java.lang.String)");

        let sig = Signature {
            declaring_type: "BufferedReader".into(),
            member: "readLine".into(),
            params: vec![],
        };
        assert_eq!(sig.kind(), CallKind::Method);
    }

    #[test]
    fn import_rules() {
        assert!(needs_import("java.io.BufferedReader"));
        assert!(needs_import("java.lang.reflect.Method"));
        assert!(!needs_import("java.lang.String"));
        assert!(!needs_import("int"));
        assert!(!needs_import("String"));
        assert!(needs_import("java.util.List<java.lang.String>"));
    }

    #[test]
    fn simple_names() {
        assert_eq!(simple_name("java.io.BufferedReader"), "BufferedReader");
        assert_eq!(simple_name("java.lang.String[]"), "String");
        assert_eq!(simple_name("int"), "int");
    }
}
