use crate::error::{SynthesisFailure, SynthesisResult};
use crate::graph::{ClassHierarchy, TypeDecl, TypeKind};
use crate::schema::{CallKind, CallMetadata, Hole, Parameter, Signature};
use crate::sketches::{ApiCall, SketchNode};
use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, tuple},
    IResult,
};
use std::{error::Error, fs::File, io::BufReader};

use serde_json::Value;

pub fn json_from_file(json_path: &str) -> Result<Value, Box<dyn Error>> {
    let file = File::open(json_path)?;
    let reader = BufReader::new(file);
    let val: Value = serde_json::from_reader(reader)?;
    Ok(val)
}

// this is a rust parser for call signatures:
// signature = QualifiedName '(' (Type (',' Type)*)? ')'
// QualifiedName = Identifier ('.' Identifier)*   (last segment is the member)
// Type = QualifiedName ('<' Type (',' Type)* '>')? ('[]')*

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_char)))(input)
}

fn parse_qualified_name(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('.'), parse_identifier)(input)
}

fn parse_comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

pub(crate) fn parse_type(input: &str) -> IResult<&str, String> {
    map(
        recognize(tuple((
            parse_qualified_name,
            opt(delimited(
                char('<'),
                separated_list1(parse_comma, parse_type),
                char('>'),
            )),
            many0(tag("[]")),
        ))),
        |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect(),
    )(input)
}

fn parse_signature(input: &str) -> IResult<&str, (Vec<&str>, Vec<String>)> {
    pair(
        parse_qualified_name,
        delimited(
            pair(char('('), multispace0),
            separated_list0(parse_comma, parse_type),
            pair(multispace0, char(')')),
        ),
    )(input)
}

/// Parse `declaringType.member(paramType1,paramType2)`.
pub fn parse_signature_str(call: &str) -> SynthesisResult<Signature> {
    let malformed = || SynthesisFailure::MalformedSketch(format!("cannot parse call signature `{}`", call));
    let (_, (mut path, params)) =
        all_consuming(parse_signature)(call.trim()).map_err(|_| malformed())?;
    if path.len() < 2 {
        return Err(malformed());
    }
    let member = path.pop().ok_or_else(malformed)?;
    Ok(Signature {
        declaring_type: path.join("."),
        member: member.to_string(),
        params,
    })
}

fn field<'v>(val: &'v Value, name: &str, node: &str) -> SynthesisResult<&'v Vec<Value>> {
    val[name].as_array().ok_or_else(|| {
        SynthesisFailure::MalformedSketch(format!("{} node is missing array field `{}`", node, name))
    })
}

fn nodes_from_json(values: &[Value]) -> SynthesisResult<Vec<SketchNode>> {
    values.iter().map(sketch_from_json).collect()
}

fn calls_from_json(values: &[Value]) -> SynthesisResult<Vec<ApiCall>> {
    values
        .iter()
        .map(|v| match sketch_from_json(v)? {
            SketchNode::ApiCall(call) => Ok(call),
            other => Err(SynthesisFailure::MalformedSketch(format!(
                "condition holds a non-call node: {:?}",
                other
            ))),
        })
        .collect()
}

/// Build a sketch tree from the predictor's JSON output.
pub fn sketch_from_json(val: &Value) -> SynthesisResult<SketchNode> {
    let node = val["node"]
        .as_str()
        .ok_or_else(|| SynthesisFailure::MalformedSketch("missing `node` discriminator".into()))?;
    match node {
        "APICall" => {
            let call = val["_call"].as_str().ok_or_else(|| {
                SynthesisFailure::MalformedSketch("APICall node is missing `_call`".into())
            })?;
            SketchNode::call(call)
        }
        "Block" => Ok(SketchNode::Block(nodes_from_json(field(val, "_nodes", node)?)?)),
        "Branch" => Ok(SketchNode::Branch {
            cond: calls_from_json(field(val, "_cond", node)?)?,
            then_body: nodes_from_json(field(val, "_then", node)?)?,
            else_body: nodes_from_json(field(val, "_else", node)?)?,
        }),
        "Loop" => Ok(SketchNode::Loop {
            cond: calls_from_json(field(val, "_cond", node)?)?,
            body: nodes_from_json(field(val, "_body", node)?)?,
        }),
        "Except" => Ok(SketchNode::ExceptionHandler {
            try_body: nodes_from_json(field(val, "_try", node)?)?,
            catch_body: nodes_from_json(field(val, "_catch", node)?)?,
        }),
        other => Err(SynthesisFailure::MalformedSketch(format!(
            "unknown node kind `{}`",
            other
        ))),
    }
}

/// The parameters of the hole, `{"parameters": [{"name": .., "type": ..}]}`.
pub fn hole_from_json(val: &Value) -> SynthesisResult<Hole> {
    let mut parameters = Vec::new();
    if let Some(params) = val["parameters"].as_array() {
        for p in params {
            match (p["name"].as_str(), p["type"].as_str()) {
                (Some(name), Some(ty)) => parameters.push(Parameter {
                    name: name.to_string(),
                    ty: ty.to_string(),
                }),
                _ => {
                    return Err(SynthesisFailure::MalformedSketch(format!(
                        "hole parameter needs `name` and `type`: {}",
                        p
                    )))
                }
            }
        }
    }
    Ok(Hole { parameters })
}

/// Candidate sketches of a query: either a bare array, a single node, or
/// the `sketches` field of a query document.
pub fn candidates_from_json(val: &Value) -> Vec<Value> {
    if let Some(list) = val["sketches"].as_array() {
        list.clone()
    } else if let Some(list) = val.as_array() {
        list.clone()
    } else {
        vec![val.clone()]
    }
}

fn strings(val: &Value, name: &str) -> Vec<String> {
    val[name]
        .as_array()
        .map(|a| a.iter().filter_map(|s| s.as_str()).map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn invalid(msg: String) -> SynthesisFailure {
    SynthesisFailure::InvalidCatalog(msg)
}

fn check_types(types: &[String]) -> SynthesisResult<()> {
    for ty in types {
        all_consuming(parse_type)(ty.as_str()).map_err(|_| invalid(format!("bad type name `{}`", ty)))?;
    }
    Ok(())
}

/// Load a type catalog: `{"types": [{"name", "kind", "supertypes", ...}]}`.
pub fn catalog_from_json(val: &Value) -> SynthesisResult<ClassHierarchy> {
    let types = val["types"]
        .as_array()
        .ok_or_else(|| invalid("missing `types` array".into()))?;
    let mut hierarchy = ClassHierarchy::new();
    for t in types {
        let name = t["name"]
            .as_str()
            .ok_or_else(|| invalid(format!("type without a name: {}", t)))?
            .to_string();
        let kind = match t["kind"].as_str().unwrap_or("class") {
            "class" => TypeKind::Class,
            "abstract" => TypeKind::Abstract,
            "interface" => TypeKind::Interface,
            other => return Err(invalid(format!("unknown kind `{}` for {}", other, name))),
        };
        let supertypes = strings(t, "supertypes");
        check_types(&supertypes)?;

        let mut constructors = Vec::new();
        for c in t["constructors"].as_array().into_iter().flatten() {
            let params = strings(c, "params");
            check_types(&params)?;
            constructors.push(CallMetadata {
                kind: CallKind::Constructor,
                declaring_type: name.clone(),
                name: crate::schema::simple_name(&name).to_string(),
                params,
                return_type: None,
                exceptions: strings(c, "throws"),
                is_static: false,
            });
        }

        let mut methods = Vec::new();
        for m in t["methods"].as_array().into_iter().flatten() {
            let method_name = m["name"]
                .as_str()
                .ok_or_else(|| invalid(format!("method without a name in {}", name)))?;
            let params = strings(m, "params");
            check_types(&params)?;
            let return_type = m["returns"]
                .as_str()
                .filter(|r| *r != "void")
                .map(|r| r.to_string());
            methods.push(CallMetadata {
                kind: CallKind::Method,
                declaring_type: name.clone(),
                name: method_name.to_string(),
                params,
                return_type,
                exceptions: strings(m, "throws"),
                is_static: m["static"].as_bool().unwrap_or(false),
            });
        }

        hierarchy.add_type(TypeDecl {
            name,
            kind,
            supertypes,
            functional: t["functional"].as_bool().unwrap_or(false),
            constructors,
            methods,
        });
    }
    Ok(hierarchy)
}
