//! Query argument grammar.
//!
//! A query is a list of flag groups, each flag followed by its values:
//!
//! ```text
//! --vertex a b c                 declare vertices (the first declared is the seed vertex)
//! --edge x:a:b                   direct edge named x from a to b
//! --path p:a:c                   edge named p realised by a multi-hop path
//! --vertexlabel a:cyan           label constraint
//! --vertexprop a:color:red       property constraint
//! --edgelabel x:knows            label required on edge x
//! --condition "a.age > b.age"    predicate over the finished match
//! --directed                     directed pattern
//! --graph name                   accepted for compatibility, unused
//! --groupby/--orderby/--aggregate recorded, unused by matching
//! ```

use std::collections::BTreeMap;

use crate::{
    condition::ConditionExpr,
    errors::GrayMatchError,
    graph::{AttributedGraph, EdgeAttrs, EdgeKind, VertexAttrs},
    pattern::Pattern,
};

#[derive(Clone, Debug)]
pub struct ParsedQuery {
    pub pattern: Pattern,
    pub condition: Option<ConditionExpr>,
    pub directed: bool,
    pub groupby: Vec<String>,
    pub orderby: Vec<String>,
    pub aggregates: Vec<String>,
}

struct EdgeDecl {
    source: String,
    target: String,
    kind: EdgeKind,
    label: Option<String>,
}

/// Splits a query string on whitespace, keeping quoted segments together.
pub fn split_args(input: &str) -> Result<Vec<String>, GrayMatchError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut pending = false;
    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                pending = true;
            }
            None if c.is_whitespace() => {
                if pending || !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            None => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(GrayMatchError::query_parse("unterminated quote in query"));
    }
    if pending || !current.is_empty() {
        args.push(current);
    }
    Ok(args)
}

pub fn parse_query_str(input: &str) -> Result<ParsedQuery, GrayMatchError> {
    parse_query_args(&split_args(input)?)
}

pub fn parse_query_args<S: AsRef<str>>(args: &[S]) -> Result<ParsedQuery, GrayMatchError> {
    let mut vertices: Vec<String> = Vec::new();
    let mut labels: BTreeMap<String, String> = BTreeMap::new();
    let mut props: Vec<(String, String, String)> = Vec::new();
    let mut edge_names: Vec<String> = Vec::new();
    let mut edges: BTreeMap<String, EdgeDecl> = BTreeMap::new();
    let mut edge_labels: Vec<(String, String)> = Vec::new();
    let mut condition = None;
    let mut directed = false;
    let mut groupby = Vec::new();
    let mut orderby = Vec::new();
    let mut aggregates = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_ref();
        let values: Vec<&str> = args[i + 1..]
            .iter()
            .map(|v| v.as_ref())
            .take_while(|v| !v.starts_with("--"))
            .collect();
        i += 1 + values.len();
        match flag {
            "--vertex" => {
                for name in values {
                    if !vertices.iter().any(|v| v == name) {
                        vertices.push(name.to_string());
                    }
                }
            }
            "--edge" | "--path" => {
                let kind = if flag == "--path" {
                    EdgeKind::Path
                } else {
                    EdgeKind::Direct
                };
                for value in values {
                    let [name, source, target] = split_fields::<3>(flag, value)?;
                    if edges.contains_key(name) {
                        return Err(GrayMatchError::query_parse(format!(
                            "edge '{name}' declared twice"
                        )));
                    }
                    edge_names.push(name.to_string());
                    edges.insert(
                        name.to_string(),
                        EdgeDecl {
                            source: source.to_string(),
                            target: target.to_string(),
                            kind,
                            label: None,
                        },
                    );
                }
            }
            "--vertexlabel" => {
                for value in values {
                    let [name, label] = split_fields::<2>(flag, value)?;
                    labels.insert(name.to_string(), label.to_string());
                }
            }
            "--vertexprop" => {
                for value in values {
                    let [name, key, prop] = split_fields::<3>(flag, value)?;
                    props.push((name.to_string(), key.to_string(), prop.to_string()));
                }
            }
            "--edgelabel" => {
                for value in values {
                    let [name, label] = split_fields::<2>(flag, value)?;
                    edge_labels.push((name.to_string(), label.to_string()));
                }
            }
            "--condition" => {
                if values.is_empty() {
                    return Err(GrayMatchError::query_parse("--condition needs an expression"));
                }
                condition = Some(ConditionExpr::parse(&values.join(" "))?);
            }
            "--directed" => {
                if !values.is_empty() {
                    return Err(GrayMatchError::query_parse("--directed takes no values"));
                }
                directed = true;
            }
            "--graph" => {}
            "--groupby" => groupby.extend(values.iter().map(|v| v.to_string())),
            "--orderby" => orderby.extend(values.iter().map(|v| v.to_string())),
            "--aggregate" => aggregates.extend(values.iter().map(|v| v.to_string())),
            other => {
                return Err(GrayMatchError::query_parse(format!(
                    "unknown query argument '{other}'"
                )));
            }
        }
    }

    for (name, label) in edge_labels {
        let edge = edges.get_mut(&name).ok_or_else(|| {
            GrayMatchError::query_parse(format!("label given for unknown edge '{name}'"))
        })?;
        edge.label = Some(label);
    }

    let known = |name: &str| vertices.iter().any(|v| v == name);
    for name in labels.keys().chain(props.iter().map(|(n, _, _)| n)) {
        if !known(name.as_str()) {
            return Err(GrayMatchError::query_parse(format!("unknown vertex '{name}'")));
        }
    }

    let mut graph: AttributedGraph<String> = AttributedGraph::new(directed);
    for name in &vertices {
        let mut attrs = match labels.get(name) {
            Some(label) => VertexAttrs::labeled(label),
            None => VertexAttrs::default(),
        };
        for (_, key, value) in props.iter().filter(|(n, _, _)| n == name) {
            attrs = attrs.prop(key, value);
        }
        graph.add_vertex(name.clone(), attrs);
    }
    for name in &edge_names {
        let Some(edge) = edges.get(name) else {
            continue;
        };
        for endpoint in [&edge.source, &edge.target] {
            if !known(endpoint.as_str()) {
                return Err(GrayMatchError::query_parse(format!(
                    "edge '{name}' refers to unknown vertex '{endpoint}'"
                )));
            }
        }
        let mut attrs = EdgeAttrs {
            kind: edge.kind,
            ..EdgeAttrs::default()
        };
        if let Some(label) = &edge.label {
            attrs = attrs.with_label(label);
        }
        graph.add_edge(edge.source.clone(), edge.target.clone(), attrs);
    }

    if let Some(expr) = &condition {
        if let Some(symbol) = expr.symbols().into_iter().find(|s| !known(*s)) {
            return Err(GrayMatchError::query_parse(format!(
                "condition refers to unknown vertex '{symbol}'"
            )));
        }
    }

    let pattern = Pattern::new(&graph).map_err(|e| GrayMatchError::query_parse(e.to_string()))?;
    Ok(ParsedQuery {
        pattern,
        condition,
        directed,
        groupby,
        orderby,
        aggregates,
    })
}

fn split_fields<'a, const N: usize>(
    flag: &str,
    value: &'a str,
) -> Result<[&'a str; N], GrayMatchError> {
    let fields: Vec<&str> = value.split(':').collect();
    <[&str; N]>::try_from(fields)
        .ok()
        .filter(|parts| parts.iter().all(|p| !p.is_empty()))
        .ok_or_else(|| {
            GrayMatchError::query_parse(format!(
                "{flag} expects {N} ':'-separated fields, got '{value}'"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_keeps_quotes() {
        let args = split_args("--vertex a b --condition \"a.x == 'y z'\"").unwrap();
        assert_eq!(args, vec!["--vertex", "a", "b", "--condition", "a.x == 'y z'"]);
        assert!(split_args("--condition \"open").is_err());
    }

    #[test]
    fn field_arity_checked() {
        assert!(split_fields::<3>("--edge", "x:a").is_err());
        assert!(split_fields::<2>("--edgelabel", "x:").is_err());
        assert_eq!(split_fields::<2>("--vertexlabel", "a:cyan").unwrap(), ["a", "cyan"]);
    }
}
