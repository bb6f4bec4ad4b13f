//! File-based node/edge editing for flow documents.

use anyhow::{bail, Context, Result};
use catwalk_core::{schema::validate_flow, EdgeSpec, FlowDocument, NodeSpec, Position};
use std::path::Path;

/// Load a flow file, running structural validation before typed parsing.
pub fn load_flow(path: &Path) -> Result<FlowDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    let raw: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in '{}'", path.display()))?;
    validate_flow(&raw)?;
    Ok(serde_json::from_value(raw)?)
}

/// Save a flow file, re-validating so an edit can never write a document
/// the loader would reject.
pub fn save_flow(path: &Path, flow: &FlowDocument) -> Result<()> {
    let raw = serde_json::to_value(flow)?;
    validate_flow(&raw)?;
    std::fs::write(path, serde_json::to_string_pretty(&raw)?)?;
    println!("✅ Workflow saved to '{}'", path.display());
    Ok(())
}

pub struct NodeFields {
    pub node_type: Option<String>,
    pub name: Option<String>,
    pub func: Option<String>,
    pub position: Option<String>,
    pub data: Option<String>,
}

fn parse_position(text: &str) -> Result<Position> {
    serde_json::from_str(text).context("invalid JSON in position argument")
}

fn parse_data(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).context("invalid JSON in data argument")
}

pub fn node_add(
    file: &Path,
    id: &str,
    node_type: &str,
    name: &str,
    func: Option<String>,
    position: Option<&str>,
    data: Option<&str>,
) -> Result<()> {
    let mut flow = load_flow(file)?;

    if flow.find_node(id).is_some() {
        bail!("node with ID '{id}' already exists");
    }

    let mut node = NodeSpec::new(id, node_type, name);
    node.func = func;
    if let Some(position) = position {
        node.position = Some(parse_position(position)?);
    }
    if let Some(data) = data {
        node.data = Some(parse_data(data)?);
    }

    flow.add_node(node);
    save_flow(file, &flow)?;
    println!("✅ Added node '{id}' of type '{node_type}'");
    Ok(())
}

pub fn node_update(file: &Path, id: &str, fields: NodeFields) -> Result<()> {
    let mut flow = load_flow(file)?;

    let position = fields
        .position
        .as_deref()
        .map(parse_position)
        .transpose()?;
    let data = fields.data.as_deref().map(parse_data).transpose()?;

    let node = flow
        .find_node_mut(id)
        .with_context(|| format!("node '{id}' not found"))?;
    if let Some(node_type) = fields.node_type {
        node.node_type = node_type;
    }
    if let Some(name) = fields.name {
        node.name = name;
    }
    if let Some(func) = fields.func {
        node.func = Some(func);
    }
    if position.is_some() {
        node.position = position;
    }
    if data.is_some() {
        node.data = data;
    }

    save_flow(file, &flow)?;
    println!("✅ Updated node '{id}'");
    Ok(())
}

pub fn node_remove(file: &Path, id: &str, cascade: bool) -> Result<()> {
    let mut flow = load_flow(file)?;

    let (removed, removed_edges) = flow.remove_node(id, cascade);
    if !removed {
        bail!("node '{id}' not found");
    }
    if removed_edges > 0 {
        println!("✅ Also removed {removed_edges} connected edge(s)");
    }

    save_flow(file, &flow)?;
    println!("✅ Removed node '{id}'");
    Ok(())
}

pub fn node_list(file: &Path, type_filter: Option<&str>, format: &str) -> Result<()> {
    let flow = load_flow(file)?;

    let nodes: Vec<&NodeSpec> = flow
        .nodes
        .iter()
        .filter(|n| type_filter.map_or(true, |t| n.node_type == t))
        .collect();

    if nodes.is_empty() {
        println!("No nodes found");
        return Ok(());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&nodes)?),
        "table" => {
            println!("{:<15} {:<12} {:<20} {:<30}", "ID", "Type", "Name", "Function");
            println!("{}", "-".repeat(80));
            for node in nodes {
                let func = node.func.as_deref().unwrap_or("");
                let preview = if func.len() > 30 {
                    format!("{}...", &func[..27])
                } else {
                    func.to_string()
                };
                println!(
                    "{:<15} {:<12} {:<20} {:<30}",
                    node.id, node.node_type, node.name, preview
                );
            }
        }
        _ => {
            for node in nodes {
                println!("• {} ({}): {}", node.id, node.node_type, node.name);
            }
        }
    }
    Ok(())
}

pub fn edge_add(
    file: &Path,
    source: &str,
    target: &str,
    id: Option<String>,
    style: Option<&str>,
    animated: bool,
) -> Result<()> {
    let mut flow = load_flow(file)?;

    if flow.find_node(source).is_none() {
        bail!("source node '{source}' not found");
    }
    if flow.find_node(target).is_none() {
        bail!("target node '{target}' not found");
    }

    let mut edge = EdgeSpec::between(source, target);
    edge.id = id;
    if let Some(style) = style {
        edge.style =
            Some(serde_json::from_str(style).context("invalid JSON in style argument")?);
    }
    if animated {
        edge.animated = Some(true);
    }

    flow.add_edge(edge);
    save_flow(file, &flow)?;
    println!("✅ Added edge from '{source}' to '{target}'");
    Ok(())
}

pub fn edge_remove(
    file: &Path,
    id: Option<&str>,
    source: Option<&str>,
    target: Option<&str>,
) -> Result<()> {
    let mut flow = load_flow(file)?;

    let removed = match (id, source, target) {
        (Some(id), _, _) => flow.remove_edge_by_id(id),
        (None, Some(source), Some(target)) => flow.remove_edges_between(source, target),
        _ => bail!("must specify either --id or both --source and --target"),
    };

    if removed == 0 {
        bail!("no matching edge found");
    }

    save_flow(file, &flow)?;
    println!("✅ Removed {removed} edge(s)");
    Ok(())
}

pub fn edge_list(file: &Path, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let flow = load_flow(file)?;

    let edges: Vec<&EdgeSpec> = flow
        .edges
        .iter()
        .filter(|e| from.map_or(true, |f| e.source_id() == Some(f)))
        .filter(|e| to.map_or(true, |t| e.target_id() == Some(t)))
        .collect();

    if edges.is_empty() {
        println!("No edges found");
        return Ok(());
    }

    for edge in edges {
        let id_part = edge
            .id
            .as_deref()
            .map(|id| format!(" ({id})"))
            .unwrap_or_default();
        println!("• {}{}", edge.descriptor(), id_part);
    }
    Ok(())
}
