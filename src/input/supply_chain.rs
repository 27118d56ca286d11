//! Code for reading the supply chain flow graph.
use super::{ReferenceSource, input_err_msg};
use crate::graph::{FlowEdge, FlowGraph, FlowNode, MaterialID, RegionID, SupplyChain};
use crate::id::IDCollection;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use serde::Deserialize;

const SUPPLY_CHAIN_FILE_NAME: &str = "supply_chain.toml";

/// A node as it appears in the reference file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct FlowNodeRaw {
    name: String,
    region: Option<String>,
    #[serde(default)]
    materials: Vec<String>,
}

/// A link between two nodes, which are referred to by their position in the node list
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct FlowLinkRaw {
    source: usize,
    target: usize,
    value: f64,
}

/// The contents of the supply chain reference file
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct SupplyChainRaw {
    regions: Vec<String>,
    materials: Vec<String>,
    nodes: Vec<FlowNodeRaw>,
    #[serde(default)]
    links: Vec<FlowLinkRaw>,
}

/// Read the supply chain flow graph
pub fn read_supply_chain(source: &ReferenceSource) -> Result<SupplyChain> {
    let raw: SupplyChainRaw = source.read(SUPPLY_CHAIN_FILE_NAME)?;
    build_supply_chain(raw).with_context(|| input_err_msg(SUPPLY_CHAIN_FILE_NAME))
}

/// Collect IDs into a set, checking for duplicates
fn unique_ids<T: From<String> + Eq + std::hash::Hash>(
    ids: Vec<String>,
    what: &str,
) -> Result<IndexSet<T>> {
    let duplicates = ids.iter().duplicates().join(", ");
    ensure!(duplicates.is_empty(), "Duplicate {what} IDs: {duplicates}");

    Ok(ids.into_iter().map(T::from).collect())
}

fn build_supply_chain(raw: SupplyChainRaw) -> Result<SupplyChain> {
    let regions: IndexSet<RegionID> = unique_ids(raw.regions, "region")?;
    let materials: IndexSet<MaterialID> = unique_ids(raw.materials, "material")?;

    let mut graph = FlowGraph::new();
    for node in raw.nodes {
        let region = node
            .region
            .map(|region| regions.get_id_by_str(&region))
            .transpose()
            .with_context(|| format!("Invalid region for node {}", node.name))?;
        let node_materials = node
            .materials
            .iter()
            .map(|material| materials.get_id_by_str(material))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid material for node {}", node.name))?;

        graph.add_node(FlowNode {
            name: node.name,
            region,
            materials: node_materials,
        });
    }

    let node_count = graph.node_count();
    for link in raw.links {
        ensure!(
            link.source < node_count && link.target < node_count,
            "Link from {} to {} refers to a node which does not exist (there are {node_count} nodes)",
            link.source,
            link.target
        );
        ensure!(
            link.value.is_finite() && link.value > 0.0,
            "Link from {} to {} must have a positive value",
            link.source,
            link.target
        );
        graph.add_edge(
            NodeIndex::new(link.source),
            NodeIndex::new(link.target),
            FlowEdge { value: link.value },
        );
    }

    Ok(SupplyChain {
        regions,
        materials,
        graph,
    })
}
