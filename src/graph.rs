//! Module for filtering the supply chain flow graph
use crate::id::define_id_type;
use indexmap::IndexSet;
use petgraph::Directed;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::HashSet;
use std::fmt::Display;

define_id_type! {RegionID}
define_id_type! {MaterialID}

/// A directed graph of material flows between supply chain stages
pub type FlowGraph = Graph<FlowNode, FlowEdge, Directed>;

/// A stage of the supply chain (e.g. a mine or an enrichment plant)
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    /// Display name
    pub name: String,
    /// The region in which the stage is located, if it belongs to one
    pub region: Option<RegionID>,
    /// The materials handled at this stage. Empty means the stage is never filtered by material.
    pub materials: Vec<MaterialID>,
}

impl Display for FlowNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A flow of material between two stages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEdge {
    /// Amount of material flowing (arbitrary units)
    pub value: f64,
}

/// What to do with nodes which are filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Keep excluded nodes as disconnected entries so that node indices are unchanged
    #[default]
    Keep,
    /// Remove excluded nodes, renumbering the remaining nodes
    Drop,
}

/// The supply chain together with the regions and materials it is tagged with
#[derive(Debug, Clone)]
pub struct SupplyChain {
    /// All known regions
    pub regions: IndexSet<RegionID>,
    /// All known materials
    pub materials: IndexSet<MaterialID>,
    /// The flow graph
    pub graph: FlowGraph,
}

/// Whether a node should be filtered out.
///
/// A node is excluded if its region is disabled or if none of its materials is enabled.
fn is_excluded(
    node: &FlowNode,
    enabled_regions: &HashSet<RegionID>,
    enabled_materials: &HashSet<MaterialID>,
) -> bool {
    let region_disabled = node
        .region
        .as_ref()
        .is_some_and(|region| !enabled_regions.contains(region));
    let materials_disabled = !node.materials.is_empty()
        && !node
            .materials
            .iter()
            .any(|material| enabled_materials.contains(material));

    region_disabled || materials_disabled
}

/// The indices of nodes which would be filtered out
pub fn excluded_nodes(
    graph: &FlowGraph,
    enabled_regions: &HashSet<RegionID>,
    enabled_materials: &HashSet<MaterialID>,
) -> HashSet<NodeIndex> {
    graph
        .node_indices()
        .filter(|&idx| is_excluded(&graph[idx], enabled_regions, enabled_materials))
        .collect()
}

/// Filter the flow graph by region and material.
///
/// Every edge which starts or ends at an excluded node is removed. With [`OrphanPolicy::Keep`],
/// the node list is left untouched, so excluded nodes remain as disconnected entries. With
/// [`OrphanPolicy::Drop`], excluded nodes are removed as well and the remaining edges refer to the
/// renumbered nodes.
pub fn filter_flow_graph(
    graph: &FlowGraph,
    enabled_regions: &HashSet<RegionID>,
    enabled_materials: &HashSet<MaterialID>,
    policy: OrphanPolicy,
) -> FlowGraph {
    let excluded = excluded_nodes(graph, enabled_regions, enabled_materials);

    match policy {
        OrphanPolicy::Keep => {
            let mut filtered = graph.clone();
            filtered.retain_edges(|g, edge_idx| {
                g.edge_endpoints(edge_idx).is_some_and(|(source, target)| {
                    !excluded.contains(&source) && !excluded.contains(&target)
                })
            });
            filtered
        }
        OrphanPolicy::Drop => graph.filter_map(
            |idx, node| (!excluded.contains(&idx)).then(|| node.clone()),
            |_, edge| Some(*edge),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::supply_chain;
    use map_macro::hash_set;
    use petgraph::visit::EdgeRef;
    use rstest::rstest;

    fn node(name: &str, region: Option<&str>) -> FlowNode {
        FlowNode {
            name: name.into(),
            region: region.map(RegionID::new),
            materials: Vec::new(),
        }
    }

    /// Nodes A, B and C with edges A -> B -> C, where only B is in region "x"
    fn abc_graph() -> FlowGraph {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(node("A", None));
        let b = graph.add_node(node("B", Some("x")));
        let c = graph.add_node(node("C", None));
        graph.add_edge(a, b, FlowEdge { value: 10.0 });
        graph.add_edge(b, c, FlowEdge { value: 5.0 });
        graph
    }

    #[test]
    fn test_filter_removes_edges_touching_excluded_node() {
        let graph = abc_graph();
        let filtered =
            filter_flow_graph(&graph, &HashSet::new(), &HashSet::new(), OrphanPolicy::Keep);
        assert_eq!(filtered.node_count(), 3);
        assert_eq!(filtered.edge_count(), 0);
    }

    #[test]
    fn test_filter_drop_orphans() {
        let graph = abc_graph();
        let filtered =
            filter_flow_graph(&graph, &HashSet::new(), &HashSet::new(), OrphanPolicy::Drop);
        let names: Vec<_> = filtered.node_weights().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(filtered.edge_count(), 0);
    }

    #[test]
    fn test_filter_all_enabled_is_identity() {
        let graph = abc_graph();
        let regions = hash_set! {RegionID::new("x")};
        let filtered = filter_flow_graph(&graph, &regions, &HashSet::new(), OrphanPolicy::Keep);
        assert_eq!(filtered.node_count(), 3);
        assert_eq!(filtered.edge_count(), 2);
    }

    #[rstest]
    #[case(OrphanPolicy::Keep)]
    #[case(OrphanPolicy::Drop)]
    fn test_filter_supply_chain(supply_chain: SupplyChain, #[case] policy: OrphanPolicy) {
        let mut regions: HashSet<_> = supply_chain.regions.iter().cloned().collect();
        regions.remove("russia");
        let materials: HashSet<_> = supply_chain.materials.iter().cloned().collect();

        let graph = &supply_chain.graph;
        let excluded = excluded_nodes(graph, &regions, &materials);
        let filtered = filter_flow_graph(graph, &regions, &materials, policy);
        assert!(filtered.edge_count() <= graph.edge_count());
        match policy {
            OrphanPolicy::Keep => {
                assert_eq!(filtered.node_count(), graph.node_count());
                for edge in filtered.edge_references() {
                    assert!(!excluded.contains(&edge.source()));
                    assert!(!excluded.contains(&edge.target()));
                }
            }
            OrphanPolicy::Drop => {
                assert_eq!(
                    filtered.node_count(),
                    graph.node_count() - excluded.len()
                );
                for node in filtered.node_weights() {
                    assert_ne!(node.region.as_ref().map(RegionID::as_str), Some("russia"));
                }
            }
        }

        // Every remaining edge should still join the same named stages with the same value
        for edge in filtered.edge_references() {
            let source = &filtered[edge.source()].name;
            let target = &filtered[edge.target()].name;
            assert!(graph.edge_references().any(|original| {
                &graph[original.source()].name == source
                    && &graph[original.target()].name == target
                    && original.weight() == edge.weight()
            }));
        }
    }

    #[rstest]
    fn test_filter_by_material(supply_chain: SupplyChain) {
        let regions: HashSet<_> = supply_chain.regions.iter().cloned().collect();

        // Reactors only take components, so disabling everything else leaves no edges into them
        let materials = hash_set! {MaterialID::new("components")};
        let filtered = filter_flow_graph(
            &supply_chain.graph,
            &regions,
            &materials,
            OrphanPolicy::Keep,
        );
        assert_eq!(filtered.edge_count(), 0);
        assert_eq!(filtered.node_count(), supply_chain.graph.node_count());
    }
}
