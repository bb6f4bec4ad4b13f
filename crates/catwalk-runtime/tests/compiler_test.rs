use catwalk_core::{EdgeSpec, GraphError, NodeSpec};
use catwalk_runtime::{compile, compile_strict, Graph};

fn node(id: &str) -> NodeSpec {
    NodeSpec::new(id, "execution", id.to_uppercase())
}

fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
    let nodes = ids.iter().map(|id| node(id)).collect();
    let edges: Vec<EdgeSpec> = edges
        .iter()
        .map(|(s, t)| EdgeSpec::between(*s, *t))
        .collect();
    Graph::new(nodes, &edges).unwrap()
}

#[test]
fn no_edges_yields_reverse_declaration_order() {
    // All nodes are start nodes, appended in declaration order, then the
    // whole list is reversed once.
    let g = graph(&["a", "b", "c"], &[]);
    assert_eq!(compile(&g).as_slice(), ["c", "b", "a"]);
}

#[test]
fn linear_chain() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    assert_eq!(compile(&g).as_slice(), ["a", "b", "c"]);
}

#[test]
fn diamond_sibling_order_swaps() {
    // The left branch claims `join` during its postorder, so the right
    // branch skips it and self-appends earlier: siblings come out in the
    // opposite of declaration order.
    let g = graph(
        &["start", "left", "right", "join"],
        &[
            ("start", "left"),
            ("start", "right"),
            ("left", "join"),
            ("right", "join"),
        ],
    );
    assert_eq!(compile(&g).as_slice(), ["start", "right", "left", "join"]);
}

#[test]
fn compilation_is_idempotent() {
    let g = graph(
        &["start", "left", "right", "join"],
        &[
            ("start", "left"),
            ("start", "right"),
            ("left", "join"),
            ("right", "join"),
        ],
    );
    assert_eq!(compile(&g), compile(&g));
}

#[test]
fn cyclic_subgraph_is_silently_omitted() {
    // b and c only reach each other; neither is a start node, so the
    // traversal never sees them and compile raises nothing.
    let g = graph(&["a", "b", "c"], &[("b", "c"), ("c", "b")]);
    let order = compile(&g);
    assert_eq!(order.as_slice(), ["a"]);
    assert!(!order.contains("b"));
    assert!(!order.contains("c"));
}

#[test]
fn unknown_edge_endpoint_fails_graph_construction() {
    let nodes = vec![node("a"), node("b")];
    let edges = vec![EdgeSpec::between("a", "missing")];
    let err = Graph::new(nodes, &edges).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnknownNodeReference {
            descriptor: "a -> missing".into()
        }
    );
}

#[test]
fn strict_compile_reports_unreachable_nodes() {
    let g = graph(&["a", "b", "c"], &[("b", "c"), ("c", "b")]);
    match compile_strict(&g) {
        Err(GraphError::Unreachable { ids }) => assert_eq!(ids, ["b", "c"]),
        other => panic!("expected unreachable error, got {other:?}"),
    }
}

#[test]
fn strict_compile_passes_for_fully_reachable_graphs() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    assert_eq!(compile_strict(&g).unwrap().as_slice(), ["a", "b"]);
}

#[test]
fn shared_successor_is_claimed_once() {
    // Two independent start nodes feeding one sink: the sink appears
    // exactly once, after both feeders.
    let g = graph(&["a", "b", "sink"], &[("a", "sink"), ("b", "sink")]);
    let order = compile(&g);
    assert_eq!(order.len(), 3);
    let position = |id: &str| order.iter().position(|n| n == id).unwrap();
    assert!(position("a") < position("sink"));
    assert!(position("b") < position("sink"));
}
