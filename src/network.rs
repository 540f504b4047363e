use crate::dcel::VertexId;
use crate::inputdcel::InputDcel;
use crate::mscomplex::MsComplex;
use crate::point::Point;
use ordered_float::OrderedFloat;
use petgraph::graph::UnGraph;
use serde::Deserialize;
use serde::Serialize;
use slotmap::SecondaryMap;
use std::collections::HashSet;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkVertex {
    pub p: Point,
}

// An edge of the channel network: a saddle-to-minimum channel with the grid
// path realizing it and its significance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub from: usize,
    pub to: usize,
    pub path: Vec<Point>,
    pub delta: f64,
}

// A maximal chain of network edges running through degree-2 vertices,
// written out as one unit by the link-sequence writer. Its significance is
// that of its weakest edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub path: Vec<Point>,
    pub delta: f64,
}

/// The extracted channel network: an undirected multigraph whose vertices
/// are critical points and whose edges are channels annotated with their
/// significance delta.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub verts: Vec<NetworkVertex>,
    pub edges: Vec<NetworkEdge>,
}

impl NetworkGraph {
    /// Collects the network from a simplified Morse-Smale complex: one graph
    /// vertex per Morse-Smale vertex (deduplicated), one edge per
    /// saddle-to-minimum half-edge, carrying its realized path and delta.
    #[must_use]
    pub fn from_ms_complex(input: &InputDcel, msc: &MsComplex) -> Self {
        let mut graph = Self::default();
        let mut vertex_of: SecondaryMap<VertexId, usize> = SecondaryMap::new();

        for (e, edge) in &msc.mesh.edges {
            // the stored path sits on the saddle-to-minimum half of each pair
            let Some(path) = &edge.data.dcel_path else {
                continue;
            };
            let from = graph.ensure_vertex(&mut vertex_of, msc, msc.mesh.origin(e));
            let to = graph.ensure_vertex(&mut vertex_of, msc, msc.mesh.destination(e));
            let points =
                path.vertices(&input.mesh).iter().map(|&v| input.mesh.verts[v].data.p).collect();
            graph.edges.push(NetworkEdge { from, to, path: points, delta: edge.data.delta });
        }

        graph
    }

    fn ensure_vertex(
        &mut self,
        vertex_of: &mut SecondaryMap<VertexId, usize>,
        msc: &MsComplex,
        v: VertexId,
    ) -> usize {
        if let Some(&index) = vertex_of.get(v) {
            return index;
        }
        let index = self.verts.len();
        self.verts.push(NetworkVertex { p: msc.mesh.verts[v].data.p });
        vertex_of.insert(v, index);
        index
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The network thresholded at `delta`: edges at or below it are dropped.
    /// Vertices are kept, so indices remain valid.
    #[must_use]
    pub fn filter_on_delta(&self, delta: f64) -> Self {
        Self {
            verts: self.verts.clone(),
            edges: self.edges.iter().filter(|e| e.delta > delta).cloned().collect(),
        }
    }

    /// Decomposes the network into links: maximal chains whose interior
    /// vertices have degree 2. Isolated cycles become one link each.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let mut incident: Vec<Vec<usize>> = vec![vec![]; self.verts.len()];
        for (i, e) in self.edges.iter().enumerate() {
            incident[e.from].push(i);
            incident[e.to].push(i);
        }

        let mut links = vec![];
        let mut visited: HashSet<usize> = HashSet::new();

        // chains starting and ending at vertices of degree != 2
        for v in 0..self.verts.len() {
            if incident[v].len() == 2 {
                continue;
            }
            for &start in &incident[v] {
                if visited.contains(&start) {
                    continue;
                }
                links.push(self.walk_link(&incident, &mut visited, v, start));
            }
        }

        // whatever remains runs in cycles of degree-2 vertices
        for start in 0..self.edges.len() {
            if visited.contains(&start) {
                continue;
            }
            let v = self.edges[start].from;
            links.push(self.walk_link(&incident, &mut visited, v, start));
        }

        links
    }

    fn walk_link(
        &self,
        incident: &[Vec<usize>],
        visited: &mut HashSet<usize>,
        start_vertex: usize,
        start_edge: usize,
    ) -> Link {
        let mut points: Vec<Point> = vec![];
        let mut delta = f64::INFINITY;

        let mut vertex = start_vertex;
        let mut edge = start_edge;
        loop {
            visited.insert(edge);
            let e = &self.edges[edge];
            delta = delta.min(e.delta);

            let oriented: Vec<Point> = if e.from == vertex {
                e.path.clone()
            } else {
                e.path.iter().rev().copied().collect()
            };
            if points.is_empty() {
                points.extend(oriented);
            } else {
                points.extend(oriented.into_iter().skip(1));
            }

            vertex = if e.from == vertex { e.to } else { e.from };
            if incident[vertex].len() != 2 {
                break;
            }
            match incident[vertex].iter().find(|&&next| !visited.contains(&next)) {
                Some(&next) => edge = next,
                None => break,
            }
        }

        Link { path: points, delta }
    }

    /// The network as a petgraph graph, with points on the nodes and deltas
    /// on the edges.
    #[must_use]
    pub fn to_petgraph(&self) -> UnGraph<Point, f64> {
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<_> = self.verts.iter().map(|v| graph.add_node(v.p)).collect();
        for e in &self.edges {
            graph.add_edge(nodes[e.from], nodes[e.to], e.delta);
        }
        graph
    }

    // The largest finite delta in the network, a convenient upper bound for
    // threshold sliders.
    #[must_use]
    pub fn maximum_finite_delta(&self) -> Option<f64> {
        self.edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite())
            .max_by_key(|&d| OrderedFloat(d))
    }
}
