use crate::dcel::Dcel;
use crate::dcel::EdgePath;
use crate::dcel::FaceId;
use crate::dcel::HalfEdgeId;
use crate::dcel::VertexId;
use crate::inputgraph::InputGraph;
use crate::piecewise::CubicFunction;
use crate::piecewise::PiecewiseCubic;
use crate::piecewise::PiecewiseLinear;
use crate::point::Point;
use bimap::BiHashMap;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

// Payload of a vertex in the input DCEL.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InputVertex {
    pub p: Point,
    // Half-edge this vertex is gradient-paired with, if any.
    pub paired_with_edge: Option<HalfEdgeId>,
}

// Payload of a half-edge in the input DCEL.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InputHalfEdge {
    // The midpoint of this edge.
    pub p: Point,
    // Whether this half-edge is the highest (lexicographically) of its
    // incident face, or the second-highest.
    pub highest_of_face: bool,
    pub second_highest_of_face: bool,
    // Whether this half-edge is gradient-paired with its origin.
    pub paired_with_vertex: bool,
    // Whether this half-edge is gradient-paired with its incident face.
    pub paired_with_face: bool,
}

// Payload of a face in the input DCEL.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InputFace {
    // The centroid of this face.
    pub p: Point,
    // Boundary half-edge this face is gradient-paired with, if any.
    pub paired_with_edge: Option<HalfEdgeId>,
}

/// The half-edge representation of the input graph, with a discrete gradient
/// field over its vertices, edges and faces.
///
/// Square grid cells arrive from the input graph as quadrilateral faces;
/// construction splits each of them along the diagonal through its highest
/// corner, so that afterwards every face is a triangle. After
/// `compute_gradient_flow` the unpaired cells are exactly the critical ones:
/// unpaired vertices are minima, half-edges unpaired on both sides are
/// saddles, and unpaired faces are maxima.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InputDcel {
    pub mesh: Dcel<InputVertex, InputHalfEdge, InputFace>,
    // input-graph index <-> mesh vertex, in the manner of a vertex map of a
    // mesh loader
    vertex_map: BiHashMap<usize, VertexId>,
}

impl InputDcel {
    /// Builds the embedded version of an input graph: one mesh vertex per
    /// graph vertex, a half-edge pair per adjacency, next-pointers following
    /// the counter-clockwise adjacency rings, faces synthesized from the
    /// rings, and quadrilateral cell faces split into triangles.
    #[must_use]
    pub fn from_graph(graph: &InputGraph) -> Self {
        let mut dcel = Self::default();

        for i in 0..graph.vertex_count() {
            let v = dcel.mesh.add_vertex(InputVertex { p: graph[i].p, paired_with_edge: None });
            dcel.vertex_map.insert(i, v);
        }

        // he_adj[v][i] is the half-edge corresponding to graph[v].adj[i]
        let mut he_adj: Vec<Vec<Option<HalfEdgeId>>> =
            (0..graph.vertex_count()).map(|v| vec![None; graph[v].adj.len()]).collect();

        for v in 0..graph.vertex_count() {
            for i in 0..graph[v].adj.len() {
                let a = graph[v].adj[i];
                if a.from >= a.to {
                    continue;
                }
                let from = *dcel.vertex_map.get_by_left(&a.from).unwrap();
                let to = *dcel.vertex_map.get_by_left(&a.to).unwrap();
                let e = dcel.mesh.add_edge(from, to);
                he_adj[v][i] = Some(e);

                // find the reverse adjacency slot that is not yet taken
                let back_index = graph[a.to]
                    .adj
                    .iter()
                    .enumerate()
                    .position(|(j, b)| {
                        b.to == a.from
                            && b.disambiguation == a.disambiguation
                            && he_adj[a.to][j].is_none()
                    })
                    .expect("adjacency without reverse");
                he_adj[a.to][back_index] = Some(dcel.mesh.twin(e));
            }
        }

        // outgoing, next and previous pointers from the ring order
        for i in 0..graph.vertex_count() {
            let v = *dcel.vertex_map.get_by_left(&i).unwrap();
            if let Some(&Some(first)) = he_adj[i].first() {
                dcel.mesh.set_outgoing(v, first);
            }
            for j in 0..he_adj[i].len() {
                let e = he_adj[i][j].unwrap();
                let succ = he_adj[i][(j + 1) % he_adj[i].len()].unwrap();
                let twin = dcel.mesh.twin(e);
                dcel.mesh.set_next(twin, succ);
            }
        }

        dcel.mesh.add_faces();
        dcel.triangulate();
        dcel.set_edge_and_face_coordinates();
        dcel
    }

    // Splits every face with more than three boundary edges into triangles
    // by repeatedly cutting off the ear at its highest corner.
    fn triangulate(&mut self) {
        let faces: Vec<FaceId> = self.mesh.faces.keys().collect();
        for face in faces {
            loop {
                let cycle = self.mesh.boundary_edges(face);
                if cycle.len() <= 3 {
                    break;
                }
                let highest = (0..cycle.len())
                    .max_by(|&i, &j| {
                        let pi = self.mesh.verts[self.mesh.origin(cycle[i])].data.p;
                        let pj = self.mesh.verts[self.mesh.origin(cycle[j])].data.p;
                        pi.sos_cmp(&pj)
                    })
                    .unwrap();

                // cut off the triangle (a, b) with the diagonal back to the
                // highest corner
                let a = cycle[highest];
                let b = cycle[(highest + 1) % cycle.len()];
                let va = self.mesh.origin(a);
                let vc = self.mesh.destination(b);

                let diagonal = self.mesh.add_edge(va, vc);
                let diagonal_twin = self.mesh.twin(diagonal);

                let prev_a = self.mesh.previous(a);
                let next_b = self.mesh.next(b);
                self.mesh.set_next(b, diagonal_twin);
                self.mesh.set_next(diagonal_twin, a);
                self.mesh.set_next(prev_a, diagonal);
                self.mesh.set_next(diagonal, next_b);

                let ear = self.mesh.add_face(a, InputFace::default());
                self.mesh.set_face(a, ear);
                self.mesh.set_face(b, ear);
                self.mesh.set_face(diagonal_twin, ear);
                self.mesh.set_face(diagonal, face);
                self.mesh.set_boundary(face, diagonal);
            }
        }
    }

    // Sets midpoints of all edges and centroids of all faces.
    fn set_edge_and_face_coordinates(&mut self) {
        let edges: Vec<HalfEdgeId> = self.mesh.edges.keys().collect();
        for e in edges {
            let p1 = self.mesh.verts[self.mesh.origin(e)].data.p;
            let p2 = self.mesh.verts[self.mesh.destination(e)].data.p;
            self.mesh.edges[e].data.p = (p1 + p2) * 0.5;
        }
        let faces: Vec<FaceId> = self.mesh.faces.keys().collect();
        for f in faces {
            let corners = self.mesh.boundary_vertices(f);
            let mut sum = Point::default();
            for &v in &corners {
                sum = sum + self.mesh.verts[v].data.p;
            }
            self.mesh.faces[f].data.p = sum * (1. / corners.len() as f64);
        }
    }

    /// Computes the discrete gradient field: vertex-edge pairs along steepest
    /// descent, and primary and secondary edge-face pairs along the highest
    /// and second-highest edges of each face.
    pub fn compute_gradient_flow(&mut self) {
        // highest-of-face and second-highest-of-face marks
        let faces: Vec<FaceId> = self.mesh.faces.keys().collect();
        for f in &faces {
            // the half-edge with the highest origin; the highest edge of the
            // face is either that one or its predecessor
            let highest_edge = self
                .mesh
                .boundary_edges(*f)
                .into_iter()
                .max_by(|&a, &b| {
                    let pa = self.mesh.verts[self.mesh.origin(a)].data.p;
                    let pb = self.mesh.verts[self.mesh.origin(b)].data.p;
                    pa.sos_cmp(&pb)
                })
                .unwrap();
            let previous = self.mesh.previous(highest_edge);
            let previous_origin = self.mesh.verts[self.mesh.origin(previous)].data.p;
            let destination = self.mesh.verts[self.mesh.destination(highest_edge)].data.p;
            if previous_origin.sos_gt(&destination) {
                self.mesh.edges[previous].data.highest_of_face = true;
                self.mesh.edges[highest_edge].data.second_highest_of_face = true;
            } else {
                self.mesh.edges[highest_edge].data.highest_of_face = true;
                self.mesh.edges[previous].data.second_highest_of_face = true;
            }
        }

        // vertex-edge pairing: pair with the edge to the lowest neighbor,
        // if that neighbor is lower than the vertex itself
        let verts: Vec<VertexId> = self.mesh.verts.keys().collect();
        for v in verts {
            let paired = self
                .mesh
                .outgoing_edges(v)
                .into_iter()
                .min_by(|&a, &b| {
                    let pa = self.mesh.verts[self.mesh.destination(a)].data.p;
                    let pb = self.mesh.verts[self.mesh.destination(b)].data.p;
                    pa.sos_cmp(&pb)
                });
            if let Some(e) = paired {
                let destination = self.mesh.verts[self.mesh.destination(e)].data.p;
                if destination.sos_lt(&self.mesh.verts[v].data.p) {
                    self.mesh.verts[v].data.paired_with_edge = Some(e);
                    self.mesh.edges[e].data.paired_with_vertex = true;
                }
            }
        }

        // primary edge-face pairing
        let edges: Vec<HalfEdgeId> = self.mesh.edges.keys().collect();
        for &e in &edges {
            if !self.mesh.edges[e].data.highest_of_face {
                continue;
            }
            let incident_highest = self.highest_vertex_not_in_edge(self.mesh.face(e), e);
            let opposite_highest = self.highest_vertex_not_in_edge(self.mesh.opposite_face(e), e);
            if let (Some(a), Some(b)) = (incident_highest, opposite_highest) {
                if self.mesh.verts[a].data.p.sos_lt(&self.mesh.verts[b].data.p) {
                    let f = self.mesh.face(e);
                    self.mesh.faces[f].data.paired_with_edge = Some(e);
                    self.mesh.edges[e].data.paired_with_face = true;
                    debug_assert!(!self.mesh.edges[e].data.paired_with_vertex);
                    debug_assert!(!self.mesh.edges[self.mesh.twin(e)].data.paired_with_vertex);
                    debug_assert!(!self.mesh.edges[self.mesh.twin(e)].data.paired_with_face);
                }
            }
        }

        // secondary edge-face pairs, eliminating most degenerate
        // configurations without explicit splitting
        for &e in &edges {
            let twin = self.mesh.twin(e);
            if self.mesh.edges[e].data.paired_with_vertex
                || self.mesh.edges[e].data.paired_with_face
                || self.mesh.edges[twin].data.paired_with_vertex
                || self.mesh.edges[twin].data.paired_with_face
            {
                continue;
            }
            if !self.mesh.edges[e].data.second_highest_of_face {
                continue;
            }
            let f = self.mesh.face(e);
            if self.mesh.faces[f].data.paired_with_edge.is_some() {
                continue;
            }
            let incident_highest = self.highest_vertex_not_in_edge(f, e);
            let opposite_highest = self.highest_vertex_not_in_edge(self.mesh.opposite_face(e), e);
            if let (Some(a), Some(b)) = (incident_highest, opposite_highest) {
                if self.mesh.verts[a].data.p.sos_lt(&self.mesh.verts[b].data.p) {
                    self.mesh.faces[f].data.paired_with_edge = Some(e);
                    self.mesh.edges[e].data.paired_with_face = true;
                }
            }
        }
    }

    // The highest boundary vertex of `f` that is not an endpoint of `e`.
    fn highest_vertex_not_in_edge(&self, f: FaceId, e: HalfEdgeId) -> Option<VertexId> {
        let origin = self.mesh.origin(e);
        let destination = self.mesh.destination(e);
        self.mesh
            .boundary_vertices(f)
            .into_iter()
            .filter(|&v| v != origin && v != destination)
            .max_by(|&a, &b| self.mesh.verts[a].data.p.sos_cmp(&self.mesh.verts[b].data.p))
    }

    // Critical vertices are the minima.
    #[must_use]
    pub fn is_critical_vertex(&self, v: VertexId) -> bool {
        self.mesh.verts[v].data.paired_with_edge.is_none()
    }

    // Critical edges (saddles) are unpaired on both half-edges.
    #[must_use]
    pub fn is_critical_edge(&self, e: HalfEdgeId) -> bool {
        let twin = self.mesh.twin(e);
        !self.mesh.edges[e].data.paired_with_face
            && !self.mesh.edges[e].data.paired_with_vertex
            && !self.mesh.edges[twin].data.paired_with_face
            && !self.mesh.edges[twin].data.paired_with_vertex
    }

    // Critical faces are the maxima.
    #[must_use]
    pub fn is_critical_face(&self, f: FaceId) -> bool {
        self.mesh.faces[f].data.paired_with_edge.is_none()
    }

    /// The gradient-descent path starting with the given half-edge: from its
    /// destination, keep following vertex-edge gradient pairs downward until
    /// an unpaired vertex (a minimum) is reached.
    #[must_use]
    pub fn gradient_path(&self, starting_edge: HalfEdgeId) -> EdgePath {
        let mut result = EdgePath::new();
        let mut edge = starting_edge;
        result.push(&self.mesh, edge);
        while let Some(paired) = self.mesh.verts[self.mesh.destination(edge)].data.paired_with_edge
        {
            edge = paired;
            result.push(&self.mesh, edge);
        }
        result
    }

    #[must_use]
    pub fn is_descending(&self, e: HalfEdgeId) -> bool {
        let origin = self.mesh.verts[self.mesh.origin(e)].data.p;
        let destination = self.mesh.verts[self.mesh.destination(e)].data.p;
        origin.sos_gt(&destination)
    }

    #[must_use]
    pub fn is_ascending(&self, e: HalfEdgeId) -> bool {
        !self.is_descending(e)
    }

    /// The volume of sediment above height `h` in the given triangle face,
    /// as a piecewise cubic function of `h`.
    ///
    /// Triangles touching a virtual vertex are special: a corner at the
    /// virtual maximum makes the volume unbounded (the function evaluates to
    /// +inf everywhere), while a corner at the virtual source or sink
    /// contributes nothing (the interpolated surface falls away to -inf, so
    /// in the limit no sediment remains above any height).
    #[must_use]
    pub fn volume_above(&self, f: FaceId) -> PiecewiseCubic {
        let points = self
            .mesh
            .boundary_vertices(f)
            .iter()
            .map(|&v| self.mesh.verts[v].data.p)
            .sorted_by(Point::sos_cmp)
            .collect_vec();
        debug_assert_eq!(points.len(), 3);

        if points.iter().any(|p| p.h == f64::INFINITY || p.h.is_nan()) {
            return PiecewiseCubic::from_piece(CubicFunction::new(f64::INFINITY, 0., 0., 0.));
        }
        if points.iter().any(|p| p.h == f64::NEG_INFINITY) {
            return PiecewiseCubic::default();
        }
        PiecewiseCubic::for_triangle(points[0], points[1], points[2])
    }

    /// A cheap piecewise-linear estimate of the volume above height `h` in
    /// the given face: the sum of one quarter-cell pillar per corner.
    #[must_use]
    pub fn volume_above_pillar(&self, f: FaceId) -> PiecewiseLinear {
        self.mesh
            .boundary_vertices(f)
            .iter()
            .map(|&v| PiecewiseLinear::quarter_pillar(self.mesh.verts[v].data.p))
            .fold(PiecewiseLinear::default(), |sum, pillar| sum.add(&pillar))
    }

    // The vertex at the given grid position, if it exists and is not
    // virtual.
    #[must_use]
    pub fn vertex_at(&self, x: f64, y: f64) -> Option<VertexId> {
        self.mesh.verts.iter().find_map(|(id, v)| {
            (v.data.p.x == x && v.data.p.y == y && v.data.p.h < f64::INFINITY).then_some(id)
        })
    }

    #[must_use]
    pub fn vertex_of_graph(&self, graph_index: usize) -> VertexId {
        *self.vertex_map.get_by_left(&graph_index).unwrap()
    }

    #[must_use]
    pub fn source_vertex(&self) -> VertexId {
        self.vertex_of_graph(InputGraph::GLOBAL_SOURCE)
    }

    #[must_use]
    pub fn sink_vertex(&self) -> VertexId {
        self.vertex_of_graph(InputGraph::GLOBAL_SINK)
    }

    #[must_use]
    pub fn maximum_vertex(&self) -> VertexId {
        self.vertex_of_graph(InputGraph::GLOBAL_MAXIMUM)
    }

    /// The face on the source side of the edge between the virtual source
    /// and the virtual maximum. Serves as the canonical representative of
    /// the region outside the triangulation's interior.
    #[must_use]
    pub fn outer_face(&self) -> FaceId {
        let e = self
            .mesh
            .outgoing_to(self.source_vertex(), self.maximum_vertex())
            .expect("source and maximum not connected");
        self.mesh.face(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::Coordinate;
    use crate::heightmap::Heightmap;

    fn map_from(rows: &[&[f64]]) -> Heightmap {
        let mut map = Heightmap::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &h) in row.iter().enumerate() {
                map.set_elevation_at(Coordinate::new(x as i32, y as i32), h);
            }
        }
        map
    }

    fn dcel_from(rows: &[&[f64]]) -> InputDcel {
        let graph = InputGraph::from_heightmap(&map_from(rows));
        let mut dcel = InputDcel::from_graph(&graph);
        dcel.compute_gradient_flow();
        dcel
    }

    #[test]
    fn counts_on_2x2() {
        let dcel = dcel_from(&[&[0., 0.], &[0., 0.]]);
        // 4 real vertices plus source, sink and maximum
        assert_eq!(dcel.mesh.nr_verts(), 7);
        // 4 cell sides, 2+2 source/sink, 4 to the maximum, source-maximum,
        // sink-maximum, and one diagonal from the split cell
        assert_eq!(dcel.mesh.nr_edges(), 2 * 15);
        // Euler on the sphere, all triangles
        assert_eq!(dcel.mesh.nr_faces(), 10);
        assert!(dcel.mesh.is_valid(true));
    }

    #[test]
    fn counts_on_3x3() {
        let dcel = dcel_from(&[&[0., 0., 0.], &[0., 0., 0.], &[0., 0., 0.]]);
        assert_eq!(dcel.mesh.nr_verts(), 12);
        assert_eq!(dcel.mesh.nr_edges(), 2 * 30);
        assert_eq!(dcel.mesh.nr_faces(), 20);
        assert!(dcel.mesh.is_valid(true));
    }

    #[test]
    fn all_faces_are_triangles() {
        let dcel = dcel_from(&[&[1., 2., 3.], &[6., 5., 4.], &[7., 8., 9.]]);
        for f in dcel.mesh.faces.keys() {
            assert_eq!(dcel.mesh.boundary_edges(f).len(), 3);
        }
    }

    #[test]
    fn pairing_is_a_partition() {
        let dcel = dcel_from(&[
            &[3., 1., 4., 1.],
            &[5., 9., 2., 6.],
            &[5., 3., 5., 8.],
            &[9., 7., 9., 3.],
        ]);

        for (v, data) in &dcel.mesh.verts {
            if let Some(e) = data.data.paired_with_edge {
                assert_eq!(dcel.mesh.origin(e), v);
                assert!(dcel.mesh.edges[e].data.paired_with_vertex);
                assert!(!dcel.mesh.edges[e].data.paired_with_face);
            }
        }
        for (e, data) in &dcel.mesh.edges {
            assert!(!(data.data.paired_with_vertex && data.data.paired_with_face));
            if data.data.paired_with_face {
                let f = dcel.mesh.face(e);
                assert_eq!(dcel.mesh.faces[f].data.paired_with_edge, Some(e));
            }
        }
        for (f, data) in &dcel.mesh.faces {
            if let Some(e) = data.data.paired_with_edge {
                assert_eq!(dcel.mesh.face(e), f);
                assert!(dcel.mesh.edges[e].data.paired_with_face);
            }
        }
    }

    #[test]
    fn critical_cells_satisfy_euler_relation() {
        // on the sphere, #minima - #saddles + #maxima = 2
        let dcel = dcel_from(&[
            &[3., 1., 4., 1.],
            &[5., 9., 2., 6.],
            &[5., 3., 5., 8.],
            &[9., 7., 9., 3.],
        ]);
        let minima = dcel.mesh.verts.keys().filter(|&v| dcel.is_critical_vertex(v)).count();
        let saddles = dcel
            .mesh
            .edges
            .keys()
            .filter(|&e| dcel.is_critical_edge(e))
            .count()
            / 2;
        let maxima = dcel.mesh.faces.keys().filter(|&f| dcel.is_critical_face(f)).count();
        assert_eq!(minima as i64 - saddles as i64 + maxima as i64, 2);
    }

    #[test]
    fn source_and_sink_are_minima() {
        let dcel = dcel_from(&[&[0., 0., 0.], &[0., 0., 0.], &[0., 0., 0.]]);
        assert!(dcel.is_critical_vertex(dcel.source_vertex()));
        assert!(dcel.is_critical_vertex(dcel.sink_vertex()));
        assert!(!dcel.is_critical_vertex(dcel.maximum_vertex()));
    }

    #[test]
    fn gradient_paths_end_in_minima() {
        let dcel = dcel_from(&[
            &[3., 1., 4., 1.],
            &[5., 9., 2., 6.],
            &[5., 3., 5., 8.],
            &[9., 7., 9., 3.],
        ]);
        for e in dcel.mesh.edges.keys() {
            if dcel.is_critical_edge(e) {
                let path = dcel.gradient_path(e);
                let end = path.destination(&dcel.mesh).unwrap();
                assert!(dcel.is_critical_vertex(end));
            }
        }
    }

    #[test]
    fn pillar_volume_on_a_split_cell() {
        let dcel = dcel_from(&[&[10., 30.], &[20., 40.]]);
        // (1, 1) is the highest corner, so the cell splits along the
        // diagonal (0,0)-(1,1); the face north-east of it has corners at
        // heights 10, 30 and 40
        let v = dcel.vertex_at(0., 0.).unwrap();
        let w = dcel.vertex_at(1., 0.).unwrap();
        let e = dcel.mesh.outgoing_to(v, w).unwrap();
        let above = dcel.volume_above_pillar(dcel.mesh.face(e));
        assert_eq!(above.eval(40.), 0.);
        assert_eq!(above.eval(30.), 0.25 * 10.);
        assert_eq!(above.eval(20.), 0.25 * 20. + 0.25 * 10.);
        assert_eq!(above.eval(10.), 0.25 * 30. + 0.25 * 20.);
        assert_eq!(above.eval(0.), 0.25 * 40. + 0.25 * 30. + 0.25 * 10.);
    }

    #[test]
    fn triangle_volume_on_a_split_cell() {
        let dcel = dcel_from(&[&[10., 30.], &[20., 40.]]);
        let v = dcel.vertex_at(0., 0.).unwrap();
        let w = dcel.vertex_at(1., 0.).unwrap();
        let e = dcel.mesh.outgoing_to(v, w).unwrap();
        let above = dcel.volume_above(dcel.mesh.face(e));
        // total volume above the base: area 1/2 times the mean height
        assert!((above.eval(0.) - 0.5 * (10. + 30. + 40.) / 3.).abs() < 1e-9);
        assert!(above.eval(40.).abs() < 1e-9);
        assert!(above.eval(50.).abs() < 1e-9);
    }

    #[test]
    fn outer_face_touches_the_virtual_corner() {
        let dcel = dcel_from(&[&[0., 0.], &[0., 0.]]);
        let outer = dcel.outer_face();
        let corners = dcel.mesh.boundary_vertices(outer);
        assert!(corners.contains(&dcel.source_vertex()));
        assert!(corners.contains(&dcel.maximum_vertex()));
    }
}
