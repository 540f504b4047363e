use crate::dcel::Dcel;
use crate::dcel::EdgePath;
use crate::dcel::FaceId;
use crate::dcel::HalfEdgeId;
use crate::dcel::VertexId;
use crate::error::Error;
use crate::inputdcel::InputDcel;
use crate::piecewise::PiecewiseCubic;
use crate::point::Point;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use slotmap::SecondaryMap;
use std::collections::VecDeque;

// The type of a critical cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriticalKind {
    Minimum,
    Saddle,
    Maximum,
}

// A critical cell of the input DCEL: a vertex (minimum), an edge (saddle) or
// a face (maximum).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSimplex {
    Vertex(VertexId),
    Edge(HalfEdgeId),
    Face(FaceId),
}

// Payload of a Morse-Smale vertex: a minimum or saddle of the input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MsVertex {
    pub p: Point,
    pub kind: CriticalKind,
    pub simplex: InputSimplex,
}

// Payload of a Morse-Smale half-edge. The input-DCEL path realizing the edge
// is stored only on the saddle-to-minimum half of each twin pair; the other
// half retrieves it reversed. The delta value is filled in by the
// persistence simplification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MsHalfEdge {
    pub dcel_path: Option<EdgePath>,
    pub delta: f64,
}

impl Default for MsHalfEdge {
    fn default() -> Self {
        Self { dcel_path: None, delta: f64::NAN }
    }
}

// Payload of a Morse-Smale face: a descending Morse cell, containing exactly
// one maximum of the input in its interior.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct MsFace {
    // The input-DCEL face holding the maximum of this cell.
    pub maximum: Option<FaceId>,
    // All input-DCEL faces composing this cell.
    pub faces: Vec<FaceId>,
    // The volume of sediment in this cell above height h.
    pub volume_above: PiecewiseCubic,
}

/// The (quasi-)Morse-Smale complex of an input DCEL: vertices are the minima
/// and saddles, half-edges are gradient-descent paths between a saddle and a
/// minimum, and faces are the descending Morse cells, one per maximum.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct MsComplex {
    pub mesh: Dcel<MsVertex, MsHalfEdge, MsFace>,
}

impl MsComplex {
    /// Builds the Morse-Smale complex of the given input DCEL, which must
    /// have its gradient flow computed. Reports progress in percent.
    ///
    /// Fails with `Error::DegenerateSaddle` if the gradient field left a
    /// saddle with more than two Morse-Smale edges, which happens only for
    /// monkey-saddle-like configurations that the secondary edge-face
    /// pairing could not resolve.
    pub fn build(input: &InputDcel, progress: &mut dyn FnMut(u32)) -> Result<Self, Error> {
        let mut msc = Self::default();
        progress(0);

        // minima become Morse-Smale vertices
        for (v, vertex) in &input.mesh.verts {
            if input.is_critical_vertex(v) {
                msc.mesh.add_vertex(MsVertex {
                    p: vertex.data.p,
                    kind: CriticalKind::Minimum,
                    simplex: InputSimplex::Vertex(v),
                });
            }
        }
        progress(5);

        // saddles become Morse-Smale vertices; one per twin pair
        let mut saddle_of_edge: SecondaryMap<HalfEdgeId, VertexId> = SecondaryMap::new();
        for (e, edge) in &input.mesh.edges {
            if !input.is_critical_edge(e) || saddle_of_edge.contains_key(e) {
                continue;
            }
            let mut p = edge.data.p;
            // saddles get the height of their highest endpoint
            let origin = input.mesh.verts[input.mesh.origin(e)].data.p.h;
            let destination = input.mesh.verts[input.mesh.destination(e)].data.p.h;
            p.h = origin.max(destination);
            let s = msc.mesh.add_vertex(MsVertex {
                p,
                kind: CriticalKind::Saddle,
                simplex: InputSimplex::Edge(e),
            });
            saddle_of_edge.insert(e, s);
            saddle_of_edge.insert(input.mesh.twin(e), s);
        }
        progress(10);

        // Morse-Smale edges, fanning out of each minimum
        let minima: Vec<VertexId> = msc
            .mesh
            .verts
            .iter()
            .filter(|(_, v)| v.data.kind == CriticalKind::Minimum)
            .map(|(id, _)| id)
            .collect();
        let mut saddle_degree: SecondaryMap<VertexId, usize> = SecondaryMap::new();
        for m in minima {
            msc.add_edges_from_minimum(input, m, &saddle_of_edge, &mut saddle_degree);
        }
        progress(30);

        // every saddle must have exactly two Morse-Smale edges; anything
        // else is a degeneracy the pairing failed to remove
        for (s, vertex) in &msc.mesh.verts {
            if vertex.data.kind == CriticalKind::Saddle
                && saddle_degree.get(s).copied().unwrap_or(0) != 2
            {
                return Err(Error::DegenerateSaddle { x: vertex.data.p.x, y: vertex.data.p.y });
            }
        }

        debug_assert!(msc.mesh.is_valid(false));
        msc.mesh.add_faces();
        debug_assert!(msc.mesh.is_valid(true));
        progress(50);

        // for each face, locate its maximum and collect its Morse cell
        let faces: Vec<FaceId> = msc.mesh.faces.keys().collect();
        for &f in &faces {
            msc.set_dcel_faces_of_face(input, f);
        }
        debug_assert_eq!(
            msc.mesh.faces.values().map(|f| f.data.faces.len()).sum::<usize>(),
            input.mesh.nr_faces()
        );
        progress(80);

        // sum the triangle volumes within each Morse cell
        for &f in &faces {
            msc.set_volume_of_face(input, f);
        }
        progress(100);

        Ok(msc)
    }

    // Creates the Morse-Smale edges from one minimum to the saddles around
    // it, in counter-clockwise order, wiring the ring pointers around the
    // minimum immediately and those around each saddle as soon as both of
    // its edges exist.
    fn add_edges_from_minimum(
        &mut self,
        input: &InputDcel,
        m: VertexId,
        saddle_of_edge: &SecondaryMap<HalfEdgeId, VertexId>,
        saddle_degree: &mut SecondaryMap<VertexId, usize>,
    ) {
        debug_assert_eq!(self.mesh.verts[m].data.kind, CriticalKind::Minimum);
        let InputSimplex::Vertex(v) = self.mesh.verts[m].data.simplex else {
            unreachable!("minimum not backed by an input vertex");
        };
        let order = saddle_order(input, v);

        let mut added = vec![];
        for path in order {
            let saddle_edge = path.edges()[0];
            let s = saddle_of_edge[saddle_edge];
            *saddle_degree.entry(s).unwrap().or_insert(0) += 1;

            let edge = self.mesh.add_edge(m, s);
            let edge_twin = self.mesh.twin(edge);
            self.mesh.edges[edge_twin].data.dcel_path = Some(path);
            added.push(edge);

            if self.mesh.verts[s].outgoing.is_none() {
                // the first Morse-Smale edge at s
                self.mesh.set_outgoing(s, edge_twin);
            } else {
                // the second: wire the ring around s
                let other = self.mesh.outgoing_edge(s);
                let other_twin = self.mesh.twin(other);
                self.mesh.set_next(edge, other);
                self.mesh.set_next(other_twin, edge_twin);
            }
        }

        // wire the ring around m
        for i in 0..added.len() {
            let edge = added[i];
            let next_edge = added[(i + 1) % added.len()];
            if i == 0 {
                self.mesh.set_outgoing(m, edge);
            }
            let edge_twin = self.mesh.twin(edge);
            self.mesh.set_next(edge_twin, next_edge);
        }
    }

    // Finds the maximum of a Morse-Smale face by walking edge-face gradient
    // pairs uphill from the face next to the saddle, then collects all
    // input faces of the cell by flowing back down over those pairs.
    fn set_dcel_faces_of_face(&mut self, input: &InputDcel, f: FaceId) {
        let mut e = self.mesh.boundary_edge(f);
        if self.mesh.verts[self.mesh.origin(e)].data.kind == CriticalKind::Minimum {
            e = self.mesh.next(e);
        }
        debug_assert_eq!(self.mesh.verts[self.mesh.origin(e)].data.kind, CriticalKind::Saddle);

        let path = self.mesh.edges[e].data.dcel_path.as_ref().unwrap();
        let saddle_edge = path.edges()[0];

        let mut face = input.mesh.face(saddle_edge);
        while let Some(paired) = input.mesh.faces[face].data.paired_with_edge {
            face = input.mesh.face(input.mesh.twin(paired));
        }

        let mut faces = vec![face];
        input.mesh.reachable_faces(
            face,
            |mesh, crossing| mesh.edges[mesh.twin(crossing)].data.paired_with_face,
            |found, _| faces.push(found),
        );

        self.mesh.faces[f].data.maximum = Some(face);
        self.mesh.faces[f].data.faces = faces;
    }

    // The volume-above function of a Morse cell: the sum of the volume-above
    // functions of its triangles, merged pairwise through a queue to keep
    // the intermediate breakpoint lists short.
    fn set_volume_of_face(&mut self, input: &InputDcel, f: FaceId) {
        let mut queue: VecDeque<PiecewiseCubic> =
            self.mesh.faces[f].data.faces.iter().map(|&df| input.volume_above(df)).collect();
        if queue.is_empty() {
            self.mesh.faces[f].data.volume_above = PiecewiseCubic::default();
            return;
        }
        while queue.len() > 1 {
            let f1 = queue.pop_front().unwrap();
            let f2 = queue.pop_front().unwrap();
            queue.push_back(f1.add(&f2));
        }
        self.mesh.faces[f].data.volume_above = queue.pop_front().unwrap();
    }

    /// The input-DCEL path realized by a Morse-Smale edge: the stored path
    /// for a saddle-to-minimum half, its reverse for a minimum-to-saddle
    /// half.
    #[must_use]
    pub fn dcel_path(&self, input: &InputDcel, e: HalfEdgeId) -> EdgePath {
        match &self.mesh.edges[e].data.dcel_path {
            Some(path) => path.clone(),
            None => {
                let twin = self.mesh.twin(e);
                self.mesh.edges[twin]
                    .data
                    .dcel_path
                    .as_ref()
                    .expect("Morse-Smale edge without path on either half")
                    .reversed(&input.mesh)
            }
        }
    }

    // All saddle vertices.
    #[must_use]
    pub fn saddles(&self) -> Vec<VertexId> {
        self.mesh
            .verts
            .iter()
            .filter(|(_, v)| v.data.kind == CriticalKind::Saddle)
            .map(|(id, _)| id)
            .collect_vec()
    }

    // All minimum vertices.
    #[must_use]
    pub fn minima(&self) -> Vec<VertexId> {
        self.mesh
            .verts
            .iter()
            .filter(|(_, v)| v.data.kind == CriticalKind::Minimum)
            .map(|(id, _)| id)
            .collect_vec()
    }
}

// The saddles reachable from a minimum by walking the gradient flow in
// reverse, in counter-clockwise order around the minimum, each represented
// by its full descent path back to the minimum.
fn saddle_order(input: &InputDcel, v: VertexId) -> Vec<EdgePath> {
    let mut order = vec![];
    let start = input.mesh.outgoing_edge(v);
    let mut edge = start;
    loop {
        saddle_order_recursive(input, edge, &mut order);
        edge = input.mesh.next_outgoing(edge);
        if edge == start {
            break;
        }
    }
    order
}

fn saddle_order_recursive(input: &InputDcel, edge: HalfEdgeId, order: &mut Vec<EdgePath>) {
    let edge = input.mesh.twin(edge);

    if input.is_critical_edge(edge) {
        order.push(input.gradient_path(edge));
        return;
    }
    if !input.mesh.edges[edge].data.paired_with_vertex {
        return;
    }

    let end = edge;
    let mut e = edge;
    loop {
        e = input.mesh.next_outgoing(e);
        if e == end {
            break;
        }
        saddle_order_recursive(input, e, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::Coordinate;
    use crate::heightmap::Heightmap;
    use crate::inputgraph::InputGraph;

    fn map_from(rows: &[&[f64]]) -> Heightmap {
        let mut map = Heightmap::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &h) in row.iter().enumerate() {
                map.set_elevation_at(Coordinate::new(x as i32, y as i32), h);
            }
        }
        map
    }

    fn complex_from(rows: &[&[f64]]) -> (InputDcel, MsComplex) {
        let graph = InputGraph::from_heightmap(&map_from(rows));
        let mut dcel = InputDcel::from_graph(&graph);
        dcel.compute_gradient_flow();
        let msc = MsComplex::build(&dcel, &mut |_| {}).unwrap();
        (dcel, msc)
    }

    #[test]
    fn vertex_counts_match_critical_cells() {
        let (dcel, msc) = complex_from(&[
            &[3., 1., 4., 1.],
            &[5., 9., 2., 6.],
            &[5., 3., 5., 8.],
            &[9., 7., 9., 3.],
        ]);
        let minima = dcel.mesh.verts.keys().filter(|&v| dcel.is_critical_vertex(v)).count();
        let saddles =
            dcel.mesh.edges.keys().filter(|&e| dcel.is_critical_edge(e)).count() / 2;
        let maxima = dcel.mesh.faces.keys().filter(|&f| dcel.is_critical_face(f)).count();

        assert_eq!(msc.minima().len(), minima);
        assert_eq!(msc.saddles().len(), saddles);
        assert_eq!(msc.mesh.nr_verts(), minima + saddles);
        assert_eq!(msc.mesh.nr_faces(), maxima);
    }

    #[test]
    fn every_saddle_has_degree_two() {
        let (_, msc) = complex_from(&[
            &[3., 1., 4., 1.],
            &[5., 9., 2., 6.],
            &[5., 3., 5., 8.],
            &[9., 7., 9., 3.],
        ]);
        for s in msc.saddles() {
            assert_eq!(msc.mesh.degree(s), 2);
        }
        assert!(msc.mesh.is_valid(true));
    }

    #[test]
    fn morse_cells_partition_the_input_faces() {
        let (dcel, msc) = complex_from(&[&[0., 2., 0.], &[1., 5., 1.], &[0., 2., 0.]]);
        let mut seen = std::collections::HashSet::new();
        for (_, face) in &msc.mesh.faces {
            for &df in &face.data.faces {
                assert!(seen.insert(df), "input face in two Morse cells");
            }
        }
        assert_eq!(seen.len(), dcel.mesh.nr_faces());
    }

    #[test]
    fn edges_realize_paths_between_their_endpoints() {
        let (dcel, msc) = complex_from(&[&[0., 2., 0.], &[1., 5., 1.], &[0., 2., 0.]]);
        for (e, edge) in &msc.mesh.edges {
            let Some(path) = &edge.data.dcel_path else { continue };
            // the stored path belongs to the saddle-to-minimum half
            assert_eq!(msc.mesh.verts[msc.mesh.origin(e)].data.kind, CriticalKind::Saddle);
            let end = path.destination(&dcel.mesh).unwrap();
            assert!(dcel.is_critical_vertex(end));
            let InputSimplex::Vertex(min_vertex) =
                msc.mesh.verts[msc.mesh.destination(e)].data.simplex
            else {
                panic!("saddle edge not ending in a minimum");
            };
            assert_eq!(end, min_vertex);

            // the reversed path runs the other way
            let reversed = msc.dcel_path(&dcel, msc.mesh.twin(e));
            assert_eq!(reversed.origin(&dcel.mesh).unwrap(), min_vertex);
        }
    }

    #[test]
    fn single_peak_has_a_finite_cell_volume() {
        let (dcel, msc) = complex_from(&[
            &[0., 0., 0., 0., 0.],
            &[0., 0., 0., 0., 0.],
            &[0., 0., 10., 0., 0.],
            &[0., 0., 0., 0., 0.],
            &[0., 0., 0., 0., 0.],
        ]);
        // there is a Morse cell whose maximum is a triangle next to the peak
        let peak_cells: Vec<_> = msc
            .mesh
            .faces
            .iter()
            .filter(|(_, f)| {
                let centroid = dcel.mesh.faces[f.data.maximum.unwrap()].data.p;
                centroid.h.is_finite() && centroid.h > 0.
            })
            .collect();
        assert_eq!(peak_cells.len(), 1);
        let (_, peak) = peak_cells[0];
        // its volume function is finite at the plain level and zero above
        // the peak
        let volume = &peak.data.volume_above;
        assert!(volume.eval(10.).abs() < 1e-9);
        assert!(volume.eval(0.) > 0.);
        assert!(volume.eval(0.).is_finite());
    }
}
