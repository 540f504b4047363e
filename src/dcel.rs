use bimap::BiHashMap;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::collections::VecDeque;

slotmap::new_key_type! {
    pub struct VertexId;
    pub struct HalfEdgeId;
    pub struct FaceId;
}

pub type VertexMap = BiHashMap<VertexId, VertexId>;
pub type HalfEdgeMap = BiHashMap<HalfEdgeId, HalfEdgeId>;
pub type FaceMap = BiHashMap<FaceId, FaceId>;

// Payload for elements that carry no data.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty;

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Vertex<V> {
    // An arbitrary outgoing half-edge.
    pub outgoing: Option<HalfEdgeId>,
    pub data: V,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HalfEdge<E> {
    pub origin: VertexId,
    pub twin: Option<HalfEdgeId>,
    pub next: Option<HalfEdgeId>,
    pub previous: Option<HalfEdgeId>,
    pub face: Option<FaceId>,
    pub data: E,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Face<F> {
    // An arbitrary half-edge on the boundary.
    pub boundary: HalfEdgeId,
    pub data: F,
}

/// A doubly connected edge list (DCEL), also known as a half-edge data
/// structure: a representation of an embedding of a planar graph. Every edge
/// is stored as two half-edges, one per direction; each half-edge is incident
/// to exactly one face. The cycle of half-edges around a face runs in
/// counter-clockwise order.
///
/// All references between elements are stable slotmap keys into the three
/// arenas. Removing an element really removes it; `compact` renumbers the
/// survivors densely and reports the old-to-new key mappings.
///
/// Vertices, half-edges and faces carry arbitrary payloads `V`, `E` and `F`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dcel<V, E, F> {
    pub verts: slotmap::SlotMap<VertexId, Vertex<V>>,
    pub edges: slotmap::SlotMap<HalfEdgeId, HalfEdge<E>>,
    pub faces: slotmap::SlotMap<FaceId, Face<F>>,
}

impl<V, E, F> Default for Dcel<V, E, F> {
    fn default() -> Self {
        Self::new()
    }
}

// A wedge: the sector at a vertex between an incoming half-edge and the next
// outgoing one. Represented by its outgoing half-edge; a separate type so
// that the vertex-split variants cannot be mixed up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Wedge(pub HalfEdgeId);

// Structural accessors. These panic on stale keys or unset pointers, which
// are structure bugs, not recoverable conditions.
impl<V, E, F> Dcel<V, E, F> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            verts: slotmap::SlotMap::with_key(),
            edges: slotmap::SlotMap::with_key(),
            faces: slotmap::SlotMap::with_key(),
        }
    }

    #[must_use]
    pub fn nr_verts(&self) -> usize {
        self.verts.len()
    }

    #[must_use]
    pub fn nr_edges(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn nr_faces(&self) -> usize {
        self.faces.len()
    }

    fn edge(&self, id: HalfEdgeId) -> &HalfEdge<E> {
        self.edges.get(id).unwrap_or_else(|| panic!("E:{id:?} not initialized"))
    }

    // The outgoing half-edge of a vertex.
    #[must_use]
    pub fn outgoing_edge(&self, id: VertexId) -> HalfEdgeId {
        self.verts
            .get(id)
            .unwrap_or_else(|| panic!("V:{id:?} not initialized"))
            .outgoing
            .unwrap_or_else(|| panic!("V:{id:?} has no outgoing edge"))
    }

    // An incoming half-edge of a vertex (the twin of its outgoing one).
    #[must_use]
    pub fn incoming_edge(&self, id: VertexId) -> HalfEdgeId {
        self.twin(self.outgoing_edge(id))
    }

    #[must_use]
    pub fn origin(&self, id: HalfEdgeId) -> VertexId {
        self.edge(id).origin
    }

    // The destination of a half-edge (the origin of its twin).
    #[must_use]
    pub fn destination(&self, id: HalfEdgeId) -> VertexId {
        self.origin(self.twin(id))
    }

    #[must_use]
    pub fn endpoints(&self, id: HalfEdgeId) -> (VertexId, VertexId) {
        (self.origin(id), self.destination(id))
    }

    #[must_use]
    pub fn twin(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.edge(id).twin.unwrap_or_else(|| panic!("E:{id:?} has no twin"))
    }

    #[must_use]
    pub fn next(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.edge(id).next.unwrap_or_else(|| panic!("E:{id:?} has no next"))
    }

    #[must_use]
    pub fn previous(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.edge(id).previous.unwrap_or_else(|| panic!("E:{id:?} has no previous"))
    }

    // The incident face of a half-edge.
    #[must_use]
    pub fn face(&self, id: HalfEdgeId) -> FaceId {
        self.edge(id).face.unwrap_or_else(|| panic!("E:{id:?} has no incident face"))
    }

    // The incident face of the twin.
    #[must_use]
    pub fn opposite_face(&self, id: HalfEdgeId) -> FaceId {
        self.face(self.twin(id))
    }

    // The next outgoing half-edge around the origin, in counter-clockwise
    // order.
    #[must_use]
    pub fn next_outgoing(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.next(self.twin(id))
    }

    #[must_use]
    pub fn previous_outgoing(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.twin(self.previous(id))
    }

    // The next incoming half-edge around the destination.
    #[must_use]
    pub fn next_incoming(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.twin(self.next(id))
    }

    #[must_use]
    pub fn previous_incoming(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.previous(self.twin(id))
    }

    // A boundary half-edge of a face.
    #[must_use]
    pub fn boundary_edge(&self, id: FaceId) -> HalfEdgeId {
        self.faces.get(id).unwrap_or_else(|| panic!("F:{id:?} not initialized")).boundary
    }

    /// All outgoing half-edges of a vertex in counter-clockwise order,
    /// starting from its `outgoing` pointer. Empty if the vertex has no
    /// incident edges.
    #[must_use]
    pub fn outgoing_edges(&self, id: VertexId) -> Vec<HalfEdgeId> {
        match self.verts.get(id).unwrap_or_else(|| panic!("V:{id:?} not initialized")).outgoing {
            Some(start) => self.outgoing_edges_from(start),
            None => vec![],
        }
    }

    // Same, but starting from the given outgoing half-edge.
    #[must_use]
    pub fn outgoing_edges_from(&self, start: HalfEdgeId) -> Vec<HalfEdgeId> {
        let mut result = vec![];
        let mut edge = start;
        loop {
            result.push(edge);
            edge = self.next_outgoing(edge);
            if edge == start {
                return result;
            }
        }
    }

    // The outgoing half-edge towards the given neighbor, if it exists.
    #[must_use]
    pub fn outgoing_to(&self, id: VertexId, neighbor: VertexId) -> Option<HalfEdgeId> {
        self.outgoing_edges(id).into_iter().find(|&e| self.destination(e) == neighbor)
    }

    #[must_use]
    pub fn degree(&self, id: VertexId) -> usize {
        self.outgoing_edges(id).len()
    }

    // The neighboring vertices, in counter-clockwise order.
    #[must_use]
    pub fn neighbors(&self, id: VertexId) -> Vec<VertexId> {
        self.outgoing_edges(id).iter().map(|&e| self.destination(e)).collect()
    }

    /// All boundary half-edges of a face, in order around the face, starting
    /// from its `boundary` pointer.
    #[must_use]
    pub fn boundary_edges(&self, id: FaceId) -> Vec<HalfEdgeId> {
        let start = self.boundary_edge(id);
        let mut result = vec![];
        let mut edge = start;
        loop {
            result.push(edge);
            edge = self.next(edge);
            if edge == start {
                return result;
            }
        }
    }

    #[must_use]
    pub fn boundary_vertices(&self, id: FaceId) -> Vec<VertexId> {
        self.boundary_edges(id).iter().map(|&e| self.origin(e)).collect()
    }

    /// Visits all faces reachable from `start` (not `start` itself) through
    /// half-edges for which `allow` returns true, in BFS order over the dual.
    /// The visitor receives each face together with the half-edge that was
    /// crossed to reach it (on the boundary of the face it was reached from).
    pub fn reachable_faces(
        &self,
        start: FaceId,
        allow: impl Fn(&Self, HalfEdgeId) -> bool,
        mut visit: impl FnMut(FaceId, HalfEdgeId),
    ) {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(face) = queue.pop_front() {
            for edge in self.boundary_edges(face) {
                if !allow(self, edge) {
                    continue;
                }
                let found = self.opposite_face(edge);
                if visited.insert(found) {
                    queue.push_back(found);
                    visit(found, edge);
                }
            }
        }
    }

    // The wedge between the given outgoing half-edge and the incoming one
    // preceding it.
    #[must_use]
    pub fn wedge(&self, outgoing: HalfEdgeId) -> Wedge {
        Wedge(outgoing)
    }

    // Searches the wedge at `v` lying on face `f`. If several exist, an
    // arbitrary one is returned.
    #[must_use]
    pub fn wedge_at(&self, v: VertexId, f: FaceId) -> Option<Wedge> {
        self.outgoing_edges(v).into_iter().find(|&e| self.face(e) == f).map(Wedge)
    }

    #[must_use]
    pub fn wedge_outgoing(&self, w: Wedge) -> HalfEdgeId {
        w.0
    }

    #[must_use]
    pub fn wedge_incoming(&self, w: Wedge) -> HalfEdgeId {
        self.previous(w.0)
    }

    #[must_use]
    pub fn wedge_vertex(&self, w: Wedge) -> VertexId {
        self.origin(w.0)
    }

    #[must_use]
    pub fn wedge_face(&self, w: Wedge) -> FaceId {
        self.face(w.0)
    }

    /// Sanity check: all pointers of live elements must point at live
    /// elements and the reciprocal invariants must hold (twins point at each
    /// other, next and previous are inverses, a vertex's outgoing edge
    /// originates there, a face's boundary edge is incident to it). Pass
    /// `check_faces = false` before faces have been added.
    ///
    /// Problems are logged at debug level; meant for tests and debug
    /// assertions.
    #[must_use]
    pub fn is_valid(&self, check_faces: bool) -> bool {
        for (id, v) in &self.verts {
            let Some(outgoing) = v.outgoing else {
                log::debug!("invalid: V:{id:?} has no outgoing edge");
                return false;
            };
            let Some(edge) = self.edges.get(outgoing) else {
                log::debug!("invalid: V:{id:?} outgoing edge is removed");
                return false;
            };
            if edge.origin != id {
                log::debug!("invalid: V:{id:?} outgoing edge originates elsewhere");
                return false;
            }
        }

        for (id, e) in &self.edges {
            if !self.verts.contains_key(e.origin) {
                log::debug!("invalid: E:{id:?} origin is removed");
                return false;
            }
            let (Some(twin), Some(next), Some(previous)) = (e.twin, e.next, e.previous) else {
                log::debug!("invalid: E:{id:?} has unset pointers");
                return false;
            };
            match self.edges.get(twin) {
                Some(t) if t.twin == Some(id) => {}
                _ => {
                    log::debug!("invalid: E:{id:?} twin mismatch");
                    return false;
                }
            }
            match self.edges.get(next) {
                Some(n) if n.previous == Some(id) => {}
                _ => {
                    log::debug!("invalid: E:{id:?} next/previous mismatch");
                    return false;
                }
            }
            match self.edges.get(previous) {
                Some(p) if p.next == Some(id) => {}
                _ => {
                    log::debug!("invalid: E:{id:?} previous/next mismatch");
                    return false;
                }
            }
            if check_faces {
                match e.face {
                    Some(face) if self.faces.contains_key(face) => {}
                    _ => {
                        log::debug!("invalid: E:{id:?} incident face unset or removed");
                        return false;
                    }
                }
            }
        }

        if check_faces {
            for (id, f) in &self.faces {
                match self.edges.get(f.boundary) {
                    Some(b) if b.face == Some(id) => {}
                    _ => {
                        log::debug!("invalid: F:{id:?} boundary edge mismatch");
                        return false;
                    }
                }
            }
        }

        true
    }
}

// Construction and surgery.
impl<V, E, F> Dcel<V, E, F> {
    // Adds a new, unconnected vertex.
    pub fn add_vertex(&mut self, data: V) -> VertexId {
        self.verts.insert(Vertex { outgoing: None, data })
    }

    // Adds a single half-edge with only its origin set. The caller still has
    // to create the twin and set the twin, next, previous and face pointers.
    pub fn add_half_edge(&mut self, origin: VertexId, data: E) -> HalfEdgeId {
        debug_assert!(self.verts.contains_key(origin));
        self.edges.insert(HalfEdge { origin, twin: None, next: None, previous: None, face: None, data })
    }

    // Adds a face with the given boundary edge. The incident-face pointers of
    // the boundary edges are not touched; `add_faces` is usually easier.
    pub fn add_face(&mut self, boundary: HalfEdgeId, data: F) -> FaceId {
        debug_assert!(self.edges.contains_key(boundary));
        self.faces.insert(Face { boundary, data })
    }

    pub fn set_outgoing(&mut self, v: VertexId, e: HalfEdgeId) {
        debug_assert_eq!(self.origin(e), v);
        self.verts[v].outgoing = Some(e);
    }

    // Makes two half-edges twins of each other.
    pub fn set_twins(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        self.edges[a].twin = Some(b);
        self.edges[b].twin = Some(a);
    }

    // Chains two half-edges: `b` follows `a` along their common face.
    pub fn set_next(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        self.edges[a].next = Some(b);
        self.edges[b].previous = Some(a);
    }

    pub fn set_face(&mut self, e: HalfEdgeId, f: FaceId) {
        self.edges[e].face = Some(f);
    }

    pub fn set_boundary(&mut self, f: FaceId, e: HalfEdgeId) {
        self.faces[f].boundary = e;
    }

    /// Removes a half-edge and its twin, merging their two incident faces.
    /// The incident face of `e` survives; the twin's face is discarded and
    /// its boundary edges are repainted. Endpoints that lose their last
    /// incident edge are removed as well. When both sides share a face
    /// (a dangling edge), no merge happens.
    pub fn remove_edge(&mut self, e: HalfEdgeId) {
        debug_assert!(self.edges.contains_key(e));
        let t = self.twin(e);
        let origin = self.origin(e);
        let destination = self.origin(t);

        let mut dead_verts = vec![];
        let mut dead_faces = vec![];

        // if the origin points at this edge, retarget its outgoing pointer;
        // if this was the last incident edge, the origin goes too
        if self.verts[origin].outgoing == Some(e) {
            if self.next_outgoing(e) == e {
                dead_verts.push(origin);
            } else {
                let retarget = self.next_outgoing(e);
                self.set_outgoing(origin, retarget);
            }
        }
        if self.verts[destination].outgoing == Some(t) {
            if self.next_outgoing(t) == t {
                dead_verts.push(destination);
            } else {
                let retarget = self.next_outgoing(t);
                self.set_outgoing(destination, retarget);
            }
        }

        // if a face points at this edge, retarget its boundary pointer (in
        // particular not to the twin, which is also going away)
        let fe = self.face(e);
        let ft = self.face(t);
        if self.faces[fe].boundary == e {
            if self.next(e) == t && self.previous(e) == t {
                dead_faces.push(fe);
            } else if self.next(e) == t {
                let retarget = self.previous(e);
                self.set_boundary(fe, retarget);
            } else {
                let retarget = self.next(e);
                self.set_boundary(fe, retarget);
            }
        }
        if self.faces[ft].boundary == t {
            if self.next(t) == e && self.previous(t) == e {
                dead_faces.push(ft);
            } else if self.next(t) == e {
                let retarget = self.previous(t);
                self.set_boundary(ft, retarget);
            } else {
                let retarget = self.next(t);
                self.set_boundary(ft, retarget);
            }
        }

        // merge the two incident faces if they are distinct: the twin's face
        // is discarded and its boundary repainted to the surviving face
        if fe != ft {
            dead_faces.push(ft);
            let start = self.boundary_edge(ft);
            let mut edge = start;
            loop {
                self.set_face(edge, fe);
                edge = self.next(edge);
                if edge == start {
                    break;
                }
            }
        }

        // splice the rings shut
        let p = self.previous(e);
        let n = self.next(t);
        self.set_next(p, n);
        let p = self.previous(t);
        let n = self.next(e);
        self.set_next(p, n);

        self.edges.remove(e);
        self.edges.remove(t);
        for v in dead_verts {
            self.verts.remove(v);
        }
        for f in dead_faces {
            self.faces.remove(f);
        }
    }

    /// Removes a vertex with all its incident edges, merging the surrounding
    /// faces into the incident face of `face_to_retain` (an outgoing edge of
    /// the vertex). Assumes the incident faces around the vertex are
    /// distinct.
    pub fn remove_vertex(&mut self, v: VertexId, face_to_retain: HalfEdgeId) {
        debug_assert_eq!(self.origin(face_to_retain), v);
        for e in self.outgoing_edges_from(face_to_retain) {
            if self.edges.contains_key(e) {
                self.remove_edge(e);
            }
        }
        debug_assert!(!self.verts.contains_key(v));
    }
}

// Bulk construction helpers; these fill in default payloads.
impl<V, E: Default, F: Default> Dcel<V, E, F> {
    /// Adds a twinned pair of half-edges between two vertices and returns the
    /// one originating at `origin`. Next, previous and face pointers remain
    /// unset.
    pub fn add_edge(&mut self, origin: VertexId, destination: VertexId) -> HalfEdgeId {
        let forward = self.add_half_edge(origin, E::default());
        let backward = self.add_half_edge(destination, E::default());
        self.set_twins(forward, backward);
        forward
    }

    /// Given a DCEL without faces but with complete next-pointer cycles,
    /// synthesizes one face per cycle and sets all incident-face pointers.
    pub fn add_faces(&mut self) {
        let mut marked = HashSet::new();
        let all: Vec<HalfEdgeId> = self.edges.keys().collect();
        for start in all {
            if marked.contains(&start) {
                continue;
            }
            let face = self.add_face(start, F::default());
            let mut edge = start;
            loop {
                marked.insert(edge);
                self.edges[edge].face = Some(face);
                edge = self.next(edge);
                if edge == start {
                    break;
                }
            }
        }
    }
}

// Split operations; these clone the payloads of the elements they copy.
impl<V: Clone, E: Default + Clone, F: Default> Dcel<V, E, F> {
    /// Splits a vertex into two along two of its outgoing edges.
    ///
    /// A copy `v'` of the vertex is created, along with copies `e1'` and
    /// `e2'` of the two edges that originate at `v'` instead. All edges
    /// strictly between `e2` and `e1` (walking counter-clockwise from `e2`)
    /// move to `v'`, and a new face bounded by `e1`, `e2'`, `e2` and `e1'`
    /// appears between the two vertex copies. The outgoing pointer of `v'`
    /// is `e1'`.
    pub fn split_vertex(&mut self, v: VertexId, e1: HalfEdgeId, e2: HalfEdgeId) -> VertexId {
        debug_assert_eq!(self.origin(e1), v);
        debug_assert_eq!(self.origin(e2), v);

        let vs = self.add_vertex(self.verts[v].data.clone());

        let e1s = self.add_edge(vs, self.destination(e1));
        self.edges[e1s].data = self.edges[e1].data.clone();
        let e1s_twin = self.twin(e1s);
        self.edges[e1s_twin].data = self.edges[self.twin(e1)].data.clone();

        let e2s = self.add_edge(vs, self.destination(e2));
        self.edges[e2s].data = self.edges[e2].data.clone();
        let e2s_twin = self.twin(e2s);
        self.edges[e2s_twin].data = self.edges[self.twin(e2)].data.clone();

        // the outgoing half-edge of v must not be one that moves to vs
        self.set_outgoing(v, e1);
        self.set_outgoing(vs, e1s);

        let e2_twin = self.twin(e2);

        self.set_next(e1s_twin, e2s);
        let p = self.previous(e1);
        self.set_next(p, e1s);
        let n = self.next(e2_twin);
        self.set_next(e2s_twin, n);
        self.set_next(e2_twin, e1);
        let p = self.previous(e2_twin);
        self.set_next(p, e2s_twin);
        self.set_next(e2s, e2_twin);
        let n = self.next(e1);
        self.set_next(e1s, n);
        self.set_next(e1, e1s_twin);

        let f = self.add_face(e1, F::default());
        let old_face_1 = self.face(e1);
        self.set_face(e1s, old_face_1);
        self.set_boundary(old_face_1, e1s);
        let old_face_2 = self.face(e2_twin);
        self.set_face(e2s_twin, old_face_2);
        self.set_boundary(old_face_2, e2s_twin);
        self.set_face(e1, f);
        self.set_face(e1s_twin, f);
        self.set_face(e2s, f);
        self.set_face(e2_twin, f);

        let mut edge = self.next_outgoing(e2s);
        while edge != e1s {
            self.edges[edge].origin = vs;
            edge = self.next_outgoing(edge);
        }

        vs
    }

    /// Splits a vertex into two along a wedge and an outgoing edge. Like
    /// `split_vertex`, but on the wedge side no edge copy is needed: the
    /// wedge's face is enlarged to absorb the twin of `e` and the new edge
    /// copy `e'`. The outgoing pointer of `v'` is `e'`.
    pub fn split_vertex_wedge_edge(&mut self, v: VertexId, w: Wedge, e: HalfEdgeId) -> VertexId {
        debug_assert_eq!(self.wedge_vertex(w), v);
        debug_assert_eq!(self.origin(e), v);

        let vs = self.add_vertex(self.verts[v].data.clone());

        let es = self.add_edge(vs, self.destination(e));
        self.edges[es].data = self.edges[e].data.clone();
        let es_twin = self.twin(es);
        self.edges[es_twin].data = self.edges[self.twin(e)].data.clone();

        self.set_outgoing(v, e);
        self.set_outgoing(vs, es);

        let e_twin = self.twin(e);
        let w_out = self.wedge_outgoing(w);
        let w_face = self.wedge_face(w);

        let w_in = self.wedge_incoming(w);
        self.set_next(w_in, es);
        let n = self.next(e_twin);
        self.set_next(es_twin, n);
        let p = self.previous(e_twin);
        self.set_next(p, es_twin);
        self.set_next(es, e_twin);
        self.set_next(e_twin, w_out);

        self.set_face(es_twin, self.face(e_twin));
        self.set_face(e_twin, w_face);
        self.set_face(es, w_face);

        let mut edge = self.next_outgoing(es);
        while edge != es {
            self.edges[edge].origin = vs;
            edge = self.next_outgoing(edge);
        }

        vs
    }

    /// Splits a vertex into two along two wedges of the same face. No new
    /// edges or faces appear; the rings are simply reconnected so that one
    /// sector stays at `v` and the other moves to the copy.
    pub fn split_vertex_wedges(&mut self, v: VertexId, w1: Wedge, w2: Wedge) -> VertexId {
        debug_assert_eq!(self.wedge_vertex(w1), v);
        debug_assert_eq!(self.wedge_vertex(w2), v);
        debug_assert_eq!(self.wedge_face(w1), self.wedge_face(w2));

        let vs = self.add_vertex(self.verts[v].data.clone());

        let w1_in = self.wedge_incoming(w1);
        let w2_in = self.wedge_incoming(w2);
        let w1_out = self.wedge_outgoing(w1);
        let w2_out = self.wedge_outgoing(w2);

        self.set_outgoing(v, w1_out);
        self.set_outgoing(vs, w2_out);

        self.set_next(w1_in, w2_out);
        self.set_next(w2_in, w1_out);

        let start = self.outgoing_edge(vs);
        let mut edge = start;
        loop {
            self.edges[edge].origin = vs;
            edge = self.next_outgoing(edge);
            if edge == start {
                break;
            }
        }

        vs
    }

    /// Splits a half-edge and its twin into two pairs of half-edges with a
    /// new degenerate two-edge face in between, and returns that face.
    pub fn split_edge(&mut self, e: HalfEdgeId) -> FaceId {
        let es = self.twin(e);
        let destination = self.destination(e);
        let origin = self.origin(e);

        let e_twin = self.add_half_edge(destination, self.edges[es].data.clone());
        self.set_twins(e, e_twin);
        let es_twin = self.add_half_edge(origin, self.edges[e].data.clone());
        self.set_twins(es, es_twin);

        self.set_next(e_twin, es_twin);
        self.set_next(es_twin, e_twin);

        let f = self.add_face(e_twin, F::default());
        self.set_face(e_twin, f);
        self.set_face(es_twin, f);
        f
    }
}

impl<V: Clone, E: Clone, F: Clone> Dcel<V, E, F> {
    /// Rebuilds the three arenas without the slots left behind by removals
    /// and returns the old-to-new key mappings. Compacting an already
    /// compact DCEL maps every key to itself.
    pub fn compact(&mut self) -> (VertexMap, HalfEdgeMap, FaceMap) {
        debug_assert!(self.is_valid(true));

        let mut verts = slotmap::SlotMap::with_key();
        let mut vert_map = VertexMap::new();
        for (old, v) in &self.verts {
            vert_map.insert(old, verts.insert(v.clone()));
        }

        let mut edges = slotmap::SlotMap::with_key();
        let mut edge_map = HalfEdgeMap::new();
        for (old, e) in &self.edges {
            edge_map.insert(old, edges.insert(e.clone()));
        }

        let mut faces = slotmap::SlotMap::with_key();
        let mut face_map = FaceMap::new();
        for (old, f) in &self.faces {
            face_map.insert(old, faces.insert(f.clone()));
        }

        for (_, v) in &mut verts {
            v.outgoing = v.outgoing.map(|e| *edge_map.get_by_left(&e).unwrap());
        }
        for (_, e) in &mut edges {
            e.origin = *vert_map.get_by_left(&e.origin).unwrap();
            e.twin = e.twin.map(|t| *edge_map.get_by_left(&t).unwrap());
            e.next = e.next.map(|n| *edge_map.get_by_left(&n).unwrap());
            e.previous = e.previous.map(|p| *edge_map.get_by_left(&p).unwrap());
            e.face = e.face.map(|f| *face_map.get_by_left(&f).unwrap());
        }
        for (_, f) in &mut faces {
            f.boundary = *edge_map.get_by_left(&f.boundary).unwrap();
        }

        self.verts = verts;
        self.edges = edges;
        self.faces = faces;

        debug_assert!(self.is_valid(true));
        (vert_map, edge_map, face_map)
    }
}

/// A path of half-edges in a DCEL, each edge starting where the previous one
/// ended.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct EdgePath {
    edges: Vec<HalfEdgeId>,
}

impl EdgePath {
    #[must_use]
    pub const fn new() -> Self {
        Self { edges: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn edges(&self) -> &[HalfEdgeId] {
        &self.edges
    }

    // Appends a half-edge; it must start at the current destination.
    pub fn push<V, E, F>(&mut self, dcel: &Dcel<V, E, F>, e: HalfEdgeId) {
        debug_assert!(
            self.edges.last().is_none_or(|&last| dcel.destination(last) == dcel.origin(e))
        );
        self.edges.push(e);
    }

    #[must_use]
    pub fn origin<V, E, F>(&self, dcel: &Dcel<V, E, F>) -> Option<VertexId> {
        self.edges.first().map(|&e| dcel.origin(e))
    }

    #[must_use]
    pub fn destination<V, E, F>(&self, dcel: &Dcel<V, E, F>) -> Option<VertexId> {
        self.edges.last().map(|&e| dcel.destination(e))
    }

    // All vertices along the path, from origin to destination.
    #[must_use]
    pub fn vertices<V, E, F>(&self, dcel: &Dcel<V, E, F>) -> Vec<VertexId> {
        let mut result: Vec<VertexId> = self.edges.iter().map(|&e| dcel.origin(e)).collect();
        if let Some(&last) = self.edges.last() {
            result.push(dcel.destination(last));
        }
        result
    }

    #[must_use]
    pub fn reversed<V, E, F>(&self, dcel: &Dcel<V, E, F>) -> Self {
        Self { edges: self.edges.iter().rev().map(|&e| dcel.twin(e)).collect() }
    }
}
