use crate::boundary::Boundary;
use crate::heightmap::Coordinate;
use crate::heightmap::Heightmap;
use crate::point::Point;
use serde::Deserialize;
use serde::Serialize;
use std::collections::VecDeque;

/// The graph that is extracted from the heightmap: a vertex per grid point
/// inside the boundary, plus three virtual vertices. The virtual source and
/// sink sit just outside the left and right of the grid at elevation -inf,
/// so that they form a global minimum below every real vertex; the virtual
/// maximum sits above the top of the grid at +inf. Connecting the boundary
/// to these vertices removes all boundary special cases from the Morse
/// analysis.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct InputGraph {
    verts: Vec<GraphVertex>,
}

// An adjacency in the graph. The disambiguation flag distinguishes the two
// parallel edges a vertex can have towards the virtual maximum (one crossing
// the top path, one crossing the bottom path), so they stay distinct edges
// when the DCEL is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacency {
    pub from: usize,
    pub to: usize,
    pub disambiguation: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphVertex {
    pub id: usize,
    pub p: Point,
    /// The adjacent vertices, in counter-clockwise order (with the
    /// y-coordinate increasing downwards).
    pub adj: Vec<Adjacency>,
}

impl GraphVertex {
    fn new(id: usize) -> Self {
        Self { id, p: Point::default(), adj: vec![] }
    }

    pub fn add_adjacency(&mut self, to: usize) {
        self.adj.push(Adjacency { from: self.id, to, disambiguation: false });
    }

    pub fn add_adjacency_disambiguated(&mut self, to: usize, disambiguation: bool) {
        self.adj.push(Adjacency { from: self.id, to, disambiguation });
    }
}

// The four axis directions in counter-clockwise order (y down): right, up,
// left, down.
const DX: [i32; 4] = [1, 0, -1, 0];
const DY: [i32; 4] = [0, -1, 0, 1];

// A directed grid edge: a source coordinate and a direction index.
#[derive(Copy, Clone, Debug)]
struct GridEdge {
    source: Coordinate,
    direction: usize,
}

impl GridEdge {
    fn between(p1: Coordinate, p2: Coordinate) -> Self {
        Self { source: p1, direction: direction_between(p1, p2).unwrap() }
    }

    fn destination(self) -> Coordinate {
        Coordinate::new(self.source.x + DX[self.direction], self.source.y + DY[self.direction])
    }
}

fn direction_between(p1: Coordinate, p2: Coordinate) -> Option<usize> {
    (0..4).find(|&i| p2.x == p1.x + DX[i] && p2.y == p1.y + DY[i])
}

// Per-coordinate marks of which of the four outgoing grid edges lie on a
// given boundary path.
struct EdgeMarks {
    width: usize,
    marks: Vec<[bool; 4]>,
}

impl EdgeMarks {
    fn new(width: usize, height: usize, path: &crate::path::GridPath) -> Self {
        let mut result = Self { width, marks: vec![[false; 4]; width * height] };
        for w in path.points.windows(2) {
            result.mark(w[0], direction_between(w[0], w[1]).unwrap());
            result.mark(w[1], direction_between(w[1], w[0]).unwrap());
        }
        result
    }

    fn mark(&mut self, c: Coordinate, direction: usize) {
        self.marks[self.width * c.y as usize + c.x as usize][direction] = true;
    }

    fn is_marked(&self, c: Coordinate, direction: usize) -> bool {
        self.marks[self.width * c.y as usize + c.x as usize][direction]
    }
}

impl InputGraph {
    pub const GLOBAL_SOURCE: usize = 0;
    pub const GLOBAL_SINK: usize = 1;
    pub const GLOBAL_MAXIMUM: usize = 2;

    #[must_use]
    pub const fn new() -> Self {
        Self { verts: Vec::new() }
    }

    // Builds the graph for the full extent of the heightmap.
    #[must_use]
    pub fn from_heightmap(heightmap: &Heightmap) -> Self {
        Self::with_boundary(heightmap, &Boundary::for_heightmap(heightmap))
    }

    /// Builds the graph for the part of the heightmap inside the boundary.
    ///
    /// Starting from a vertex on the bottom path, a BFS walks the region.
    /// Around every visited vertex the four axis directions are examined in
    /// counter-clockwise order while an inside flag toggles at every crossed
    /// boundary edge (which makes concave boundaries work). Edges crossing
    /// the top or bottom path connect to the virtual maximum; edges crossing
    /// the source or sink path connect to the virtual source or sink.
    #[must_use]
    pub fn with_boundary(heightmap: &Heightmap, boundary: &Boundary) -> Self {
        let mut graph = Self::new();
        let boundary = boundary.rasterize();

        let global_source = graph.add_vertex();
        graph[global_source].p =
            Point::new(-1., (heightmap.height() / 2) as f64, f64::NEG_INFINITY);
        let global_sink = graph.add_vertex();
        graph[global_sink].p =
            Point::new(heightmap.width() as f64, (heightmap.height() / 2) as f64, f64::NEG_INFINITY);
        let global_maximum = graph.add_vertex();
        graph[global_maximum].p =
            Point::new((heightmap.width() / 2) as f64, -1., f64::INFINITY);

        let (w, h) = (heightmap.width(), heightmap.height());
        let top_edges = EdgeMarks::new(w, h, &boundary.top);
        let bottom_edges = EdgeMarks::new(w, h, &boundary.bottom);
        let source_edges = EdgeMarks::new(w, h, &boundary.source);
        let sink_edges = EdgeMarks::new(w, h, &boundary.sink);

        // vertex_map[x][y] is the vertex representing grid point (x, y)
        let mut vertex_map: Vec<Option<usize>> = vec![None; w * h];
        let index = |c: Coordinate| w * c.y as usize + c.x as usize;

        let mut marked = vec![false; w * h];
        let mut queue = VecDeque::new();

        let start_edge = if boundary.is_clockwise() {
            GridEdge::between(boundary.bottom.points[1], boundary.bottom.points[0])
        } else {
            GridEdge::between(boundary.bottom.points[0], boundary.bottom.points[1])
        };
        queue.push_back(start_edge);
        let start = graph.add_vertex();
        graph[start].p = Point::new(
            f64::from(start_edge.source.x),
            f64::from(start_edge.source.y),
            heightmap.elevation_at(start_edge.source),
        );
        vertex_map[index(start_edge.source)] = Some(start);
        marked[index(start_edge.source)] = true;

        while let Some(edge) = queue.pop_front() {
            let origin = vertex_map[index(edge.source)].unwrap();

            // examine all four directions in counter-clockwise order,
            // toggling the inside flag at every crossed boundary edge
            let start_direction = edge.direction;
            let mut inside = true;

            for i in 0..4 {
                let direction = (i + start_direction) % 4;
                let destination = GridEdge { source: edge.source, direction }.destination();
                if !heightmap.is_in_bounds(destination) {
                    continue;
                }

                let on_top = top_edges.is_marked(edge.source, direction);
                let on_bottom = bottom_edges.is_marked(edge.source, direction);
                let on_source = source_edges.is_marked(edge.source, direction);
                let on_sink = sink_edges.is_marked(edge.source, direction);

                let origin_is_only_source = boundary.source.points.len() == 1
                    && f64::from(boundary.source.points[0].x) == graph[origin].p.x
                    && f64::from(boundary.source.points[0].y) == graph[origin].p.y;
                let origin_is_only_sink = boundary.sink.points.len() == 1
                    && f64::from(boundary.sink.points[0].x) == graph[origin].p.x
                    && f64::from(boundary.sink.points[0].y) == graph[origin].p.y;

                if i != 0 && (on_top || on_bottom || on_source || on_sink) {
                    inside = !inside;
                }

                if inside {
                    if on_top || on_bottom {
                        if origin_is_only_source {
                            graph[origin].add_adjacency(global_source);
                        } else if origin_is_only_sink {
                            graph[origin].add_adjacency(global_sink);
                        }
                        graph[origin].add_adjacency_disambiguated(global_maximum, on_bottom);
                    } else if on_source {
                        graph[origin].add_adjacency(global_source);
                    } else if on_sink {
                        graph[origin].add_adjacency(global_sink);
                    }
                }
                if on_top || on_bottom || on_source || on_sink || inside {
                    let vertex = match vertex_map[index(destination)] {
                        Some(v) => v,
                        None => {
                            let v = graph.add_vertex();
                            graph[v].p = Point::new(
                                f64::from(destination.x),
                                f64::from(destination.y),
                                heightmap.elevation_at(destination),
                            );
                            vertex_map[index(destination)] = Some(v);
                            v
                        }
                    };
                    graph[origin].add_adjacency(vertex);
                }
                if !inside {
                    if on_top || on_bottom {
                        graph[origin].add_adjacency_disambiguated(global_maximum, on_bottom);
                    } else if on_source {
                        graph[origin].add_adjacency(global_source);
                    } else if on_sink {
                        graph[origin].add_adjacency(global_sink);
                    }
                }

                if inside && !marked[index(destination)] {
                    marked[index(destination)] = true;
                    queue.push_back(GridEdge { source: destination, direction: (direction + 1) % 4 });
                }
            }

            // collapse consecutive duplicate adjacencies (including around
            // the wrap-around)
            let adj = &mut graph[origin].adj;
            let mut i = 1;
            while i < adj.len() {
                if adj[i] == adj[i - 1] {
                    adj.remove(i);
                } else {
                    i += 1;
                }
            }
            if adj.len() > 1 && adj.first() == adj.last() {
                adj.pop();
            }
        }

        // stitch the virtual vertices into the ring structure, in an order
        // that keeps the embedding planar
        for &c in &boundary.source.points {
            let v = vertex_map[index(c)].expect("source path vertex not visited");
            graph[global_source].add_adjacency(v);
        }
        graph[global_source].add_adjacency(global_maximum);

        for &c in &boundary.sink.points {
            let v = vertex_map[index(c)].expect("sink path vertex not visited");
            graph[global_sink].add_adjacency(v);
        }
        graph[global_sink].add_adjacency(global_maximum);

        graph[global_maximum].add_adjacency(global_source);
        for &c in &boundary.top.points {
            let v = vertex_map[index(c)].expect("top path vertex not visited");
            graph[global_maximum].add_adjacency_disambiguated(v, false);
        }
        graph[global_maximum].add_adjacency(global_sink);
        for &c in &boundary.bottom.points {
            let v = vertex_map[index(c)].expect("bottom path vertex not visited");
            graph[global_maximum].add_adjacency_disambiguated(v, true);
        }

        graph
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn add_vertex(&mut self) -> usize {
        let id = self.verts.len();
        self.verts.push(GraphVertex::new(id));
        id
    }

    // Whether any real vertex inside the boundary has a nodata elevation.
    // The Morse analysis is undefined on such graphs.
    #[must_use]
    pub fn contains_nodata(&self) -> bool {
        self.verts.iter().skip(3).any(|v| v.p.h.is_nan())
    }

    #[must_use]
    pub fn vertices(&self) -> &[GraphVertex] {
        &self.verts
    }
}

impl std::ops::Index<usize> for InputGraph {
    type Output = GraphVertex;
    fn index(&self, i: usize) -> &GraphVertex {
        &self.verts[i]
    }
}

impl std::ops::IndexMut<usize> for InputGraph {
    fn index_mut(&mut self, i: usize) -> &mut GraphVertex {
        &mut self.verts[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_map(size: usize) -> Heightmap {
        let mut map = Heightmap::new(size, size);
        for y in 0..size {
            for x in 0..size {
                map.set_elevation_at(Coordinate::new(x as i32, y as i32), 0.);
            }
        }
        map
    }

    #[test]
    fn all_grid_points_become_vertices() {
        let graph = InputGraph::from_heightmap(&flat_map(3));
        assert_eq!(graph.vertex_count(), 3 + 9);
    }

    #[test]
    fn virtual_vertices_are_extreme() {
        let graph = InputGraph::from_heightmap(&flat_map(3));
        assert_eq!(graph[InputGraph::GLOBAL_SOURCE].p.h, f64::NEG_INFINITY);
        assert_eq!(graph[InputGraph::GLOBAL_SINK].p.h, f64::NEG_INFINITY);
        assert_eq!(graph[InputGraph::GLOBAL_MAXIMUM].p.h, f64::INFINITY);
        assert_eq!(graph[InputGraph::GLOBAL_SOURCE].p.x, -1.);
        assert_eq!(graph[InputGraph::GLOBAL_SINK].p.x, 3.);
        assert_eq!(graph[InputGraph::GLOBAL_MAXIMUM].p.y, -1.);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let graph = InputGraph::from_heightmap(&flat_map(4));
        for v in graph.vertices() {
            for a in &v.adj {
                assert!(
                    graph[a.to].adj.iter().any(|b| b.to == v.id),
                    "adjacency {} -> {} has no inverse",
                    v.id,
                    a.to
                );
            }
        }
    }

    #[test]
    fn adjacency_counts_are_even_per_pair() {
        // every undirected edge appears exactly once in each endpoint's ring,
        // except for the doubled virtual-maximum edges which are flagged
        let graph = InputGraph::from_heightmap(&flat_map(3));
        for v in graph.vertices() {
            for a in &v.adj {
                let forward = v.adj.iter().filter(|b| *b == a).count();
                let backward = graph[a.to]
                    .adj
                    .iter()
                    .filter(|b| b.to == v.id && b.disambiguation == a.disambiguation)
                    .count();
                assert_eq!(forward, backward, "edge {} -> {} unbalanced", v.id, a.to);
            }
        }
    }

    #[test]
    fn boundary_restricts_region() {
        // only the left 2 columns of a 4x3 map
        let map = flat_map(4);
        let boundary = Boundary::rectangle(2, 4);
        let graph = InputGraph::with_boundary(&map, &boundary);
        for v in graph.vertices().iter().skip(3) {
            assert!(v.p.x <= 1.);
        }
    }

    #[test]
    fn nodata_detection() {
        let mut map = flat_map(3);
        map.set_elevation_at(Coordinate::new(1, 1), f64::NAN);
        let graph = InputGraph::from_heightmap(&map);
        assert!(graph.contains_nodata());
        assert!(!InputGraph::from_heightmap(&flat_map(3)).contains_nodata());
    }
}
