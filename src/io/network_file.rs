use crate::error::Error;
use crate::network::NetworkEdge;
use crate::network::NetworkGraph;
use crate::network::NetworkVertex;
use crate::point::Point;
use crate::units::Units;
use std::collections::HashMap;
use std::io::Write;

/// Writes a network graph as text: one edge per line, the points of its
/// path as `x y h` triples followed by the delta value converted to cubic
/// meters.
pub fn write_network(
    graph: &NetworkGraph,
    units: &Units,
    writer: &mut impl Write,
) -> Result<(), Error> {
    for edge in &graph.edges {
        writeln!(writer, "{} {}", format_path(&edge.path), units.to_real_volume(edge.delta))?;
    }
    Ok(())
}

/// Writes the link sequence of a network graph: every maximal degree-2 chain
/// becomes one line, in the same `x y h ... delta` layout as the graph
/// writer.
pub fn write_link_sequence(
    graph: &NetworkGraph,
    units: &Units,
    writer: &mut impl Write,
) -> Result<(), Error> {
    for link in graph.links() {
        writeln!(writer, "{} {}", format_path(&link.path), units.to_real_volume(link.delta))?;
    }
    Ok(())
}

fn format_path(path: &[Point]) -> String {
    path.iter()
        .map(|p| format!("{} {} {}", p.x, p.y, p.h))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a network graph written by `write_network`. Endpoints are
/// reconstructed from the first and last point of every path, deduplicated
/// by exact coordinates.
pub fn read_network(content: &str, units: &Units) -> Result<NetworkGraph, Error> {
    let mut graph = NetworkGraph::default();
    let mut vertex_of: HashMap<(u64, u64, u64), usize> = HashMap::new();

    for (number, line) in content.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() % 3 != 1 || tokens.len() < 7 {
            return Err(Error::InvalidInput(format!(
                "Line {} should contain at least two x y h triples and a delta value",
                number + 1
            )));
        }

        let mut values = Vec::with_capacity(tokens.len());
        for token in &tokens {
            values.push(token.parse::<f64>().map_err(|_| {
                Error::InvalidInput(format!("Expected a number (was [{token}])"))
            })?);
        }

        let path: Vec<Point> =
            values.chunks_exact(3).map(|c| Point::new(c[0], c[1], c[2])).collect();
        let delta = units.from_real_volume(*values.last().unwrap());

        let from = ensure_vertex(&mut graph, &mut vertex_of, path[0]);
        let to = ensure_vertex(&mut graph, &mut vertex_of, *path.last().unwrap());
        graph.edges.push(NetworkEdge { from, to, path, delta });
    }

    Ok(graph)
}

fn ensure_vertex(
    graph: &mut NetworkGraph,
    vertex_of: &mut HashMap<(u64, u64, u64), usize>,
    p: Point,
) -> usize {
    let key = (p.x.to_bits(), p.y.to_bits(), p.h.to_bits());
    *vertex_of.entry(key).or_insert_with(|| {
        graph.verts.push(NetworkVertex { p });
        graph.verts.len() - 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> NetworkGraph {
        NetworkGraph {
            verts: vec![
                NetworkVertex { p: Point::new(0., 0., 1.5) },
                NetworkVertex { p: Point::new(2., 1., 0.25) },
            ],
            edges: vec![NetworkEdge {
                from: 0,
                to: 1,
                path: vec![
                    Point::new(0., 0., 1.5),
                    Point::new(1., 0., 0.75),
                    Point::new(2., 1., 0.25),
                ],
                delta: 0.125,
            }],
        }
    }

    #[test]
    fn write_then_read_preserves_points_and_deltas() {
        let graph = sample_graph();
        let units = Units::new(2., 3.);

        let mut buffer = vec![];
        write_network(&graph, &units, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let read_back = read_network(&text, &units).unwrap();
        assert_eq!(read_back.edge_count(), 1);
        assert_eq!(read_back.edges[0].path, graph.edges[0].path);
        assert_eq!(read_back.edges[0].delta, graph.edges[0].delta);
        assert_eq!(read_back.vertex_count(), 2);
    }

    #[test]
    fn delta_is_written_in_cubic_meters() {
        let graph = sample_graph();
        let units = Units::new(2., 2.);
        let mut buffer = vec![];
        write_network(&graph, &units, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        // 0.125 grid volume at 2m x 2m cells is 0.5 cubic meters
        assert!(text.trim().ends_with("0.5"));
    }

    #[test]
    fn infinite_deltas_survive_the_round_trip() {
        let mut graph = sample_graph();
        graph.edges[0].delta = f64::INFINITY;
        let units = Units::default();
        let mut buffer = vec![];
        write_network(&graph, &units, &mut buffer).unwrap();
        let read_back = read_network(&String::from_utf8(buffer).unwrap(), &units).unwrap();
        assert_eq!(read_back.edges[0].delta, f64::INFINITY);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let units = Units::default();
        assert!(matches!(read_network("1 2 3 4", &units), Err(Error::InvalidInput(_))));
        assert!(matches!(
            read_network("0 0 1 1 0 1 x", &units),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn link_sequence_collapses_chains() {
        // two edges meeting in a degree-2 vertex become one line
        let graph = NetworkGraph {
            verts: vec![
                NetworkVertex { p: Point::new(0., 0., 0.) },
                NetworkVertex { p: Point::new(1., 0., 0.) },
                NetworkVertex { p: Point::new(2., 0., 0.) },
            ],
            edges: vec![
                NetworkEdge {
                    from: 0,
                    to: 1,
                    path: vec![Point::new(0., 0., 0.), Point::new(1., 0., 0.)],
                    delta: 2.,
                },
                NetworkEdge {
                    from: 1,
                    to: 2,
                    path: vec![Point::new(1., 0., 0.), Point::new(2., 0., 0.)],
                    delta: 1.,
                },
            ],
        };
        let mut buffer = vec![];
        write_link_sequence(&graph, &Units::default(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        // three points and the minimum delta of the chain
        assert_eq!(lines[0].split_whitespace().count(), 10);
        assert!(lines[0].ends_with('1'));
    }
}
