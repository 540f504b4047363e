use crate::dcel::HalfEdgeId;
use crate::dcel::VertexId;
use crate::mscomplex::MsComplex;
use ordered_float::OrderedFloat;

/// Persistence simplification: assigns to every Morse-Smale edge a
/// significance delta, the volume of sediment that has to be excavated
/// before the channel it represents disappears.
///
/// Saddles are processed from high to low on an internal scratch copy of the
/// complex. The significance of a saddle is the smaller of the volume-above
/// values of its two flanking Morse cells at the saddle height; after
/// recording it, the two cells are merged in the scratch (their volume
/// functions added and pruned above the saddle height) so that later,
/// lower saddles see the merged volumes. The published complex `msc` keeps
/// its full topology and only receives the delta annotations; a cleanup pass
/// then zeroes the deltas of dangling degree-1 branches and caps every
/// vertex's largest delta at its second-largest, which makes delta
/// non-increasing along any path walking away from a peak.
pub fn simplify(msc: &mut MsComplex, progress: &mut dyn FnMut(u32)) {
    // cloned slotmaps keep their keys, so scratch ids index `msc` directly
    let mut scratch = msc.clone();

    // saddles, sorted ascending in the point order
    let mut saddles = scratch.saddles();
    saddles.sort_by(|&a, &b| scratch.mesh.verts[a].data.p.sos_cmp(&scratch.mesh.verts[b].data.p));

    let total = saddles.len().max(1);
    for (done, &saddle) in saddles.iter().rev().enumerate() {
        progress((100 * done / total) as u32);

        let (delta, heaviest_side) = saddle_significance(&scratch, saddle);

        let e1 = scratch.mesh.outgoing_edge(saddle);
        let e2 = scratch.mesh.next_outgoing(e1);
        debug_assert_eq!(scratch.mesh.next_outgoing(e2), e1, "saddle of degree != 2");

        for e in [e1, e2] {
            let twin = msc.mesh.twin(e);
            msc.mesh.edges[e].data.delta = delta;
            msc.mesh.edges[twin].data.delta = delta;
        }

        if scratch.mesh.face(e1) != scratch.mesh.face(e2) {
            // merge the two flanking cells: add their volume functions,
            // prune above the saddle height, and keep the result on the
            // heavier side, which survives the edge removal
            let winner = scratch.mesh.face(heaviest_side);
            let other = scratch.mesh.next_outgoing(heaviest_side);
            let loser = scratch.mesh.face(other);

            let mut volume = scratch.mesh.faces[winner]
                .data
                .volume_above
                .add(&scratch.mesh.faces[loser].data.volume_above);
            volume.prune(scratch.mesh.verts[saddle].data.p.h);
            scratch.mesh.faces[winner].data.volume_above = volume;

            scratch.mesh.remove_edge(heaviest_side);
            // the second edge now dangles inside the merged face; removing
            // it takes the saddle with it
            if scratch.mesh.edges.contains_key(other) {
                scratch.mesh.remove_edge(other);
            }
        }
    }
    progress(100);

    cascade_deltas(msc);
}

// The significance of a saddle and the outgoing edge on its heavier side.
// NaN volumes (cells reaching the virtual maximum) count as +inf.
fn saddle_significance(msc: &MsComplex, saddle: VertexId) -> (f64, HalfEdgeId) {
    let saddle_height = msc.mesh.verts[saddle].data.p.h;

    let e1 = msc.mesh.outgoing_edge(saddle);
    let e2 = msc.mesh.next_outgoing(e1);
    let volume1 = volume_at(msc, e1, saddle_height);
    let volume2 = volume_at(msc, e2, saddle_height);

    if volume1 > volume2 { (volume2, e1) } else { (volume1, e2) }
}

fn volume_at(msc: &MsComplex, e: HalfEdgeId, height: f64) -> f64 {
    let volume = msc.mesh.faces[msc.mesh.face(e)].data.volume_above.eval(height);
    if volume.is_nan() { f64::INFINITY } else { volume }
}

// Iteratively zeroes the delta of dangling degree-1 branches and lowers any
// delta that is strictly larger than all others around a vertex down to the
// second-largest. The virtual source and sink minima (at height -inf) stay
// out of the cascade, so only finite, non-negative deltas are propagated and
// the fixed point is reached.
fn cascade_deltas(msc: &mut MsComplex) {
    loop {
        let mut changed = false;
        let verts: Vec<VertexId> = msc.mesh.verts.keys().collect();
        for v in verts {
            if msc.mesh.verts[v].data.p.h == f64::NEG_INFINITY {
                continue;
            }
            let mut edges = msc.mesh.outgoing_edges(v);
            if edges.len() == 1 {
                if msc.mesh.edges[edges[0]].data.delta > 0. {
                    set_delta(msc, edges[0], 0.);
                    changed = true;
                }
                continue;
            }
            edges.sort_by_key(|&e| std::cmp::Reverse(OrderedFloat(msc.mesh.edges[e].data.delta)));
            let largest = msc.mesh.edges[edges[0]].data.delta;
            let second = msc.mesh.edges[edges[1]].data.delta;
            if largest > second {
                set_delta(msc, edges[0], second);
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

fn set_delta(msc: &mut MsComplex, e: HalfEdgeId, delta: f64) {
    let twin = msc.mesh.twin(e);
    msc.mesh.edges[e].data.delta = delta;
    msc.mesh.edges[twin].data.delta = delta;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::Coordinate;
    use crate::heightmap::Heightmap;
    use crate::inputdcel::InputDcel;
    use crate::inputgraph::InputGraph;
    use crate::mscomplex::CriticalKind;

    fn simplified(rows: &[&[f64]]) -> MsComplex {
        let mut map = Heightmap::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &h) in row.iter().enumerate() {
                map.set_elevation_at(Coordinate::new(x as i32, y as i32), h);
            }
        }
        let graph = InputGraph::from_heightmap(&map);
        let mut dcel = InputDcel::from_graph(&graph);
        dcel.compute_gradient_flow();
        let mut msc = MsComplex::build(&dcel, &mut |_| {}).unwrap();
        simplify(&mut msc, &mut |_| {});
        msc
    }

    #[test]
    fn every_edge_gets_a_delta() {
        let msc = simplified(&[
            &[0., 0., 0., 0., 0.],
            &[0., 3., 0., 1., 0.],
            &[0., 0., 0., 0., 0.],
        ]);
        for (_, edge) in &msc.mesh.edges {
            assert!(!edge.data.delta.is_nan());
            assert!(edge.data.delta >= 0.);
        }
    }

    #[test]
    fn topology_is_preserved() {
        // simplification annotates; it must not change the published complex
        let msc = simplified(&[&[0., 1., 0.], &[2., 0., 2.], &[0., 1., 0.]]);
        assert!(msc.mesh.is_valid(true));
        for s in msc.saddles() {
            assert_eq!(msc.mesh.degree(s), 2);
        }
    }

    #[test]
    fn deltas_are_locally_monotone() {
        // after the cascade, no vertex outside the virtual minima has a
        // single delta strictly larger than all its others
        let msc = simplified(&[
            &[0., 0., 0., 0., 0., 0.],
            &[0., 4., 0., 0., 2., 0.],
            &[0., 0., 0., 7., 0., 0.],
            &[0., 0., 0., 0., 0., 0.],
        ]);
        for (v, vertex) in &msc.mesh.verts {
            if vertex.data.p.h == f64::NEG_INFINITY {
                continue;
            }
            let mut deltas: Vec<f64> =
                msc.mesh.outgoing_edges(v).iter().map(|&e| msc.mesh.edges[e].data.delta).collect();
            if deltas.len() < 2 {
                assert_eq!(deltas[0], 0.);
                continue;
            }
            deltas.sort_by_key(|&d| std::cmp::Reverse(OrderedFloat(d)));
            assert!(deltas[0] <= deltas[1], "lone largest delta at a vertex");
        }
    }

    #[test]
    fn two_peaks_give_the_lower_peak_a_smaller_delta() {
        // a tall and a short peak; the saddle between the short peak and
        // the rest must carry a smaller delta than the tall peak's channel
        let msc = simplified(&[
            &[0., 0., 0., 0., 0., 0., 0., 0.],
            &[0., 0., 0., 0., 0., 0., 0., 0.],
            &[0., 0., 8., 0., 0., 1., 0., 0.],
            &[0., 0., 0., 0., 0., 0., 0., 0.],
        ]);

        // collect per-saddle deltas of finite saddles
        let mut finite: Vec<f64> = msc
            .saddles()
            .into_iter()
            .filter(|&s| msc.mesh.verts[s].data.p.h.is_finite())
            .map(|s| msc.mesh.edges[msc.mesh.outgoing_edge(s)].data.delta)
            .filter(|d| *d > 0. && d.is_finite())
            .collect();
        finite.sort_by_key(|&d| OrderedFloat(d));
        // both peaks flank a saddle with positive finite significance, and
        // the lower peak's is strictly smaller
        assert!(finite.len() >= 2, "expected at least two significant saddles");
        assert!(finite[0] < finite[finite.len() - 1]);
    }

    #[test]
    fn minima_keep_their_kind() {
        let msc = simplified(&[&[0., 5., 0.], &[0., 5., 0.], &[0., 5., 0.]]);
        assert!(msc.minima().iter().all(|&m| {
            msc.mesh.verts[m].data.kind == CriticalKind::Minimum
        }));
    }
}
