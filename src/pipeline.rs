use crate::boundary::Boundary;
use crate::error::Error;
use crate::heightmap::Heightmap;
use crate::inputdcel::InputDcel;
use crate::inputgraph::InputGraph;
use crate::mergetree::MergeTree;
use crate::mscomplex::MsComplex;
use crate::network::NetworkGraph;
use crate::simplify::simplify;
use crate::units::Units;
use std::sync::Arc;
use std::sync::RwLock;

// Options for one network extraction.
#[derive(Copy, Clone, Debug)]
pub struct ComputeOptions {
    /// Channels with delta at or below this threshold are dropped from the
    /// published network.
    pub delta_threshold: f64,
    pub build_merge_tree: bool,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self { delta_threshold: 0., build_merge_tree: false }
    }
}

/// All data belonging to a single frame of a river: the heightmap plus the
/// artefacts of the extraction pipeline.
///
/// The computation runs on a background worker while an interactive host
/// reads whatever has been published so far. Every artefact therefore sits
/// behind its own read-write lock and is immutable once published: the
/// worker builds an artefact completely, then takes the write lock only to
/// swap in the new reference. Readers take the read lock just long enough to
/// clone the `Arc` snapshot.
#[derive(Debug, Default)]
pub struct RiverFrame {
    pub name: String,
    pub heightmap: Heightmap,
    pub units: Units,
    input_graph: RwLock<Option<Arc<InputGraph>>>,
    input_dcel: RwLock<Option<Arc<InputDcel>>>,
    ms_complex: RwLock<Option<Arc<MsComplex>>>,
    merge_tree: RwLock<Option<Arc<MergeTree>>>,
    network_graph: RwLock<Option<Arc<NetworkGraph>>>,
}

impl RiverFrame {
    #[must_use]
    pub fn new(name: String, heightmap: Heightmap, units: Units) -> Self {
        Self { name, heightmap, units, ..Self::default() }
    }

    #[must_use]
    pub fn input_graph(&self) -> Option<Arc<InputGraph>> {
        self.input_graph.read().unwrap().clone()
    }

    #[must_use]
    pub fn input_dcel(&self) -> Option<Arc<InputDcel>> {
        self.input_dcel.read().unwrap().clone()
    }

    #[must_use]
    pub fn ms_complex(&self) -> Option<Arc<MsComplex>> {
        self.ms_complex.read().unwrap().clone()
    }

    #[must_use]
    pub fn merge_tree(&self) -> Option<Arc<MergeTree>> {
        self.merge_tree.read().unwrap().clone()
    }

    #[must_use]
    pub fn network_graph(&self) -> Option<Arc<NetworkGraph>> {
        self.network_graph.read().unwrap().clone()
    }

    fn publish<T>(slot: &RwLock<Option<Arc<T>>>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *slot.write().unwrap() = Some(Arc::clone(&value));
        value
    }

    /// Runs the whole extraction pipeline for this frame, publishing every
    /// intermediate artefact as soon as it is complete. Progress is reported
    /// as `(step name, percent)`. A failing step discards all later
    /// artefacts and reports the cause; earlier artefacts stay published.
    pub fn compute(
        &self,
        boundary: &Boundary,
        options: &ComputeOptions,
        progress: &mut dyn FnMut(&str, u32),
    ) -> Result<(), Error> {
        progress("Computing input graph", 0);
        if !boundary.rasterize().is_valid() {
            return Err(Error::InvalidBoundary(
                "the boundary visits a point more than once".into(),
            ));
        }
        let graph = InputGraph::with_boundary(&self.heightmap, boundary);
        if graph.contains_nodata() {
            return Err(Error::NodataInInterior);
        }
        progress("Computing input graph", 100);
        log::info!("input graph: {} vertices", graph.vertex_count());
        let graph = Self::publish(&self.input_graph, graph);

        progress("Computing input DCEL", 0);
        let mut dcel = InputDcel::from_graph(&graph);
        dcel.compute_gradient_flow();
        progress("Computing input DCEL", 100);
        log::info!(
            "input DCEL: {} vertices, {} half-edges, {} faces",
            dcel.mesh.nr_verts(),
            dcel.mesh.nr_edges(),
            dcel.mesh.nr_faces()
        );
        let dcel = Self::publish(&self.input_dcel, dcel);

        let mut msc = MsComplex::build(&dcel, &mut |p| progress("Computing MS complex", p))?;
        log::info!(
            "MS complex: {} minima, {} saddles, {} cells",
            msc.minima().len(),
            msc.saddles().len(),
            msc.mesh.nr_faces()
        );

        if options.build_merge_tree {
            progress("Computing merge tree", 0);
            let tree = MergeTree::build(&dcel, &msc);
            progress("Computing merge tree", 100);
            Self::publish(&self.merge_tree, tree);
        }

        simplify(&mut msc, &mut |p| progress("Simplifying MS complex", p));

        progress("Compacting MS complex", 0);
        msc.mesh.compact();
        progress("Compacting MS complex", 100);
        let msc = Self::publish(&self.ms_complex, msc);

        progress("Converting MS complex into network", 0);
        let network = NetworkGraph::from_ms_complex(&dcel, &msc)
            .filter_on_delta(options.delta_threshold);
        progress("Converting MS complex into network", 100);
        log::info!(
            "network: {} vertices, {} channels above threshold",
            network.vertex_count(),
            network.edge_count()
        );
        Self::publish(&self.network_graph, network);

        Ok(())
    }
}

/// Extracts the channel network of a heightmap inside a boundary: the whole
/// pipeline in one call, dropping channels with delta at or below
/// `delta_threshold`.
pub fn extract_network(
    heightmap: &Heightmap,
    boundary: &Boundary,
    units: Units,
    delta_threshold: f64,
    progress: &mut dyn FnMut(&str, u32),
) -> Result<NetworkGraph, Error> {
    let frame = RiverFrame::new(String::new(), heightmap.clone(), units);
    let options = ComputeOptions { delta_threshold, build_merge_tree: false };
    frame.compute(boundary, &options, progress)?;
    Ok(frame.network_graph().unwrap().as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::Coordinate;

    fn map_from(rows: &[&[f64]]) -> Heightmap {
        let mut map = Heightmap::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, &h) in row.iter().enumerate() {
                map.set_elevation_at(Coordinate::new(x as i32, y as i32), h);
            }
        }
        map
    }

    fn network_for(map: &Heightmap, threshold: f64) -> NetworkGraph {
        extract_network(
            map,
            &Boundary::for_heightmap(map),
            Units::default(),
            threshold,
            &mut |_, _| {},
        )
        .unwrap()
    }

    fn is_real(edge: &crate::network::NetworkEdge) -> bool {
        edge.path.iter().all(|p| p.x.is_finite() && p.y.is_finite() && p.h.is_finite())
            && edge.delta.is_finite()
    }

    #[test]
    fn flat_heightmap_yields_no_real_channels() {
        let map = map_from(&[&[0., 0., 0.], &[0., 0., 0.], &[0., 0., 0.]]);
        let network = network_for(&map, 0.);
        assert_eq!(network.edges.iter().filter(|e| is_real(e)).count(), 0);
    }

    #[test]
    fn single_peak_yields_one_channel_with_its_volume() {
        let mut rows = vec![vec![0.; 5]; 5];
        rows[2][2] = 10.;
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let map = map_from(&rows);
        let network = network_for(&map, 0.);

        // the eight triangles around the peak together hold 8 * (10 / 6)
        // units of sediment above the plain
        let expected = 8. * 10. / 6.;
        let deltas: Vec<f64> = network
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite() && *d > 0.)
            .collect();
        assert!(!deltas.is_empty(), "expected a surviving channel");
        for delta in deltas {
            assert!((delta - expected).abs() < 1e-9, "delta {delta} != {expected}");
        }
    }

    #[test]
    fn two_peaks_order_by_volume() {
        let mut rows = vec![vec![0.; 10]; 10];
        rows[3][3] = 1.;
        rows[7][7] = 2.;
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let map = map_from(&rows);

        let network = network_for(&map, 0.);
        let mut deltas: Vec<f64> = network
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite() && *d > 0.)
            .collect();
        deltas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        deltas.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let low = 8. * 1. / 6.;
        let high = 8. * 2. / 6.;
        assert!((deltas[0] - low).abs() < 1e-9, "lowest delta should be the small peak");
        assert!(
            deltas.last().unwrap() + 1e-9 >= high,
            "the large peak's channel must be at least its own volume"
        );

        // thresholding between the two volumes keeps only the larger peak
        let filtered = network_for(&map, (low + high) / 2.);
        let surviving: Vec<f64> = filtered
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite())
            .collect();
        assert!(!surviving.is_empty());
        assert!(surviving.iter().all(|d| *d > (low + high) / 2.));
    }

    #[test]
    fn three_peaks_vanish_in_order_of_significance() {
        let mut rows = vec![vec![0.; 15]; 5];
        rows[2][2] = 10.;
        rows[2][7] = 20.;
        rows[2][12] = 30.;
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let map = map_from(&rows);

        let count_at = |threshold: f64| {
            network_for(&map, threshold)
                .edges
                .iter()
                .filter(|e| e.delta.is_finite() && e.delta > 0.)
                .count()
        };

        let mut deltas: Vec<f64> = network_for(&map, 0.)
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite() && *d > 0.)
            .collect();
        deltas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        deltas.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        assert!(deltas.len() >= 3, "expected three significant saddles");

        // the least significant channel belongs to the smallest peak
        assert!((deltas[0] - 8. * 10. / 6.).abs() < 1e-9);

        // raising the threshold past each significance level strictly
        // shrinks the network
        let mut previous = count_at(0.);
        for pair in deltas.windows(2) {
            let current = count_at((pair[0] + pair[1]) / 2.);
            assert!(current < previous);
            previous = current;
        }
        let above_all = count_at(deltas.last().unwrap() + 1.);
        assert!(above_all < previous);
    }

    #[test]
    fn mirrored_heightmap_gives_mirrored_deltas() {
        // injective elevations so that no simulation-of-simplicity
        // tie-breaks are needed between real vertices
        let mut map = Heightmap::new(6, 4);
        let mut mirrored = Heightmap::new(6, 4);
        for y in 0..4i32 {
            for x in 0..6i32 {
                let h = ((x * 13 + y * 31) % 17) as f64 + 0.01 * f64::from(x + 7 * y);
                map.set_elevation_at(Coordinate::new(x, y), h);
                mirrored.set_elevation_at(Coordinate::new(5 - x, y), h);
            }
        }

        let mut deltas: Vec<f64> = network_for(&map, -1.)
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite())
            .collect();
        let mut mirrored_deltas: Vec<f64> = network_for(&mirrored, -1.)
            .edges
            .iter()
            .map(|e| e.delta)
            .filter(|d| d.is_finite())
            .collect();
        deltas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        mirrored_deltas.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert_eq!(deltas.len(), mirrored_deltas.len());
        for (a, b) in deltas.iter().zip(&mirrored_deltas) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn boundary_restricts_the_network() {
        let mut rows = vec![vec![0.; 8]; 4];
        rows[1][2] = 3.;
        rows[2][6] = 5.;
        let rows: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let map = map_from(&rows);

        let boundary = Boundary::rectangle(4, 4);
        let network = extract_network(
            &map,
            &boundary,
            Units::default(),
            0.,
            &mut |_, _| {},
        )
        .unwrap();
        for vertex in &network.verts {
            if vertex.p.h.is_finite() {
                assert!(vertex.p.x <= 4.);
            }
        }
        for edge in &network.edges {
            for p in edge.path.iter().filter(|p| p.h.is_finite()) {
                assert!(p.x <= 4.);
            }
        }
    }

    #[test]
    fn nodata_inside_the_boundary_is_refused() {
        let mut map = map_from(&[&[0., 0., 0.], &[0., 0., 0.], &[0., 0., 0.]]);
        map.set_elevation_at(Coordinate::new(1, 1), f64::NAN);
        let result = extract_network(
            &map,
            &Boundary::for_heightmap(&map),
            Units::default(),
            0.,
            &mut |_, _| {},
        );
        assert!(matches!(result, Err(Error::NodataInInterior)));
    }

    #[test]
    fn artefacts_are_published_in_order() {
        let map = map_from(&[&[0., 1., 0.], &[2., 0., 2.], &[0., 1., 0.]]);
        let frame = RiverFrame::new("test".into(), map, Units::default());
        assert!(frame.input_graph().is_none());
        assert!(frame.network_graph().is_none());

        let mut steps = vec![];
        frame
            .compute(
                &Boundary::for_heightmap(&frame.heightmap),
                &ComputeOptions { delta_threshold: 0., build_merge_tree: true },
                &mut |step, _| {
                    if steps.last().map(String::as_str) != Some(step) {
                        steps.push(step.to_string());
                    }
                },
            )
            .unwrap();

        assert!(frame.input_graph().is_some());
        assert!(frame.input_dcel().is_some());
        assert!(frame.ms_complex().is_some());
        assert!(frame.merge_tree().is_some());
        assert!(frame.network_graph().is_some());
        assert_eq!(
            steps,
            vec![
                "Computing input graph",
                "Computing input DCEL",
                "Computing MS complex",
                "Computing merge tree",
                "Simplifying MS complex",
                "Compacting MS complex",
                "Converting MS complex into network",
            ]
        );
    }

    #[test]
    fn progress_is_monotone_within_a_step() {
        let map = map_from(&[&[0., 1., 0.], &[2., 0., 2.], &[0., 1., 0.]]);
        let mut last: Option<(String, u32)> = None;
        network_for_with_progress(&map, &mut |step, percent| {
            if let Some((previous_step, previous)) = &last {
                if previous_step == step {
                    assert!(*previous <= percent);
                }
            }
            last = Some((step.to_string(), percent));
        });
    }

    fn network_for_with_progress(map: &Heightmap, progress: &mut dyn FnMut(&str, u32)) {
        extract_network(map, &Boundary::for_heightmap(map), Units::default(), 0., progress)
            .unwrap();
    }

    #[test]
    fn random_terrains_keep_the_invariants() {
        use rand::Rng;
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..5 {
            let mut map = Heightmap::new(6, 5);
            for y in 0..5 {
                for x in 0..6 {
                    map.set_elevation_at(Coordinate::new(x, y), rng.random_range(0.0..10.0));
                }
            }

            let frame = RiverFrame::new("random".into(), map, Units::default());
            frame
                .compute(
                    &Boundary::for_heightmap(&frame.heightmap),
                    &ComputeOptions::default(),
                    &mut |_, _| {},
                )
                .unwrap();

            let msc = frame.ms_complex().unwrap();
            assert!(msc.mesh.is_valid(true));
            for s in msc.saddles() {
                assert_eq!(msc.mesh.degree(s), 2);
            }
            for (_, edge) in &msc.mesh.edges {
                assert!(!edge.data.delta.is_nan());
                assert!(edge.data.delta >= 0.);
            }
        }
    }

    #[test]
    fn merge_tree_is_optional() {
        let map = map_from(&[&[0., 1., 0.], &[2., 0., 2.], &[0., 1., 0.]]);
        let frame = RiverFrame::new("test".into(), map, Units::default());
        frame
            .compute(
                &Boundary::for_heightmap(&frame.heightmap),
                &ComputeOptions::default(),
                &mut |_, _| {},
            )
            .unwrap();
        assert!(frame.merge_tree().is_none());
    }
}
