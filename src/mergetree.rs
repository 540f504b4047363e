use crate::dcel::FaceId;
use crate::dcel::VertexId;
use crate::inputdcel::InputDcel;
use crate::mscomplex::MsComplex;
use crate::point::Point;
use petgraph::unionfind::UnionFind;
use serde::Deserialize;
use serde::Serialize;
use slotmap::SecondaryMap;
use std::cmp::Ordering;

// The critical cell behind a merge tree node: a Morse-Smale face for a leaf
// (a maximum), a saddle vertex for an internal node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeSimplex {
    Maximum(FaceId),
    Saddle(VertexId),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeNode {
    pub index: usize,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub p: Point,
    // The aggregate volume above this node's own height over all maxima in
    // its subtree.
    pub volume_above: f64,
    pub simplex: MergeSimplex,
}

/// The merge tree of a Morse-Smale complex: one leaf per maximum, and one
/// internal node per saddle at which two super-level-set components merge as
/// the water level lowers. Supports the subtree queries an interactive host
/// needs: sorting children by an arbitrary comparator and walking to the
/// deepest ancestor still above a given height.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct MergeTree {
    nodes: Vec<MergeNode>,
}

impl MergeTree {
    /// Builds the merge tree by sweeping the saddles from high to low and
    /// joining the components of their two flanking Morse cells, tracked in
    /// a disjoint-set over the faces.
    #[must_use]
    pub fn build(input: &InputDcel, msc: &MsComplex) -> Self {
        let mut tree = Self::default();

        // a leaf per Morse-Smale face, at the position of its maximum
        let face_ids: Vec<FaceId> = msc.mesh.faces.keys().collect();
        let mut dense_index: SecondaryMap<FaceId, usize> = SecondaryMap::new();
        // the current subtree root of each disjoint set, indexed by the
        // set representative
        let mut root_node: Vec<usize> = Vec::with_capacity(face_ids.len());
        for (i, &f) in face_ids.iter().enumerate() {
            dense_index.insert(f, i);
            let maximum = msc.mesh.faces[f].data.maximum.expect("face without maximum");
            let node =
                tree.add_node(MergeSimplex::Maximum(f), input.mesh.faces[maximum].data.p, vec![]);
            root_node.push(node);
        }

        let mut saddles = msc.saddles();
        saddles.sort_by(|&a, &b| {
            msc.mesh.verts[b].data.p.sos_cmp(&msc.mesh.verts[a].data.p)
        });

        let mut components: UnionFind<usize> = UnionFind::new(face_ids.len());
        for saddle in saddles {
            let e1 = msc.mesh.outgoing_edge(saddle);
            let e2 = msc.mesh.next_outgoing(e1);
            let f1 = dense_index[msc.mesh.face(e1)];
            let f2 = dense_index[msc.mesh.face(e2)];

            let r1 = components.find(f1);
            let r2 = components.find(f2);
            if r1 == r2 {
                continue;
            }

            let p = msc.mesh.verts[saddle].data.p;
            let children = vec![root_node[r1], root_node[r2]];
            let node = tree.add_node(MergeSimplex::Saddle(saddle), p, children);
            tree.nodes[node].volume_above = tree.subtree_volume(msc, node, p.h);

            components.union(r1, r2);
            root_node[components.find(f1)] = node;
        }

        tree
    }

    fn add_node(&mut self, simplex: MergeSimplex, p: Point, children: Vec<usize>) -> usize {
        let index = self.nodes.len();
        for &child in &children {
            self.nodes[child].parent = Some(index);
        }
        self.nodes.push(MergeNode {
            index,
            children,
            parent: None,
            p,
            volume_above: 0.,
            simplex,
        });
        index
    }

    // The aggregate volume above `height` of all maxima below `node`.
    fn subtree_volume(&self, msc: &MsComplex, node: usize, height: f64) -> f64 {
        match self.nodes[node].simplex {
            MergeSimplex::Maximum(f) => msc.mesh.faces[f].data.volume_above.eval(height),
            MergeSimplex::Saddle(_) => self.nodes[node]
                .children
                .iter()
                .map(|&child| self.subtree_volume(msc, child, height))
                .sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    // The root: the last node added, belonging to the topmost merge.
    #[must_use]
    pub fn root(&self) -> &MergeNode {
        self.nodes.last().expect("empty merge tree")
    }

    #[must_use]
    pub fn get(&self, index: usize) -> &MergeNode {
        &self.nodes[index]
    }

    /// Stably sorts the children of every node with the given comparator.
    pub fn sort(&mut self, mut comparator: impl FnMut(&MergeNode, &MergeNode) -> Ordering) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by(|&a, &b| comparator(&self.nodes[a], &self.nodes[b]));
            self.nodes[i].children = children;
        }
    }

    /// The deepest ancestor of `node` (possibly `node` itself) whose height
    /// is still above `height`, or `None` if `node` is already below it.
    #[must_use]
    pub fn parent_at_height(&self, node: usize, height: f64) -> Option<usize> {
        if self.nodes[node].p.h < height {
            return None;
        }
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if self.nodes[parent].p.h <= height {
                break;
            }
            current = parent;
        }
        Some(current)
    }
}
