//! Pathfinding topology over patch vertices.
//!
//! Builds a graph whose nodes correspond 1:1 with patch vertices, minus the
//! blocked ones (wall and citadel vertices that are not gates). Vertices on
//! the border circumference are kept out of both exclusion lists so that
//! gates stay routable from both sides.

use std::collections::HashMap;

use crate::graph::{Graph, NodeId};
use crate::model::Model;
use crate::polygon::PointId;

pub struct Topology {
    pub graph: Graph,
    pt2node: HashMap<PointId, NodeId>,
    node2pt: Vec<PointId>,
    /// Vertices no street may pass through.
    pub blocked: Vec<PointId>,
    /// Nodes belonging to city patches; excluded when routing outward roads.
    pub inner: Vec<NodeId>,
    /// Nodes belonging to countryside patches; excluded when routing streets.
    pub outer: Vec<NodeId>,
}

impl Topology {
    pub fn new(model: &Model) -> Topology {
        let mut topology = Topology {
            graph: Graph::new(),
            pt2node: HashMap::new(),
            node2pt: Vec::new(),
            blocked: Vec::new(),
            inner: Vec::new(),
            outer: Vec::new(),
        };

        if let Some(citadel) = model.citadel {
            topology.blocked.extend(model.patch(citadel).shape.iter());
        }
        if let Some(wall) = model.wall() {
            topology.blocked.extend(wall.shape.iter());
        }
        topology.blocked.retain(|v| !model.gates.contains(v));

        let border_shape = model.border.as_ref().map(|b| b.shape.clone());

        for &pid in &model.patches {
            let patch = model.patch(pid);
            let within_city = patch.within_city;
            let len = patch.shape.len();
            if len == 0 {
                continue;
            }

            let mut v1 = patch.shape.get(len - 1);
            let mut n1 = topology.process_point(v1);

            for i in 0..len {
                let v0 = v1;
                v1 = patch.shape.get(i);
                let n0 = n1;
                n1 = topology.process_point(v1);

                if let Some(n0) = n0 {
                    let on_border = border_shape.as_ref().is_some_and(|b| b.contains(v0));
                    if !on_border {
                        if within_city {
                            topology.inner.push(n0);
                        } else {
                            topology.outer.push(n0);
                        }
                    }
                }

                if let (Some(n0), Some(n1)) = (n0, n1) {
                    let d = model.store.pos(v0).distance(&model.store.pos(v1));
                    topology.graph.link(n0, n1, d);
                }
            }
        }

        topology
    }

    /// Node for a vertex, creating it on first sight. Blocked vertices still
    /// get a node (so the mapping is total) but are reported as unusable.
    fn process_point(&mut self, v: PointId) -> Option<NodeId> {
        let n = match self.pt2node.get(&v) {
            Some(&n) => n,
            None => {
                let n = self.graph.add();
                self.pt2node.insert(v, n);
                self.node2pt.push(v);
                n
            }
        };
        if self.blocked.contains(&v) {
            None
        } else {
            Some(n)
        }
    }

    /// Route between two vertices, skipping the excluded nodes. The result
    /// is ordered `from -> to` and holds the shared vertex identities.
    pub fn build_path(
        &self,
        from: PointId,
        to: PointId,
        exclude: &[NodeId],
    ) -> Option<Vec<PointId>> {
        let start = *self.pt2node.get(&from)?;
        let goal = *self.pt2node.get(&to)?;
        let path = self.graph.shortest_path(start, goal, exclude)?;
        Some(path.into_iter().map(|n| self.node2pt[n.0]).collect())
    }

    /// All mapped vertices in node creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, PointId)> + '_ {
        self.node2pt.iter().enumerate().map(|(i, &p)| (NodeId(i), p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Feature, TownConfig};

    fn walled_town() -> Model {
        let config = TownConfig {
            n_patches: 10,
            seed: Some(11),
            plaza: Feature::Enabled,
            citadel: Feature::Disabled,
            walls: Feature::Enabled,
        };
        Model::new(&config).expect("generation should succeed")
    }

    #[test]
    fn test_wall_vertices_blocked_except_gates() {
        let model = walled_town();
        let topology = Topology::new(&model);

        let wall = model.wall().expect("walled town");
        for v in wall.shape.iter() {
            if model.gates.contains(&v) {
                assert!(!topology.blocked.contains(&v));
            } else {
                assert!(topology.blocked.contains(&v));
            }
        }
    }

    #[test]
    fn test_build_path_endpoint_identity() {
        let model = walled_town();
        let topology = Topology::new(&model);

        let gate = model.gates[0];
        let gate_pos = model.store.pos(gate);
        let plaza = model.plaza.expect("plaza enabled");
        let end = model
            .patch(plaza)
            .shape
            .min_vertex(&model.store, |v| v.distance(&gate_pos))
            .expect("plaza has vertices");

        let path = topology
            .build_path(gate, end, &topology.outer)
            .expect("street must be routable in a generated town");
        assert_eq!(path.first(), Some(&gate));
        assert_eq!(path.last(), Some(&end));
    }

    #[test]
    fn test_unreachable_returns_none() {
        let model = walled_town();
        let topology = Topology::new(&model);

        let gate = model.gates[0];
        // Excluding every node makes any non-trivial goal unreachable
        let all_nodes: Vec<_> = topology.nodes().map(|(n, _)| n).collect();
        let far = topology
            .nodes()
            .map(|(_, p)| p)
            .find(|&p| p != gate)
            .expect("more than one vertex");
        assert!(topology.build_path(gate, far, &all_nodes).is_none());
    }
}
