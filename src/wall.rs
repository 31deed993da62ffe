//! City wall construction: shape derivation, gate placement, towers.

use tracing::debug;

use crate::error::GenerationError;
use crate::geometry::Point;
use crate::model::{Model, PatchId};
use crate::polygon::{PointId, Polygon};

/// A wall around a set of patches: the circumference polygon, a per-edge
/// wall-segment mask, the gates (a subset of shape vertices) and towers.
///
/// Virtual walls (`real == false`) are built for unwalled cities too; they
/// carry the border shape and gates but no towers and no smoothing.
#[derive(Debug, Clone)]
pub struct CurtainWall {
    pub shape: Polygon,
    /// True where the matching shape edge is an actual wall segment.
    pub segments: Vec<bool>,
    pub gates: Vec<PointId>,
    pub towers: Vec<Point>,
    real: bool,
    patches: Vec<PatchId>,
}

impl CurtainWall {
    pub fn new(
        real: bool,
        model: &mut Model,
        patches: Vec<PatchId>,
        reserved: &[PointId],
    ) -> Result<CurtainWall, GenerationError> {
        let shape = if patches.len() == 1 {
            // Shares vertices with the patch
            model.patch(patches[0]).shape.clone()
        } else {
            let shape = model.find_circumference(&patches)?;

            if real {
                // Smooth the wall in place, sparing reserved vertices.
                // Mutating the shared points bends the bordering patches too.
                let smooth_factor = 1.0_f64.min(40.0 / patches.len() as f64);
                let smoothed: Vec<Point> = shape
                    .iter()
                    .map(|v| {
                        if reserved.contains(&v) {
                            model.store.pos(v)
                        } else {
                            shape.smooth_vertex(&model.store, v, smooth_factor)
                        }
                    })
                    .collect();
                for (i, v) in shape.iter().enumerate() {
                    model.store.set(v, smoothed[i]);
                }
            }

            shape
        };

        let segments = vec![true; shape.len()];
        let mut wall = CurtainWall {
            shape,
            segments,
            gates: Vec::new(),
            towers: Vec::new(),
            real,
            patches,
        };
        wall.build_gates(real, model, reserved)?;
        Ok(wall)
    }

    pub fn is_real(&self) -> bool {
        self.real
    }

    fn build_gates(
        &mut self,
        real: bool,
        model: &mut Model,
        reserved: &[PointId],
    ) -> Result<(), GenerationError> {
        self.gates.clear();

        // Entrances are shape vertices touching more than one of the walled
        // patches; for a single-patch wall any non-reserved vertex works.
        let mut entrances: Vec<PointId> = if self.patches.len() > 1 {
            self.shape
                .iter()
                .filter(|&v| {
                    !reserved.contains(&v)
                        && self
                            .patches
                            .iter()
                            .filter(|&&p| model.patch(p).shape.contains(v))
                            .count()
                            > 1
                })
                .collect()
        } else {
            self.shape.iter().filter(|&v| !reserved.contains(&v)).collect()
        };

        if entrances.is_empty() {
            return Err(GenerationError::NoEntrances);
        }

        loop {
            let index = model.rng.int(0, entrances.len());
            let gate = entrances[index];
            self.gates.push(gate);

            if real {
                // A gate with exactly one patch on the outside gets room for
                // an outward road: the outer patch is split along the line
                // from the gate to its farthest outward vertex.
                let outer_wards: Vec<PatchId> = model
                    .patch_by_vertex(gate)
                    .into_iter()
                    .filter(|p| !self.patches.contains(p))
                    .collect();

                if outer_wards.len() == 1 {
                    let outer = outer_wards[0];
                    if model.patch(outer).shape.len() > 3 {
                        let wall_dir = model.store.pos(self.shape.next(gate))
                            - model.store.pos(self.shape.prev(gate));
                        let out = Point::new(wall_dir.y, -wall_dir.x);

                        let gate_pos = model.store.pos(gate);
                        let shape = &self.shape;
                        let farthest = model.patch(outer).shape.max_vertex(
                            &model.store,
                            |v, pos| {
                                if shape.contains(v) || reserved.contains(&v) {
                                    f64::NEG_INFINITY
                                } else {
                                    let dir = pos - gate_pos;
                                    dir.dot(&out) / dir.length()
                                }
                            },
                        );

                        if let Some(farthest) = farthest {
                            let halves = model.patch(outer).shape.split(gate, farthest);
                            debug!(gate = ?gate, "splitting outer patch for a road");
                            model.replace_patch(outer, halves);
                        }
                    }
                }
            }

            // Prune nearby entrances so gates never bunch up. The window is
            // asymmetric at the ends of the candidate list.
            if index == 0 {
                if entrances.len() > 2 {
                    entrances.drain(0..2);
                } else {
                    entrances.clear();
                }
                entrances.pop();
            } else if index == entrances.len() - 1 {
                entrances.drain(index - 1..);
                if !entrances.is_empty() {
                    entrances.remove(0);
                }
            } else {
                let end = (index + 2).min(entrances.len());
                entrances.drain(index - 1..end);
            }

            if entrances.len() < 3 {
                break;
            }
        }

        if self.gates.is_empty() {
            return Err(GenerationError::NoEntrances);
        }

        if real {
            for &gate in &self.gates {
                let smoothed = self.shape.smooth_vertex(&model.store, gate, 1.0);
                model.store.set(gate, smoothed);
            }
        }

        Ok(())
    }

    /// Place towers on wall vertices that are not gates.
    pub fn build_towers(&mut self, model: &Model) {
        self.towers.clear();
        if !self.real {
            return;
        }
        let len = self.shape.len();
        for i in 0..len {
            let t = self.shape.get(i);
            if self.gates.contains(&t) {
                continue;
            }
            if self.segments[(i + len - 1) % len] || self.segments[i] {
                self.towers.push(model.store.pos(t));
            }
        }
    }

    /// Distance from the origin to the farthest wall vertex.
    pub fn radius(&self, model: &Model) -> f64 {
        self.shape
            .iter()
            .map(|v| model.store.pos(v).length())
            .fold(0.0, f64::max)
    }

    /// True if the directed patch edge `v0 -> v1` runs along a wall segment.
    /// Patches inside the wall traverse its shape forwards, outside patches
    /// backwards.
    pub fn borders_by(&self, patch: PatchId, v0: PointId, v1: PointId) -> bool {
        let within_walls = self.patches.contains(&patch);
        let index = if within_walls {
            self.shape.find_edge(v0, v1)
        } else {
            self.shape.find_edge(v1, v0)
        };
        matches!(index, Some(i) if i < self.segments.len() && self.segments[i])
    }

    /// True if any edge of the patch runs along a wall segment.
    pub fn borders(&self, model: &Model, patch: PatchId) -> bool {
        let within_walls = self.patches.contains(&patch);
        let len = self.shape.len();
        for i in 0..len {
            if !self.segments[i] {
                continue;
            }
            let v0 = self.shape.get(i);
            let v1 = self.shape.get((i + 1) % len);
            let found = if within_walls {
                model.patch(patch).shape.find_edge(v0, v1)
            } else {
                model.patch(patch).shape.find_edge(v1, v0)
            };
            if found.is_some() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Feature, TownConfig};
    use crate::model::Model;

    fn town(walls: Feature, seed: u32) -> Model {
        let config = TownConfig {
            n_patches: 12,
            seed: Some(seed),
            plaza: Feature::Enabled,
            citadel: Feature::Disabled,
            walls,
        };
        Model::new(&config).expect("generation should succeed")
    }

    #[test]
    fn test_gates_are_shape_vertices() {
        let model = town(Feature::Enabled, 3);
        let wall = model.wall().expect("walled town");

        assert!(!wall.gates.is_empty());
        for &gate in &wall.gates {
            assert!(wall.shape.contains(gate));
        }
    }

    #[test]
    fn test_towers_avoid_gates() {
        let model = town(Feature::Enabled, 3);
        let wall = model.wall().expect("walled town");

        for tower in &wall.towers {
            for &gate in &wall.gates {
                assert!(tower.distance(&model.store.pos(gate)) > 1e-9);
            }
        }
    }

    #[test]
    fn test_virtual_wall_has_gates_but_no_towers() {
        let model = town(Feature::Disabled, 5);
        assert!(model.wall().is_none());

        let border = model.border.as_ref().expect("border always exists");
        assert!(!border.is_real());
        assert!(!border.gates.is_empty());
        assert!(border.towers.is_empty());
    }

    #[test]
    fn test_some_inner_patch_touches_the_wall() {
        let model = town(Feature::Enabled, 3);
        let wall = model.wall().expect("walled town");

        assert!(wall.radius(&model) > 0.0);
        let touching = model
            .inner
            .iter()
            .filter(|&&p| wall.borders(&model, p))
            .count();
        assert!(touching > 0);
    }
}
