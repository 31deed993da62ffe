//! Town model: the generation pipeline and its result.
//!
//! Generation runs as a fixed sequence of stages (patches, junctions, walls,
//! streets, wards, geometry) inside a bounded retry loop. Any stage may fail
//! on degenerate geometry or a quality gate; the loop then throws away every
//! partial structure and starts over, continuing the same random stream, so
//! one seed always produces one town.

use tracing::{debug, info};

use crate::config::{Feature, TownConfig};
use crate::error::GenerationError;
use crate::polygon::{PointId, PointStore, Polygon};
use crate::random::GenRng;
use crate::topology::Topology;
use crate::voronoi::{Region, Voronoi};
use crate::wall::CurtainWall;
use crate::wards::{self, Ward, WardKind};

/// Index of a patch in the model's arena.
pub type PatchId = usize;

const RETRY_LIMIT: u32 = 100;

/// Distance under which adjacent vertices are merged into one.
const JUNCTION_MERGE_DISTANCE: f64 = 8.0;

/// One Voronoi cell turned into a city district.
#[derive(Debug, Clone)]
pub struct Patch {
    pub shape: Polygon,
    pub within_city: bool,
    pub within_walls: bool,
    pub ward: Option<Ward>,
}

impl Patch {
    pub fn new(shape: Polygon) -> Patch {
        Patch { shape, within_city: false, within_walls: false, ward: None }
    }

    pub fn from_region(region: &Region, voronoi: &Voronoi) -> Patch {
        Patch::new(region.polygon(voronoi))
    }
}

/// Ward type quotas, consumed in order during assignment. Heavily weighted
/// towards craftsmen districts.
const WARD_QUOTAS: [WardKind; 36] = [
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Merchant,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Cathedral,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Administration,
    WardKind::Craftsmen,
    WardKind::Slum,
    WardKind::Craftsmen,
    WardKind::Slum,
    WardKind::Patriciate,
    WardKind::Market,
    WardKind::Slum,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Slum,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Craftsmen,
    WardKind::Military,
    WardKind::Slum,
    WardKind::Craftsmen,
    WardKind::Park,
    WardKind::Patriciate,
    WardKind::Market,
    WardKind::Merchant,
];

/// A generated town.
pub struct Model {
    pub store: PointStore,
    pub rng: GenRng,

    n_patches: usize,
    plaza_needed: bool,
    citadel_needed: bool,
    walls_needed: bool,

    all_patches: Vec<Patch>,
    /// Working list of live patches.
    pub patches: Vec<PatchId>,
    /// City patches: inside the walls for a walled city, otherwise simply
    /// the urban ones.
    pub inner: Vec<PatchId>,
    pub citadel: Option<PatchId>,
    pub plaza: Option<PatchId>,
    /// Central junction: the vertex of the first patch nearest the origin.
    pub center: Option<PointId>,

    /// Outer boundary of the city; a real wall when walls are enabled.
    pub border: Option<CurtainWall>,

    pub city_radius: f64,
    /// All entrances, including castle gates.
    pub gates: Vec<PointId>,

    pub streets: Vec<Polygon>,
    pub roads: Vec<Polygon>,
    /// Streets and roads merged into a duplicate-free segment set.
    pub arteries: Vec<Polygon>,
}

impl Model {
    /// Generate a town. Retries on failure up to a fixed budget, continuing
    /// the same random stream on every attempt.
    pub fn new(config: &TownConfig) -> Result<Model, GenerationError> {
        let seed = config.resolved_seed();
        let mut rng = GenRng::new(seed);

        let n_patches = config.n_patches;
        let plaza_needed = match config.plaza {
            Feature::Random => rng.bool(0.5),
            f => f == Feature::Enabled,
        };
        let citadel_needed = match config.citadel {
            Feature::Random => rng.bool(0.5),
            f => f == Feature::Enabled,
        };
        let walls_needed = match config.walls {
            Feature::Random => rng.bool(0.5),
            f => f == Feature::Enabled,
        };

        let mut model = Model {
            store: PointStore::new(),
            rng,
            n_patches,
            plaza_needed,
            citadel_needed,
            walls_needed,
            all_patches: Vec::new(),
            patches: Vec::new(),
            inner: Vec::new(),
            citadel: None,
            plaza: None,
            center: None,
            border: None,
            city_radius: 0.0,
            gates: Vec::new(),
            streets: Vec::new(),
            roads: Vec::new(),
            arteries: Vec::new(),
        };

        for attempt in 0..RETRY_LIMIT {
            match model.build() {
                Ok(()) => {
                    info!(seed, attempt, patches = model.patches.len(), "town generated");
                    return Ok(model);
                }
                Err(err) => {
                    debug!(attempt, %err, "build attempt failed, retrying");
                    model.reset();
                }
            }
        }
        Err(GenerationError::RetriesExhausted { attempts: RETRY_LIMIT })
    }

    /// Discard all partial state. The random stream is deliberately kept.
    fn reset(&mut self) {
        self.store = PointStore::new();
        self.all_patches.clear();
        self.patches.clear();
        self.inner.clear();
        self.citadel = None;
        self.plaza = None;
        self.center = None;
        self.border = None;
        self.city_radius = 0.0;
        self.gates.clear();
        self.streets.clear();
        self.roads.clear();
        self.arteries.clear();
    }

    fn build(&mut self) -> Result<(), GenerationError> {
        self.streets.clear();
        self.roads.clear();

        self.build_patches()?;
        self.optimize_junctions();
        self.build_walls()?;
        self.build_streets()?;
        self.create_wards();
        self.build_geometry();
        Ok(())
    }

    // === Stage 1: patches ===

    fn build_patches(&mut self) -> Result<(), GenerationError> {
        let sa = self.rng.float() * 2.0 * std::f64::consts::PI;

        let mut points = Vec::with_capacity(self.n_patches * 8);
        for i in 0..self.n_patches * 8 {
            let a = sa + (i as f64).sqrt() * 5.0;
            let r = if i == 0 {
                0.0
            } else {
                10.0 + i as f64 * (2.0 + self.rng.float())
            };
            points.push(
                self.store
                    .alloc(crate::geometry::Point::new(a.cos() * r, a.sin() * r)),
            );
        }

        debug!(points = points.len(), "triangulating patch seeds");
        let mut voronoi = Voronoi::build(&mut self.store, &points)?;

        // Relax the central seeds so the core districts are even
        for _ in 0..3 {
            let mut to_relax: Vec<PointId> = voronoi.points.iter().take(3).copied().collect();
            if self.n_patches < voronoi.points.len() {
                to_relax.push(voronoi.points[self.n_patches]);
            }
            voronoi = Voronoi::relax(&mut voronoi, &mut self.store, Some(&to_relax))?;
        }

        let store = &self.store;
        voronoi.points.sort_by(|&p1, &p2| {
            store
                .pos(p1)
                .length()
                .partial_cmp(&store.pos(p2).length())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let regions = voronoi.partitioning(&self.store);
        debug!(regions = regions.len(), "voronoi partitioned");

        self.all_patches.clear();
        self.patches.clear();
        self.inner.clear();

        for (count, r) in regions.iter().enumerate() {
            let patch = Patch::from_region(r, &voronoi);
            let pid = self.all_patches.len();
            self.all_patches.push(patch);
            self.patches.push(pid);

            if count == 0 {
                self.center = self
                    .patch(pid)
                    .shape
                    .min_vertex(&self.store, |p| p.length());
                if self.plaza_needed {
                    self.plaza = Some(pid);
                }
            } else if count == self.n_patches && self.citadel_needed {
                self.citadel = Some(pid);
                self.patch_mut(pid).within_city = true;
            }

            if count < self.n_patches {
                self.patch_mut(pid).within_city = true;
                self.patch_mut(pid).within_walls = self.walls_needed;
                self.inner.push(pid);
            }
        }

        Ok(())
    }

    // === Stage 2: junction merging ===

    /// Merge adjacent vertices closer than the threshold into one shared
    /// vertex, repointing every patch that referenced the removed one. Must
    /// run before wall and street construction so the shared-identity
    /// invariant holds across neighbouring patches.
    fn optimize_junctions(&mut self) {
        let mut to_optimize: Vec<PatchId> = self.inner.clone();
        if let Some(c) = self.citadel {
            to_optimize.push(c);
        }

        let mut wards2clean: Vec<PatchId> = Vec::new();
        for &w in &to_optimize {
            let mut index = 0;
            while index < self.patch(w).shape.len() {
                let len = self.patch(w).shape.len();
                let v0 = self.patch(w).shape.get(index);
                let v1 = self.patch(w).shape.get((index + 1) % len);

                if v0 != v1
                    && self.store.pos(v0).distance(&self.store.pos(v1))
                        < JUNCTION_MERGE_DISTANCE
                {
                    for w1 in self.patch_by_vertex(v1) {
                        if w1 != w {
                            if let Some(idx) = self.patch(w1).shape.index_of(v1) {
                                self.patch_mut(w1).shape.set_vertex(idx, v0);
                                wards2clean.push(w1);
                            }
                        }
                    }

                    let merged = (self.store.pos(v0) + self.store.pos(v1)) * 0.5;
                    self.store.set(v0, merged);
                    self.patch_mut(w).shape.remove(v1);
                }
                index += 1;
            }
        }

        // Merging can leave a repointed polygon visiting a vertex twice
        for &w in &wards2clean {
            let mut i = 0;
            while i < self.patch(w).shape.len() {
                let v = self.patch(w).shape.get(i);
                let mut j = i + 1;
                while j < self.patch(w).shape.len() {
                    if self.patch(w).shape.get(j) == v {
                        self.patch_mut(w).shape.splice(j, 1);
                    } else {
                        j += 1;
                    }
                }
                i += 1;
            }
        }
    }

    // === Stage 3: walls ===

    fn build_walls(&mut self) -> Result<(), GenerationError> {
        let reserved: Vec<PointId> = match self.citadel {
            Some(c) => self.patch(c).shape.iter().collect(),
            None => Vec::new(),
        };

        let inner = self.inner.clone();
        let mut border = CurtainWall::new(self.walls_needed, self, inner, &reserved)?;
        if self.walls_needed {
            border.build_towers(self);
        }

        let radius = border.radius(self);
        if let Some(center) = self.center {
            let center_pos = self.store.pos(center);
            let store = &self.store;
            let all_patches = &self.all_patches;
            self.patches
                .retain(|&p| all_patches[p].shape.distance(store, center_pos) < radius * 3.0);
        }

        self.gates = border.gates.clone();
        self.border = Some(border);

        if let Some(citadel) = self.citadel {
            // The castle gets its own wall; vertices shared with countryside
            // patches are off limits for its gates.
            let castle_reserved: Vec<PointId> = self
                .patch(citadel)
                .shape
                .iter()
                .filter(|&v| {
                    self.patch_by_vertex(v)
                        .iter()
                        .any(|&p| !self.patch(p).within_city)
                })
                .collect();

            let mut castle_wall = CurtainWall::new(true, self, vec![citadel], &castle_reserved)?;
            castle_wall.build_towers(self);

            let castle_gates = castle_wall.gates.clone();
            self.patch_mut(citadel).ward = Some(Ward::castle(castle_wall));

            if self.patch(citadel).shape.compactness(&self.store) < 0.75 {
                return Err(GenerationError::BadCitadelShape);
            }

            self.gates.extend(castle_gates);
        }

        Ok(())
    }

    // === Stage 4: streets ===

    fn build_streets(&mut self) -> Result<(), GenerationError> {
        let topology = Topology::new(self);

        let border_gates: Vec<PointId> = self
            .border
            .as_ref()
            .map(|b| b.gates.clone())
            .unwrap_or_default();

        for gate in self.gates.clone() {
            // Each gate is connected to the nearest plaza corner, or to the
            // central junction when there is no plaza
            let gate_pos = self.store.pos(gate);
            let end = match self.plaza {
                Some(plaza) => self
                    .patch(plaza)
                    .shape
                    .min_vertex(&self.store, |v| v.distance(&gate_pos)),
                None => self.center,
            };
            let Some(end) = end else {
                return Err(GenerationError::StreetRouting);
            };

            let street = topology
                .build_path(gate, end, &topology.outer)
                .ok_or(GenerationError::StreetRouting)?;
            self.streets.push(Polygon::from(street));

            if border_gates.contains(&gate) {
                // Border gates also get an outward road from the far end of
                // the countryside in the gate's direction
                let dir = self.store.pos(gate).norm(1000.0);
                let mut start: Option<PointId> = None;
                let mut dist = f64::INFINITY;
                for (_, pt) in topology.nodes() {
                    let d = self.store.pos(pt).distance(&dir);
                    if d < dist {
                        dist = d;
                        start = Some(pt);
                    }
                }

                if let Some(start) = start {
                    if let Some(road) = topology.build_path(start, gate, &topology.inner) {
                        self.roads.push(Polygon::from(road));
                    }
                }
            }
        }

        self.tidy_up_roads();

        for i in 0..self.arteries.len() {
            self.smooth_street(i);
        }

        debug!(
            streets = self.streets.len(),
            roads = self.roads.len(),
            arteries = self.arteries.len(),
            "street network routed"
        );
        Ok(())
    }

    /// Smooth an artery in place. The end points stay fixed; interior points
    /// are shared with patch shapes, which bend along with the street.
    fn smooth_street(&mut self, index: usize) {
        let street = self.arteries[index].clone();
        if street.len() < 3 {
            return;
        }
        let smoothed = street.smooth_vertex_eq_values(&self.store, 3.0);
        for i in 1..street.len() - 1 {
            self.store.set(street.get(i), smoothed[i]);
        }
    }

    /// Merge all routed paths into a duplicate-free set of artery polylines.
    fn tidy_up_roads(&mut self) {
        let mut segments: Vec<(PointId, PointId)> = Vec::new();

        let paths: Vec<Polygon> = self
            .streets
            .iter()
            .chain(self.roads.iter())
            .cloned()
            .collect();
        for path in &paths {
            for i in 1..path.len() {
                let v0 = path.get(i - 1);
                let v1 = path.get(i);

                // Segments running along the plaza are not arteries
                if let Some(plaza) = self.plaza {
                    let shape = &self.patch(plaza).shape;
                    if shape.contains(v0) && shape.contains(v1) {
                        continue;
                    }
                }

                if !segments.contains(&(v0, v1)) {
                    segments.push((v0, v1));
                }
            }
        }

        self.arteries.clear();
        while let Some((start, end)) = segments.pop() {
            let mut attached = false;
            for artery in &mut self.arteries {
                if artery.first() == Some(end) {
                    artery.unshift(start);
                    attached = true;
                    break;
                } else if artery.last() == Some(start) {
                    artery.push(end);
                    attached = true;
                    break;
                }
            }
            if !attached {
                self.arteries.push(Polygon::from(vec![start, end]));
            }
        }
    }

    // === Stage 5: ward assignment ===

    fn create_wards(&mut self) {
        let mut unassigned = self.inner.clone();

        if let Some(plaza) = self.plaza {
            let ward = Ward::new(WardKind::Market, &mut self.rng);
            self.patch_mut(plaza).ward = Some(ward);
            unassigned.retain(|&p| p != plaza);
        }

        // Gate patches inside the city may become gate wards
        let border_gates: Vec<PointId> = self
            .border
            .as_ref()
            .map(|b| b.gates.clone())
            .unwrap_or_default();
        for gate in &border_gates {
            for pid in self.patch_by_vertex(*gate) {
                if self.patch(pid).within_city && self.patch(pid).ward.is_none() {
                    let chance = if self.wall().is_none() { 0.2 } else { 0.5 };
                    if self.rng.bool(chance) {
                        let ward = Ward::new(WardKind::Gate, &mut self.rng);
                        self.patch_mut(pid).ward = Some(ward);
                        unassigned.retain(|&p| p != pid);
                    }
                }
            }
        }

        // Quotas are consumed in order after a light shuffle of adjacent
        // entries
        let mut ward_types: Vec<WardKind> = WARD_QUOTAS.to_vec();
        for _ in 0..ward_types.len() / 10 {
            let index = self.rng.int(0, ward_types.len() - 1);
            ward_types.swap(index, index + 1);
        }

        let mut ward_index = 0;
        while !unassigned.is_empty() {
            let kind = if ward_index < ward_types.len() {
                let k = ward_types[ward_index];
                ward_index += 1;
                k
            } else {
                WardKind::Slum
            };

            let best = match wards::rate_location(kind) {
                None => {
                    // Unrated kinds settle on a uniformly random free patch
                    let idx = (self.rng.float() * unassigned.len() as f64) as usize;
                    Some(unassigned[idx])
                }
                Some(rate) => {
                    let mut best: Option<PatchId> = None;
                    let mut best_rate = f64::INFINITY;
                    for &p in &unassigned {
                        if self.patch(p).ward.is_some() {
                            continue;
                        }
                        let r = rate(self, p);
                        if r < best_rate {
                            best_rate = r;
                            best = Some(p);
                        }
                    }
                    best
                }
            };

            // Every candidate may rate as unusable; someone still has to
            // take the patch
            let best =
                best.unwrap_or_else(|| unassigned[self.rng.int(0, unassigned.len())]);

            let ward = Ward::new(kind, &mut self.rng);
            self.patch_mut(best).ward = Some(ward);
            unassigned.retain(|&p| p != best);
        }

        // Outskirts: most wall gates grow a settlement just outside
        if self.wall().is_some() {
            let wall_gates: Vec<PointId> = self
                .wall()
                .map(|w| w.gates.clone())
                .unwrap_or_default();
            for gate in wall_gates {
                if !self.rng.bool(1.0 / (self.n_patches as f64 - 5.0)) {
                    for pid in self.patch_by_vertex(gate) {
                        if self.patch(pid).ward.is_none() {
                            self.patch_mut(pid).within_city = true;
                            let ward = Ward::new(WardKind::Gate, &mut self.rng);
                            self.patch_mut(pid).ward = Some(ward);
                        }
                    }
                }
            }
        }

        // City radius and the countryside
        self.city_radius = 0.0;
        for pid in self.patches.clone() {
            if self.patch(pid).within_city {
                let verts: Vec<_> = self.patch(pid).shape.iter().collect();
                for v in verts {
                    self.city_radius = self.city_radius.max(self.store.pos(v).length());
                }
            } else if self.patch(pid).ward.is_none() {
                let kind = if self.rng.bool(0.2)
                    && self.patch(pid).shape.compactness(&self.store) >= 0.7
                {
                    WardKind::Farm
                } else {
                    WardKind::Plain
                };
                let ward = Ward::new(kind, &mut self.rng);
                self.patch_mut(pid).ward = Some(ward);
            }
        }
    }

    // === Stage 6: geometry ===

    fn build_geometry(&mut self) {
        for pid in self.patches.clone() {
            let Some(kind) = self.patch(pid).ward.as_ref().map(|w| w.kind) else {
                continue;
            };
            let geometry = wards::create_geometry(self, pid, kind);
            if let Some(ward) = self.patch_mut(pid).ward.as_mut() {
                ward.geometry = geometry;
            }
        }
    }

    // === Queries ===

    #[inline]
    pub fn patch(&self, id: PatchId) -> &Patch {
        &self.all_patches[id]
    }

    #[inline]
    pub fn patch_mut(&mut self, id: PatchId) -> &mut Patch {
        &mut self.all_patches[id]
    }

    /// The real city wall, if one was built.
    pub fn wall(&self) -> Option<&CurtainWall> {
        self.border.as_ref().filter(|b| b.is_real())
    }

    /// Live patches whose shape references the vertex.
    pub fn patch_by_vertex(&self, v: PointId) -> Vec<PatchId> {
        self.patches
            .iter()
            .copied()
            .filter(|&p| self.patch(p).shape.contains(v))
            .collect()
    }

    /// The patch on the other side of the edge leaving `v` within `patch`.
    pub fn get_neighbour(&self, patch: PatchId, v: PointId) -> Option<PatchId> {
        let next = self.patch(patch).shape.next(v);
        self.patches
            .iter()
            .copied()
            .find(|&p| self.patch(p).shape.find_edge(next, v).is_some())
    }

    /// All patches sharing an edge with the given one.
    pub fn neighbours(&self, patch: PatchId) -> Vec<PatchId> {
        self.patches
            .iter()
            .copied()
            .filter(|&p| p != patch && self.patch(p).shape.borders(&self.patch(patch).shape))
            .collect()
    }

    /// A patch is enclosed when it belongs to the city and all its
    /// neighbours do too.
    pub fn is_enclosed(&self, patch: PatchId) -> bool {
        if !self.patch(patch).within_city {
            return false;
        }
        if self.patch(patch).within_walls {
            return true;
        }
        self.neighbours(patch)
            .iter()
            .all(|&p| self.patch(p).within_city)
    }

    /// Replace a live patch with the halves it was split into. The new
    /// patches take its position in the working list.
    pub fn replace_patch(&mut self, patch: PatchId, halves: Vec<Polygon>) {
        let Some(index) = self.patches.iter().position(|&p| p == patch) else {
            return;
        };
        self.patches.remove(index);
        for (i, half) in halves.into_iter().enumerate() {
            let pid = self.all_patches.len();
            self.all_patches.push(Patch::new(half));
            self.patches.insert(index + i, pid);
        }
    }

    /// Outer boundary of a patch set: the closed walk over edges not shared
    /// between two of the patches. A walk that fails to close is degenerate
    /// input and aborts the build.
    pub fn find_circumference(&self, patch_ids: &[PatchId]) -> Result<Polygon, GenerationError> {
        if patch_ids.is_empty() {
            return Ok(Polygon::new());
        }
        if patch_ids.len() == 1 {
            return Ok(self.patch(patch_ids[0]).shape.clone());
        }

        let mut a: Vec<PointId> = Vec::new();
        let mut b: Vec<PointId> = Vec::new();

        for &w1 in patch_ids {
            for (va, vb) in self.patch(w1).shape.edges() {
                let outer_edge = patch_ids
                    .iter()
                    .all(|&w2| self.patch(w2).shape.find_edge(vb, va).is_none());
                if outer_edge {
                    a.push(va);
                    b.push(vb);
                }
            }
        }

        if a.is_empty() {
            return Err(GenerationError::DegenerateBoundary);
        }

        let mut result = Polygon::new();
        let start = 0usize;
        let mut index = 0usize;
        let mut iterations = 0usize;
        loop {
            result.push(a[index]);
            match a.iter().position(|&p| p == b[index]) {
                Some(i) => index = i,
                None => return Err(GenerationError::DegenerateBoundary),
            }
            iterations += 1;
            if iterations > a.len() {
                return Err(GenerationError::DegenerateBoundary);
            }
            if index == start {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn patch_from_coords(model: &mut Model, coords: &[(f64, f64)]) -> PatchId {
        let ids: Vec<PointId> = coords
            .iter()
            .map(|&(x, y)| model.store.alloc(Point::new(x, y)))
            .collect();
        let pid = model.all_patches.len();
        model.all_patches.push(Patch::new(Polygon::from(ids)));
        model.patches.push(pid);
        pid
    }

    fn empty_model() -> Model {
        Model {
            store: PointStore::new(),
            rng: GenRng::new(1),
            n_patches: 15,
            plaza_needed: false,
            citadel_needed: false,
            walls_needed: false,
            all_patches: Vec::new(),
            patches: Vec::new(),
            inner: Vec::new(),
            citadel: None,
            plaza: None,
            center: None,
            border: None,
            city_radius: 0.0,
            gates: Vec::new(),
            streets: Vec::new(),
            roads: Vec::new(),
            arteries: Vec::new(),
        }
    }

    #[test]
    fn test_find_circumference_two_squares() {
        let mut model = empty_model();

        // Two unit squares sharing the edge between (1,0) and (1,1)
        let a = model.store.alloc(Point::new(0.0, 0.0));
        let b = model.store.alloc(Point::new(1.0, 0.0));
        let c = model.store.alloc(Point::new(1.0, 1.0));
        let d = model.store.alloc(Point::new(0.0, 1.0));
        let e = model.store.alloc(Point::new(2.0, 0.0));
        let f = model.store.alloc(Point::new(2.0, 1.0));

        let p1 = model.all_patches.len();
        model.all_patches.push(Patch::new(Polygon::from(vec![a, b, c, d])));
        model.patches.push(p1);
        let p2 = model.all_patches.len();
        model.all_patches.push(Patch::new(Polygon::from(vec![b, e, f, c])));
        model.patches.push(p2);

        let circ = model
            .find_circumference(&[p1, p2])
            .expect("circumference should close");
        assert_eq!(circ.len(), 6);
        assert!((circ.square(&model.store).abs() - 2.0).abs() < 1e-10);
        // The shared edge is interior
        assert!(circ.find_edge(b, c).is_none());
        assert!(circ.find_edge(c, b).is_none());
    }

    #[test]
    fn test_find_circumference_single_patch_shares_vertices() {
        let mut model = empty_model();
        let pid = patch_from_coords(&mut model, &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);

        let circ = model.find_circumference(&[pid]).expect("single patch");
        assert_eq!(circ.len(), 4);
        // Shares vertex identities with the patch shape
        for v in circ.iter() {
            assert!(model.patch(pid).shape.contains(v));
        }
    }

    #[test]
    fn test_neighbour_queries() {
        let mut model = empty_model();
        let a = model.store.alloc(Point::new(0.0, 0.0));
        let b = model.store.alloc(Point::new(1.0, 0.0));
        let c = model.store.alloc(Point::new(1.0, 1.0));
        let d = model.store.alloc(Point::new(0.0, 1.0));
        let e = model.store.alloc(Point::new(2.0, 0.0));
        let f = model.store.alloc(Point::new(2.0, 1.0));

        let p1 = model.all_patches.len();
        model.all_patches.push(Patch::new(Polygon::from(vec![a, b, c, d])));
        model.patches.push(p1);
        let p2 = model.all_patches.len();
        model.all_patches.push(Patch::new(Polygon::from(vec![b, e, f, c])));
        model.patches.push(p2);

        assert_eq!(model.neighbours(p1), vec![p2]);
        assert_eq!(model.patch_by_vertex(b), vec![p1, p2]);
        assert_eq!(model.patch_by_vertex(e), vec![p2]);
    }

    #[test]
    fn test_optimize_junctions_merges_across_patches() {
        let mut model = empty_model();

        // Patch with two vertices only 2 apart; a second patch references
        // the vertex that will be merged away.
        let a = model.store.alloc(Point::new(0.0, 0.0));
        let b = model.store.alloc(Point::new(20.0, 0.0));
        let b2 = model.store.alloc(Point::new(22.0, 0.5));
        let c = model.store.alloc(Point::new(20.0, 20.0));
        let d = model.store.alloc(Point::new(0.0, 20.0));

        let p1 = model.all_patches.len();
        model
            .all_patches
            .push(Patch::new(Polygon::from(vec![a, b, b2, c, d])));
        model.patches.push(p1);
        model.inner.push(p1);

        let e = model.store.alloc(Point::new(40.0, 0.0));
        let f = model.store.alloc(Point::new(40.0, 20.0));
        let p2 = model.all_patches.len();
        model
            .all_patches
            .push(Patch::new(Polygon::from(vec![b, e, f, b2])));
        model.patches.push(p2);

        model.optimize_junctions();

        // b2 was merged into b, which moved to the average position
        assert_eq!(model.patch(p1).shape.len(), 4);
        assert!(!model.patch(p1).shape.contains(b2));
        assert!(!model.patch(p2).shape.contains(b2));
        assert!(model.patch(p2).shape.contains(b));
        let merged = model.store.pos(b);
        assert!((merged.x - 21.0).abs() < 1e-10);
        assert!((merged.y - 0.25).abs() < 1e-10);
    }

    #[test]
    fn test_replace_patch_keeps_position() {
        let mut model = empty_model();
        let p1 = patch_from_coords(&mut model, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let p2 = patch_from_coords(&mut model, &[(2.0, 0.0), (3.0, 0.0), (3.0, 1.0)]);
        let p3 = patch_from_coords(&mut model, &[(4.0, 0.0), (5.0, 0.0), (5.0, 1.0)]);

        let g = model.store.alloc(Point::new(9.0, 9.0));
        let h = model.store.alloc(Point::new(10.0, 9.0));
        let i = model.store.alloc(Point::new(10.0, 10.0));
        let halves = vec![Polygon::from(vec![g, h, i]), Polygon::from(vec![i, h, g])];
        model.replace_patch(p2, halves);

        assert_eq!(model.patches.len(), 4);
        assert_eq!(model.patches[0], p1);
        assert_eq!(model.patches[3], p3);
        assert!(!model.patches.contains(&p2));
    }

    #[test]
    fn test_model_generation_e2e() {
        let config = TownConfig::with_seed(42);
        let model = Model::new(&config).expect("generation should succeed within the retry budget");

        assert!(model.patches.len() >= 15);
        assert!(model.border.is_some(), "exactly one border wall");
        for &pid in &model.inner {
            assert!(
                model.patch(pid).ward.is_some(),
                "every inner patch has a ward"
            );
        }
        assert!(!model.gates.is_empty());
        assert!(!model.arteries.is_empty());
        assert!(model.city_radius > 0.0);
    }

    #[test]
    fn test_model_determinism() {
        let config = TownConfig {
            n_patches: 15,
            seed: Some(42),
            plaza: Feature::Enabled,
            citadel: Feature::Disabled,
            walls: Feature::Enabled,
        };
        let m1 = Model::new(&config).expect("first model");
        let m2 = Model::new(&config).expect("second model");

        assert_eq!(m1.patches.len(), m2.patches.len());
        for (&p1, &p2) in m1.patches.iter().zip(m2.patches.iter()) {
            let s1 = m1.patch(p1).shape.resolve(&m1.store);
            let s2 = m2.patch(p2).shape.resolve(&m2.store);
            assert_eq!(s1, s2, "patch outlines must be bit-identical");

            let w1 = m1.patch(p1).ward.as_ref().map(|w| w.kind);
            let w2 = m2.patch(p2).ward.as_ref().map(|w| w.kind);
            assert_eq!(w1, w2, "ward assignment must be identical");
        }

        assert_eq!(m1.arteries.len(), m2.arteries.len());
        for (a1, a2) in m1.arteries.iter().zip(m2.arteries.iter()) {
            assert_eq!(a1.resolve(&m1.store), a2.resolve(&m2.store));
        }
    }

    #[test]
    fn test_feature_flags_respected() {
        let config = TownConfig {
            n_patches: 10,
            seed: Some(7),
            plaza: Feature::Enabled,
            citadel: Feature::Disabled,
            walls: Feature::Enabled,
        };
        let model = Model::new(&config).expect("generation should succeed");
        assert!(model.plaza.is_some());
        assert!(model.citadel.is_none());
        assert!(model.wall().is_some());

        let plaza = model.plaza.unwrap();
        let is_market = model
            .patch(plaza)
            .ward
            .as_ref()
            .is_some_and(|w| w.kind == WardKind::Market);
        assert!(is_market, "the plaza patch is a market ward");
    }

    #[test]
    fn test_different_seeds_differ() {
        let m1 = Model::new(&TownConfig::with_seed(1)).expect("seed 1");
        let m2 = Model::new(&TownConfig::with_seed(2)).expect("seed 2");

        let s1: Vec<_> = m1.patch(m1.patches[0]).shape.resolve(&m1.store);
        let s2: Vec<_> = m2.patch(m2.patches[0]).shape.resolve(&m2.store);
        assert_ne!(s1, s2);
    }
}
