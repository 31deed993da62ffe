//! District types and their building geometry.
//!
//! Ward behavior is a closed set of variants dispatched through plain
//! functions: construction parameters, an optional location-rating function
//! (lower is better) and a geometry generator per kind. Some kinds carry no
//! rating function and settle wherever chance puts them.

use crate::cutter;
use crate::geometry::{interpolate, Point};
use crate::model::{Model, PatchId};
use crate::polygon::{PointId, PointStore, Polygon};
use crate::random::GenRng;
use crate::wall::CurtainWall;

pub const MAIN_STREET: f64 = 2.0;
pub const REGULAR_STREET: f64 = 1.0;
pub const ALLEY: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WardKind {
    Craftsmen,
    Merchant,
    Slum,
    Patriciate,
    Market,
    Gate,
    Cathedral,
    Castle,
    Military,
    Farm,
    Administration,
    Park,
    /// Countryside fallback with no buildings of its own.
    Plain,
}

/// Tuning knobs for the recursive alley subdivision.
#[derive(Debug, Clone, Copy)]
pub struct AlleyParams {
    pub min_sq: f64,
    pub grid_chaos: f64,
    pub size_chaos: f64,
    pub empty_prob: f64,
}

/// A district assigned to a patch, plus its generated buildings.
#[derive(Debug, Clone)]
pub struct Ward {
    pub kind: WardKind,
    /// Subdivision parameters; present for the alley-based kinds only.
    pub params: Option<AlleyParams>,
    /// Inner wall of a castle ward.
    pub wall: Option<CurtainWall>,
    pub geometry: Vec<Polygon>,
}

impl Ward {
    /// Create a ward, drawing its construction-time parameters from the
    /// model's random stream.
    pub fn new(kind: WardKind, rng: &mut GenRng) -> Ward {
        let params = alley_params(kind, rng);
        Ward { kind, params, wall: None, geometry: Vec::new() }
    }

    /// Castle ward wrapping its own curtain wall.
    pub fn castle(wall: CurtainWall) -> Ward {
        Ward { kind: WardKind::Castle, params: None, wall: Some(wall), geometry: Vec::new() }
    }

    pub fn label(&self) -> Option<&'static str> {
        label(self.kind)
    }
}

fn alley_params(kind: WardKind, rng: &mut GenRng) -> Option<AlleyParams> {
    let params = match kind {
        WardKind::Craftsmen => AlleyParams {
            min_sq: 10.0 + 80.0 * rng.float() * rng.float(),
            grid_chaos: 0.5 + rng.float() * 0.2,
            size_chaos: 0.6,
            empty_prob: 0.04,
        },
        WardKind::Merchant => AlleyParams {
            min_sq: 50.0 + 60.0 * rng.float() * rng.float(),
            grid_chaos: 0.5 + rng.float() * 0.3,
            size_chaos: 0.7,
            empty_prob: 0.15,
        },
        WardKind::Slum => AlleyParams {
            min_sq: 10.0 + 30.0 * rng.float() * rng.float(),
            grid_chaos: 0.6 + rng.float() * 0.4,
            size_chaos: 0.8,
            empty_prob: 0.03,
        },
        WardKind::Patriciate => AlleyParams {
            min_sq: 80.0 + 30.0 * rng.float() * rng.float(),
            grid_chaos: 0.5 + rng.float() * 0.3,
            size_chaos: 0.8,
            empty_prob: 0.2,
        },
        WardKind::Gate => AlleyParams {
            min_sq: 10.0 + 50.0 * rng.float() * rng.float(),
            grid_chaos: 0.5 + rng.float() * 0.3,
            size_chaos: 0.7,
            empty_prob: 0.04,
        },
        WardKind::Administration => AlleyParams {
            min_sq: 80.0 + 30.0 * rng.float() * rng.float(),
            grid_chaos: 0.1 + rng.float() * 0.3,
            size_chaos: 0.3,
            empty_prob: 0.04,
        },
        _ => return None,
    };
    Some(params)
}

pub fn label(kind: WardKind) -> Option<&'static str> {
    match kind {
        WardKind::Craftsmen => Some("Craftsmen"),
        WardKind::Merchant => Some("Merchant"),
        WardKind::Slum => Some("Slum"),
        WardKind::Patriciate => Some("Patriciate"),
        WardKind::Market => Some("Market"),
        WardKind::Gate => Some("Gate"),
        WardKind::Cathedral => Some("Temple"),
        WardKind::Castle => Some("Castle"),
        WardKind::Military => Some("Military"),
        WardKind::Farm => Some("Farm"),
        WardKind::Administration => Some("Administration"),
        WardKind::Park => Some("Park"),
        WardKind::Plain => None,
    }
}

/// Location-rating function of a kind, if it has one. Lower scores win.
pub fn rate_location(kind: WardKind) -> Option<fn(&Model, PatchId) -> f64> {
    match kind {
        WardKind::Merchant => Some(rate_merchant),
        WardKind::Slum => Some(rate_slum),
        WardKind::Patriciate => Some(rate_patriciate),
        WardKind::Market => Some(rate_market),
        WardKind::Cathedral => Some(rate_cathedral),
        WardKind::Military => Some(rate_military),
        WardKind::Administration => Some(rate_administration),
        _ => None,
    }
}

fn core_target(model: &Model) -> Point {
    match model.plaza {
        Some(plaza) => model.patch(plaza).shape.center(&model.store),
        None => model.center.map(|c| model.store.pos(c)).unwrap_or(Point::ZERO),
    }
}

/// Merchants crowd the center.
fn rate_merchant(model: &Model, patch: PatchId) -> f64 {
    model.patch(patch).shape.distance(&model.store, core_target(model))
}

/// Slums drift as far from the center as possible.
fn rate_slum(model: &Model, patch: PatchId) -> f64 {
    -model.patch(patch).shape.distance(&model.store, core_target(model))
}

/// Patricians want parks next door and no slums.
fn rate_patriciate(model: &Model, patch: PatchId) -> f64 {
    let mut rate = 0.0;
    for &p in &model.patches {
        let Some(ward) = &model.patch(p).ward else { continue };
        if model.patch(p).shape.borders(&model.patch(patch).shape) {
            match ward.kind {
                WardKind::Park => rate -= 1.0,
                WardKind::Slum => rate += 1.0,
                _ => {}
            }
        }
    }
    rate
}

/// One market should not touch another; otherwise prefer an area close to
/// the plaza's.
fn rate_market(model: &Model, patch: PatchId) -> f64 {
    for &p in &model.inner {
        let is_market = model
            .patch(p)
            .ward
            .as_ref()
            .is_some_and(|w| w.kind == WardKind::Market);
        if is_market && model.patch(p).shape.borders(&model.patch(patch).shape) {
            return f64::INFINITY;
        }
    }
    match model.plaza {
        Some(plaza) => {
            model.patch(patch).shape.square(&model.store)
                / model.patch(plaza).shape.square(&model.store)
        }
        None => model
            .patch(patch)
            .shape
            .distance(&model.store, core_target(model)),
    }
}

/// The temple overlooks the plaza if it can, otherwise sits close to it.
fn rate_cathedral(model: &Model, patch: PatchId) -> f64 {
    if let Some(plaza) = model.plaza {
        if model.patch(patch).shape.borders(&model.patch(plaza).shape) {
            return -1.0 / model.patch(patch).shape.square(&model.store);
        }
    }
    model.patch(patch).shape.distance(&model.store, core_target(model))
        * model.patch(patch).shape.square(&model.store)
}

/// Barracks border the citadel or the walls.
fn rate_military(model: &Model, patch: PatchId) -> f64 {
    if let Some(citadel) = model.citadel {
        if model.patch(citadel).shape.borders(&model.patch(patch).shape) {
            return 0.0;
        }
    }
    if let Some(wall) = model.wall() {
        if wall.borders(model, patch) {
            return 1.0;
        }
    }
    if model.citadel.is_none() && model.wall().is_none() {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Administration overlooks the plaza when possible.
fn rate_administration(model: &Model, patch: PatchId) -> f64 {
    if let Some(plaza) = model.plaza {
        if model.patch(patch).shape.borders(&model.patch(plaza).shape) {
            return 0.0;
        }
        return model
            .patch(patch)
            .shape
            .distance(&model.store, model.patch(plaza).shape.center(&model.store));
    }
    model.patch(patch).shape.distance(&model.store, core_target(model))
}

// === Geometry generation ===

/// Build the ward's geometry for its patch. Returns the building polygons.
pub fn create_geometry(model: &mut Model, patch: PatchId, kind: WardKind) -> Vec<Polygon> {
    match kind {
        WardKind::Craftsmen
        | WardKind::Merchant
        | WardKind::Slum
        | WardKind::Patriciate
        | WardKind::Gate
        | WardKind::Administration => common_geometry(model, patch),
        WardKind::Market => market_geometry(model, patch),
        WardKind::Park => park_geometry(model, patch),
        WardKind::Cathedral => cathedral_geometry(model, patch),
        WardKind::Castle => castle_geometry(model, patch),
        WardKind::Military => military_geometry(model, patch),
        WardKind::Farm => farm_geometry(model, patch),
        WardKind::Plain => Vec::new(),
    }
}

/// The buildable interior of a patch: every edge inset by half the width of
/// whatever runs along it (wall, street or alley).
pub fn city_block(model: &mut Model, patch: PatchId) -> Polygon {
    let shape = model.patch(patch).shape.clone();
    let inner_patch = model.wall().is_none() || model.patch(patch).within_walls;

    let mut inset = Vec::with_capacity(shape.len());
    for (v0, v1) in shape.edges() {
        let on_wall = model
            .wall()
            .is_some_and(|w| w.borders_by(patch, v0, v1));
        if on_wall {
            // Not too close to the wall
            inset.push(MAIN_STREET / 2.0);
            continue;
        }

        let mut on_street = inner_patch
            && model
                .plaza
                .is_some_and(|pl| model.patch(pl).shape.find_edge(v1, v0).is_some());
        if !on_street {
            on_street = model
                .arteries
                .iter()
                .any(|street| street.contains(v0) && street.contains(v1));
        }

        let width = if on_street {
            MAIN_STREET
        } else if inner_patch {
            REGULAR_STREET
        } else {
            ALLEY
        };
        inset.push(width / 2.0);
    }

    if shape.is_convex(&model.store) {
        shape.shrink(&mut model.store, &inset)
    } else {
        shape.buffer(&mut model.store, &inset)
    }
}

fn common_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let params = model
        .patch(patch)
        .ward
        .as_ref()
        .and_then(|w| w.params)
        .unwrap_or(AlleyParams { min_sq: 10.0, grid_chaos: 0.5, size_chaos: 0.6, empty_prob: 0.04 });

    let block = city_block(model, patch);
    let mut geometry = create_alleys(
        &mut model.store,
        &mut model.rng,
        &block,
        params.min_sq,
        params.grid_chaos,
        params.size_chaos,
        params.empty_prob,
        true,
    );

    if !model.is_enclosed(patch) {
        geometry = filter_outskirts(model, patch, geometry);
    }
    geometry
}

fn market_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let shape = model.patch(patch).shape.clone();

    // A fountain or statue, either centered or offset towards the longest
    // edge of the patch.
    let statue = model.rng.bool(0.6);
    let offset = statue || model.rng.bool(0.3);

    let mut v0: Option<PointId> = None;
    let mut v1: Option<PointId> = None;
    if statue || offset {
        let mut length = -1.0;
        for (p0, p1) in shape.edges() {
            let len = model.store.pos(p0).distance(&model.store.pos(p1));
            if len > length {
                length = len;
                v0 = Some(p0);
                v1 = Some(p1);
            }
        }
    }

    let object = match (statue, v0, v1) {
        (true, Some(v0), Some(v1)) => {
            let w = 1.0 + model.rng.float();
            let h = 1.0 + model.rng.float();
            let object = Polygon::rect(&mut model.store, w, h);
            let d = model.store.pos(v1) - model.store.pos(v0);
            object.rotate(&mut model.store, d.y.atan2(d.x));
            object
        }
        _ => {
            let r = 1.0 + model.rng.float();
            Polygon::circle(&mut model.store, r)
        }
    };

    let pos = match (offset, v0, v1) {
        (true, Some(v0), Some(v1)) => {
            let gravity = interpolate(model.store.pos(v0), model.store.pos(v1), 0.5);
            interpolate(
                shape.centroid(&model.store),
                gravity,
                0.2 + model.rng.float() * 0.4,
            )
        }
        _ => shape.centroid(&model.store),
    };
    object.offset(&mut model.store, pos);

    vec![object]
}

fn park_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let block = city_block(model, patch);
    if block.compactness(&model.store) >= 0.7 {
        cutter::radial(&mut model.store, &block, None, ALLEY)
    } else {
        cutter::semi_radial(&mut model.store, &block, None, ALLEY)
    }
}

fn cathedral_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let block = city_block(model, patch);
    if model.rng.bool(0.4) {
        let thickness = 2.0 + model.rng.float() * 4.0;
        cutter::ring(&mut model.store, &block, thickness)
    } else {
        create_ortho_building(&mut model.store, &mut model.rng, &block, 50.0, 0.8)
    }
}

fn castle_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let shape = model.patch(patch).shape.clone();
    let block = shape.shrink_eq(&mut model.store, MAIN_STREET * 2.0);
    let min_block_sq = block.square(&model.store).abs().sqrt() * 4.0;
    create_ortho_building(&mut model.store, &mut model.rng, &block, min_block_sq, 0.6)
}

fn military_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let block = city_block(model, patch);
    let min_sq = block.square(&model.store).abs().sqrt() * (1.0 + model.rng.float());
    let grid_chaos = 0.1 + model.rng.float() * 0.3;
    create_alleys(
        &mut model.store,
        &mut model.rng,
        &block,
        min_sq,
        grid_chaos,
        0.3,
        0.25,
        true,
    )
}

fn farm_geometry(model: &mut Model, patch: PatchId) -> Vec<Polygon> {
    let shape = model.patch(patch).shape.clone();
    let housing = Polygon::rect(&mut model.store, 4.0, 4.0);

    let idx = model.rng.int(0, shape.len());
    let vert = model.store.pos(shape.get(idx));
    let pos = interpolate(
        vert,
        shape.centroid(&model.store),
        0.3 + model.rng.float() * 0.4,
    );
    housing.rotate(&mut model.store, model.rng.float() * std::f64::consts::PI);
    housing.offset(&mut model.store, pos);

    create_ortho_building(&mut model.store, &mut model.rng, &housing, 8.0, 0.5)
}

/// Recursively bisect the block's longest edge with a randomized ratio and
/// angle, keeping halves under a randomized area threshold as buildings.
/// `split` leaves an alley gap between the halves of this level.
#[allow(clippy::too_many_arguments)]
pub fn create_alleys(
    store: &mut PointStore,
    rng: &mut GenRng,
    p: &Polygon,
    min_sq: f64,
    grid_chaos: f64,
    size_chaos: f64,
    empty_prob: f64,
    split: bool,
) -> Vec<Polygon> {
    let mut v: Option<PointId> = None;
    let mut length = -1.0;
    for (p0, p1) in p.edges() {
        let len = store.pos(p0).distance(&store.pos(p1));
        if len > length {
            length = len;
            v = Some(p0);
        }
    }
    let Some(v) = v else { return Vec::new() };

    let spread = 0.8 * grid_chaos;
    let ratio = (1.0 - spread) / 2.0 + rng.float() * spread;

    // Small blocks are cut at right angles to stay rectangular
    let angle_spread = std::f64::consts::PI / 6.0
        * grid_chaos
        * if p.square(store) < min_sq * 4.0 { 0.0 } else { 1.0 };
    let b = (rng.float() - 0.5) * angle_spread;

    let halves = cutter::bisect(store, p, v, ratio, b, if split { ALLEY } else { 0.0 });

    let mut buildings = Vec::new();
    for half in halves {
        let sq = half.square(store);
        let threshold = min_sq * 2.0_f64.powf(4.0 * size_chaos * (rng.float() - 0.5));
        if sq < threshold {
            if !rng.bool(empty_prob) {
                buildings.push(half);
            }
        } else {
            let should_split = sq > min_sq / (rng.float() * rng.float());
            buildings.extend(create_alleys(
                store, rng, &half, min_sq, grid_chaos, size_chaos, empty_prob, should_split,
            ));
        }
    }
    buildings
}

fn find_longest_edge(store: &PointStore, poly: &Polygon) -> Option<PointId> {
    let mut best: Option<PointId> = None;
    let mut length = -1.0;
    for (p0, p1) in poly.edges() {
        let len = store.pos(p0).distance(&store.pos(p1));
        if len > length {
            length = len;
            best = Some(p0);
        }
    }
    best
}

/// Slice a block into near-rectangular buildings: each cut runs along
/// whichever of the two fixed directions (longest edge or its perpendicular)
/// is less parallel to the edge being cut.
pub fn create_ortho_building(
    store: &mut PointStore,
    rng: &mut GenRng,
    poly: &Polygon,
    min_block_sq: f64,
    fill: f64,
) -> Vec<Polygon> {
    if poly.square(store).abs() < min_block_sq {
        return vec![poly.clone()];
    }

    let Some(longest) = find_longest_edge(store, poly) else {
        return vec![poly.clone()];
    };
    let c1 = poly.vector(store, longest);
    let c2 = c1.rotate90();

    // Randomized cuts occasionally produce nothing; retry a bounded number
    // of times before giving up on subdividing.
    for _ in 0..100 {
        let blocks = slice_ortho(store, rng, poly, c1, c2, min_block_sq, fill);
        if !blocks.is_empty() {
            return blocks;
        }
    }
    vec![poly.clone()]
}

fn slice_ortho(
    store: &mut PointStore,
    rng: &mut GenRng,
    p: &Polygon,
    c1: Point,
    c2: Point,
    min_block_sq: f64,
    fill: f64,
) -> Vec<Polygon> {
    let Some(v0) = find_longest_edge(store, p) else {
        return Vec::new();
    };
    let v1 = p.next(v0);
    let v = store.pos(v1) - store.pos(v0);

    let ratio = 0.4 + rng.float() * 0.2;
    let p1 = interpolate(store.pos(v0), store.pos(v1), ratio);

    let c = if (v.x * c1.x + v.y * c1.y).abs() < (v.x * c2.x + v.y * c2.y).abs() {
        c1
    } else {
        c2
    };

    let halves = p.cut(store, p1, p1 + c, 0.0);

    let mut buildings = Vec::new();
    for half in halves {
        let threshold = min_block_sq * 2.0_f64.powf(rng.normal() * 2.0 - 1.0);
        if half.square(store).abs() < threshold {
            if rng.bool(fill) {
                buildings.push(half);
            }
        } else {
            buildings.extend(slice_ortho(store, rng, &half, c1, c2, min_block_sq, fill));
        }
    }
    buildings
}

/// Thin out buildings on patches that face the countryside: density falls
/// towards unpopulated edges, and each building survives a weighted coin
/// flip against its distance to the nearest populated edge.
pub fn filter_outskirts(
    model: &mut Model,
    patch: PatchId,
    geometry: Vec<Polygon>,
) -> Vec<Polygon> {
    use crate::geometry::distance_to_line;

    struct PopulatedEdge {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        d: f64,
    }

    let shape = model.patch(patch).shape.clone();
    let mut populated_edges: Vec<PopulatedEdge> = Vec::new();

    let add_edge = |model: &Model, v1: PointId, v2: PointId, factor: f64, out: &mut Vec<PopulatedEdge>| {
        let p1 = model.store.pos(v1);
        let p2 = model.store.pos(v2);
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;

        let mut max_dist = 0.0;
        for v in shape.iter() {
            if v == v1 || v == v2 {
                continue;
            }
            let p = model.store.pos(v);
            let d = distance_to_line(p1.x, p1.y, dx, dy, p.x, p.y) * factor;
            if d > max_dist {
                max_dist = d;
            }
        }
        out.push(PopulatedEdge { x: p1.x, y: p1.y, dx, dy, d: max_dist });
    };

    for (v1, v2) in shape.edges() {
        let on_road = model
            .arteries
            .iter()
            .any(|street| street.contains(v1) && street.contains(v2));

        if on_road {
            add_edge(model, v1, v2, 1.0, &mut populated_edges);
        } else if let Some(n) = model.get_neighbour(patch, v1) {
            if model.patch(n).within_city {
                let factor = if model.is_enclosed(n) { 1.0 } else { 0.4 };
                add_edge(model, v1, v2, factor, &mut populated_edges);
            }
        }
    }

    // Density at each vertex: gates stay lively, vertices shared with
    // countryside patches do not.
    let mut density = Vec::with_capacity(shape.len());
    for v in shape.iter() {
        if model.gates.contains(&v) {
            density.push(1.0);
        } else {
            let all_within_city = model
                .patch_by_vertex(v)
                .iter()
                .all(|&p| model.patch(p).within_city);
            density.push(if all_within_city { 2.0 * model.rng.float() } else { 0.0 });
        }
    }

    let mut filtered = Vec::new();
    for building in geometry {
        let mut min_dist = 1.0;
        for edge in &populated_edges {
            for v in building.iter() {
                let p = model.store.pos(v);
                let d = distance_to_line(edge.x, edge.y, edge.dx, edge.dy, p.x, p.y);
                let dist = if edge.d > 0.0 { d / edge.d } else { 1.0 };
                if dist < min_dist {
                    min_dist = dist;
                }
            }
        }

        let c = building.center(&model.store);
        let weights = shape.interpolate(&model.store, c);
        let p: f64 = weights
            .iter()
            .zip(density.iter())
            .map(|(w, d)| w * d)
            .sum();
        if p > 0.0 {
            min_dist /= p;
        }

        if model.rng.fuzzy(1.0) > min_dist {
            filtered.push(building);
        }
    }
    filtered
}
