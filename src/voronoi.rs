//! Incremental Delaunay triangulation with Voronoi region extraction.
//!
//! Points are inserted one at a time (Bowyer-Watson): every triangle whose
//! circumcircle swallows the new point is split out, the star-shaped hole is
//! re-triangulated by walking its boundary loop, and the region map is
//! invalidated. Regions are rebuilt lazily on the next read.
//!
//! Triangle circumcenters are allocated in the shared point store, so the
//! Voronoi cells of adjacent seeds reference the *same* corner vertices by
//! identity. Everything downstream (junction merging, walls, streets) relies
//! on that sharing.

use std::collections::HashMap;

use crate::error::GenerationError;
use crate::geometry::{circumcenter, Point};
use crate::polygon::{PointId, PointStore, Polygon};

/// Index of a triangle in the engine's storage.
pub type TriId = usize;

/// A Delaunay triangle with its circumcircle.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub p1: PointId,
    pub p2: PointId,
    pub p3: PointId,
    /// Circumcircle center, shared between adjacent regions.
    pub center: PointId,
    /// Circumcircle radius.
    pub radius: f64,
}

impl Triangle {
    fn new(store: &mut PointStore, a: PointId, b: PointId, c: PointId) -> Self {
        let pa = store.pos(a);
        let pb = store.pos(b);
        let pc = store.pos(c);

        // Force CCW orientation
        let s = (pb.x - pa.x) * (pb.y + pa.y)
            + (pc.x - pb.x) * (pc.y + pb.y)
            + (pa.x - pc.x) * (pa.y + pc.y);
        let (p2, p3) = if s > 0.0 { (b, c) } else { (c, b) };

        // Circumcircle from the original vertex order, before the swap
        let cc = circumcenter(&pa, &pb, &pc);
        let radius = cc.distance(&pa);
        let center = store.alloc(cc);

        Self { p1: a, p2, p3, center, radius }
    }

    #[inline]
    fn has_edge(&self, a: PointId, b: PointId) -> bool {
        (self.p1 == a && self.p2 == b)
            || (self.p2 == a && self.p3 == b)
            || (self.p3 == a && self.p1 == b)
    }

    #[inline]
    pub fn has_vertex(&self, p: PointId) -> bool {
        self.p1 == p || self.p2 == p || self.p3 == p
    }
}

/// One Voronoi cell: a seed point plus its incident triangles, sorted by
/// polar angle of `circumcenter - seed`.
#[derive(Debug, Clone)]
pub struct Region {
    pub seed: PointId,
    pub vertices: Vec<TriId>,
}

impl Region {
    /// Average of the circumcenters.
    pub fn center(&self, voronoi: &Voronoi, store: &PointStore) -> Point {
        let mut c = Point::ZERO;
        for &t in &self.vertices {
            c = c + store.pos(voronoi.triangle(t).center);
        }
        c / self.vertices.len() as f64
    }

    /// The cell polygon; vertices are the shared circumcenter points.
    pub fn polygon(&self, voronoi: &Voronoi) -> Polygon {
        Polygon::from(
            self.vertices
                .iter()
                .map(|&t| voronoi.triangle(t).center)
                .collect::<Vec<_>>(),
        )
    }
}

/// Incremental Voronoi/Delaunay engine over a bounding frame.
#[derive(Debug)]
pub struct Voronoi {
    tris: Vec<Triangle>,
    /// Live triangles in insertion order.
    pub triangles: Vec<TriId>,
    pub points: Vec<PointId>,
    /// The four corner points of the bounding frame.
    pub frame: Vec<PointId>,
    regions: Option<HashMap<PointId, Region>>,
}

impl Voronoi {
    pub fn new(store: &mut PointStore, minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        let c1 = store.alloc(Point::new(minx, miny));
        let c2 = store.alloc(Point::new(minx, maxy));
        let c3 = store.alloc(Point::new(maxx, miny));
        let c4 = store.alloc(Point::new(maxx, maxy));

        let mut v = Self {
            tris: Vec::new(),
            triangles: Vec::new(),
            points: vec![c1, c2, c3, c4],
            frame: vec![c1, c2, c3, c4],
            regions: None,
        };
        v.alloc_triangle(store, c1, c2, c3);
        v.alloc_triangle(store, c2, c3, c4);
        v
    }

    #[inline]
    pub fn triangle(&self, id: TriId) -> &Triangle {
        &self.tris[id]
    }

    fn alloc_triangle(&mut self, store: &mut PointStore, a: PointId, b: PointId, c: PointId) -> TriId {
        let id = self.tris.len();
        self.tris.push(Triangle::new(store, a, b, c));
        self.triangles.push(id);
        id
    }

    /// Insert a point with Bowyer-Watson. Points that land inside no
    /// circumcircle are ignored.
    pub fn add_point(&mut self, store: &mut PointStore, p: PointId) -> Result<(), GenerationError> {
        let pp = store.pos(p);
        let to_split: Vec<TriId> = self
            .triangles
            .iter()
            .copied()
            .filter(|&t| {
                let tr = &self.tris[t];
                pp.distance(&store.pos(tr.center)) < tr.radius
            })
            .collect();

        if to_split.is_empty() {
            return Ok(());
        }

        self.points.push(p);

        // Directed edges of the split set that are not shared in reverse by
        // another split triangle form the star-shaped hole boundary.
        let mut a: Vec<PointId> = Vec::new();
        let mut b: Vec<PointId> = Vec::new();
        for &t1 in &to_split {
            let tr1 = &self.tris[t1];
            let (mut e1, mut e2, mut e3) = (true, true, true);
            for &t2 in &to_split {
                if t2 == t1 {
                    continue;
                }
                let tr2 = &self.tris[t2];
                if e1 && tr2.has_edge(tr1.p2, tr1.p1) {
                    e1 = false;
                }
                if e2 && tr2.has_edge(tr1.p3, tr1.p2) {
                    e2 = false;
                }
                if e3 && tr2.has_edge(tr1.p1, tr1.p3) {
                    e3 = false;
                }
                if !(e1 || e2 || e3) {
                    break;
                }
            }
            if e1 {
                a.push(tr1.p1);
                b.push(tr1.p2);
            }
            if e2 {
                a.push(tr1.p2);
                b.push(tr1.p3);
            }
            if e3 {
                a.push(tr1.p3);
                b.push(tr1.p1);
            }
        }

        // Walk the boundary loop, fanning one triangle per edge. The loop is
        // closed for well-behaved input; degenerate geometry can break it, so
        // the walk is bounded and reports instead of spinning.
        if !a.is_empty() {
            let start = 0usize;
            let mut index = 0usize;
            let mut created = 0usize;
            loop {
                self.alloc_triangle(store, p, a[index], b[index]);
                created += 1;
                match a.iter().position(|&q| q == b[index]) {
                    Some(i) => index = i,
                    None => return Err(GenerationError::DegenerateTriangulation),
                }
                if created > a.len() {
                    return Err(GenerationError::DegenerateTriangulation);
                }
                if index == start {
                    break;
                }
            }
        }

        self.triangles.retain(|t| !to_split.contains(t));
        self.regions = None;
        Ok(())
    }

    /// True if none of the triangle's vertices belong to the frame.
    pub fn is_real(&self, t: TriId) -> bool {
        let tr = &self.tris[t];
        !self.frame.contains(&tr.p1)
            && !self.frame.contains(&tr.p2)
            && !self.frame.contains(&tr.p3)
    }

    fn ensure_regions(&mut self, store: &PointStore) {
        if self.regions.is_some() {
            return;
        }
        let mut map = HashMap::with_capacity(self.points.len());
        for &p in &self.points {
            map.insert(p, self.build_region(store, p));
        }
        self.regions = Some(map);
    }

    fn build_region(&self, store: &PointStore, p: PointId) -> Region {
        let mut vertices: Vec<TriId> = Vec::new();
        for &t in &self.triangles {
            let tr = &self.tris[t];
            if !tr.has_vertex(p) {
                continue;
            }
            // Filter degenerate or duplicate entries before the angular
            // sort: a non-finite circumcenter corrupts the comparator.
            let c = store.pos(tr.center);
            if !c.x.is_finite() || !c.y.is_finite() {
                continue;
            }
            if vertices.contains(&t) {
                continue;
            }
            vertices.push(t);
        }

        let seed = store.pos(p);
        vertices.sort_by(|&t1, &t2| self.compare_angles(store, seed, t1, t2));
        Region { seed: p, vertices }
    }

    /// Quadrant-based angular comparator; avoids trig calls. Compares x-sign
    /// first, then y for the x == 0 tie, else the cross-product sign.
    fn compare_angles(
        &self,
        store: &PointStore,
        seed: Point,
        t1: TriId,
        t2: TriId,
    ) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let c1 = store.pos(self.tris[t1].center);
        let c2 = store.pos(self.tris[t2].center);
        let x1 = c1.x - seed.x;
        let y1 = c1.y - seed.y;
        let x2 = c2.x - seed.x;
        let y2 = c2.y - seed.y;

        if x1 >= 0.0 && x2 < 0.0 {
            return Ordering::Greater;
        }
        if x2 >= 0.0 && x1 < 0.0 {
            return Ordering::Less;
        }
        if x1 == 0.0 && x2 == 0.0 {
            return if y2 > y1 { Ordering::Greater } else { Ordering::Less };
        }

        let c = x2 * y1 - x1 * y2;
        if c > 0.0 {
            Ordering::Greater
        } else if c < 0.0 {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Fully interior Voronoi cells, in seed insertion order. Regions whose
    /// triangles touch any frame point are excluded.
    pub fn partitioning(&mut self, store: &PointStore) -> Vec<Region> {
        self.ensure_regions(store);
        let mut result = Vec::new();
        if let Some(regions) = &self.regions {
            for &p in &self.points {
                if let Some(r) = regions.get(&p) {
                    if !r.vertices.is_empty() && r.vertices.iter().all(|&t| self.is_real(t)) {
                        result.push(r.clone());
                    }
                }
            }
        }
        result
    }

    /// Lloyd relaxation: replace each point of the subset (default: all
    /// points) by its region's centroid, then rebuild the diagram from
    /// scratch. Points outside the subset keep their identity.
    pub fn relax(
        voronoi: &mut Voronoi,
        store: &mut PointStore,
        to_relax: Option<&[PointId]>,
    ) -> Result<Voronoi, GenerationError> {
        let regions = voronoi.partitioning(store);

        let mut new_points: Vec<PointId> = voronoi
            .points
            .iter()
            .copied()
            .filter(|p| !voronoi.frame.contains(p))
            .collect();

        for r in &regions {
            let relaxed = match to_relax {
                Some(subset) => subset.contains(&r.seed),
                None => true,
            };
            if relaxed {
                if let Some(pos) = new_points.iter().position(|&p| p == r.seed) {
                    new_points.remove(pos);
                }
                let c = r.center(voronoi, store);
                new_points.push(store.alloc(c));
            }
        }

        Voronoi::build(store, &new_points)
    }

    /// Build a diagram from scratch: frame from the expanded bounding box of
    /// the input, then one insertion per point.
    pub fn build(store: &mut PointStore, vertices: &[PointId]) -> Result<Voronoi, GenerationError> {
        let mut minx: f64 = 1e10;
        let mut miny: f64 = 1e10;
        let mut maxx: f64 = -1e9;
        let mut maxy: f64 = -1e9;
        for &v in vertices {
            let p = store.pos(v);
            minx = minx.min(p.x);
            miny = miny.min(p.y);
            maxx = maxx.max(p.x);
            maxy = maxy.max(p.y);
        }

        let dx = (maxx - minx) * 0.5;
        let dy = (maxy - miny) * 0.5;

        let mut voronoi =
            Voronoi::new(store, minx - dx / 2.0, miny - dy / 2.0, maxx + dx / 2.0, maxy + dy / 2.0);
        for &v in vertices {
            voronoi.add_point(store, v)?;
        }
        Ok(voronoi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Jittered grid: regular spacing breaks Bowyer-Watson with cocircular
    /// quadruples, so every test point gets a small deterministic offset.
    fn scattered_points(store: &mut PointStore, n: usize, step: f64) -> Vec<PointId> {
        let mut pts = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let jx = ((i * 7 + j * 3) % 11) as f64 * 0.07;
                let jy = ((i * 5 + j * 13) % 17) as f64 * 0.05;
                pts.push(store.alloc(Point::new(
                    i as f64 * step + jx,
                    j as f64 * step + jy,
                )));
            }
        }
        pts
    }

    fn bounding_box_area(store: &PointStore, pts: &[PointId]) -> f64 {
        let mut minx = f64::INFINITY;
        let mut miny = f64::INFINITY;
        let mut maxx = f64::NEG_INFINITY;
        let mut maxy = f64::NEG_INFINITY;
        for &p in pts {
            let pos = store.pos(p);
            minx = minx.min(pos.x);
            miny = miny.min(pos.y);
            maxx = maxx.max(pos.x);
            maxy = maxy.max(pos.y);
        }
        (maxx - minx) * (maxy - miny)
    }

    #[test]
    fn test_build_simple() {
        let mut store = PointStore::new();
        let pts = vec![
            store.alloc(Point::new(0.0, 0.0)),
            store.alloc(Point::new(20.0, 0.0)),
            store.alloc(Point::new(10.0, 20.0)),
        ];
        let v = Voronoi::build(&mut store, &pts).expect("build should succeed");
        assert!(!v.triangles.is_empty());
        // Frame corners plus the three inserted points
        assert!(v.points.len() >= 3 + 4);
    }

    #[test]
    fn test_partitioning_interior_only() {
        let mut store = PointStore::new();
        let pts = scattered_points(&mut store, 5, 10.0);
        let mut v = Voronoi::build(&mut store, &pts).expect("build should succeed");

        let regions = v.partitioning(&store);
        assert!(!regions.is_empty());
        for r in &regions {
            for &t in &r.vertices {
                assert!(v.is_real(t));
            }
        }
    }

    #[test]
    fn test_region_areas_bounded_by_hull() {
        let mut store = PointStore::new();
        let pts = scattered_points(&mut store, 5, 10.0);
        let mut v = Voronoi::build(&mut store, &pts).expect("build should succeed");

        // The hull of the input bounds every interior cell; the bounding box
        // bounds the hull.
        let bound = bounding_box_area(&store, &pts);
        let total: f64 = v
            .partitioning(&store)
            .iter()
            .map(|r| r.polygon(&v).square(&store).abs())
            .sum();
        assert!(total > 0.0);
        assert!(total <= bound + 1e-6);
    }

    #[test]
    fn test_regions_share_circumcenters() {
        let mut store = PointStore::new();
        let pts = scattered_points(&mut store, 4, 10.0);
        let mut v = Voronoi::build(&mut store, &pts).expect("build should succeed");

        let regions = v.partitioning(&store);
        assert!(regions.len() >= 2);

        // Adjacent cells must reference at least one identical corner id
        let mut shared = false;
        let p0 = regions[0].polygon(&v);
        for r in &regions[1..] {
            let p1 = r.polygon(&v);
            if p0.iter().any(|id| p1.contains(id)) {
                shared = true;
                break;
            }
        }
        assert!(shared, "neighbouring regions should share corner identities");
    }

    #[test]
    fn test_region_cache_invalidation() {
        let mut store = PointStore::new();
        let pts = scattered_points(&mut store, 3, 10.0);
        let mut v = Voronoi::build(&mut store, &pts).expect("build should succeed");

        let before = v.partitioning(&store).len();
        let extra = store.alloc(Point::new(5.3, 4.8));
        v.add_point(&mut store, extra).expect("insert should succeed");
        let after = v.partitioning(&store).len();
        assert!(after >= before);
    }

    #[test]
    fn test_relax_rebuilds_diagram() {
        let mut store = PointStore::new();
        let pts = scattered_points(&mut store, 4, 10.0);
        let mut v = Voronoi::build(&mut store, &pts).expect("build should succeed");

        let relaxed = Voronoi::relax(&mut v, &mut store, None).expect("relax should succeed");
        assert!(!relaxed.points.is_empty());
    }
}
