//! SVG rendering of a finished model.
//!
//! The renderer only reads the model: patch shapes, ward labels and building
//! polygons, the wall with its gates and towers, and the merged artery
//! polylines. Roads are drawn as a double stroke (casing plus a paper-colored
//! center line), walls as a thick outline with gate ticks and tower dots.

use std::fmt::Write as _;

use crate::model::Model;
use crate::polygon::Polygon;
use crate::wall::CurtainWall;
use crate::wards::{WardKind, MAIN_STREET};

const NORMAL_STROKE: f64 = 0.3;
const THICK_STROKE: f64 = 0.6;

/// Named color scheme. `paper` is the background, `light` fills buildings,
/// `medium` is used for roads and greenery, `dark` for outlines and walls.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub name: &'static str,
    pub paper: &'static str,
    pub light: &'static str,
    pub medium: &'static str,
    pub dark: &'static str,
}

pub const PALETTES: [Palette; 3] = [
    Palette {
        name: "parchment",
        paper: "#f4eed7",
        light: "#e8dcb8",
        medium: "#ac9e68",
        dark: "#3c3a2d",
    },
    Palette {
        name: "ink",
        paper: "#ffffff",
        light: "#ffffff",
        medium: "#999999",
        dark: "#111111",
    },
    Palette {
        name: "night",
        paper: "#2a2a3a",
        light: "#3d3d52",
        medium: "#5a5a78",
        dark: "#c8c8e0",
    },
];

impl Palette {
    pub fn named(name: &str) -> Option<Palette> {
        PALETTES.iter().copied().find(|p| p.name == name)
    }
}

impl Default for Palette {
    fn default() -> Self {
        PALETTES[0]
    }
}

pub struct SvgRenderer<'a> {
    model: &'a Model,
    palette: Palette,
}

impl<'a> SvgRenderer<'a> {
    pub fn new(model: &'a Model, palette: Palette) -> Self {
        Self { model, palette }
    }

    /// Render the whole town as an SVG document.
    pub fn render(&self, width: f64, height: f64) -> String {
        let mut svg = String::new();

        let radius = self.model.city_radius.max(10.0);
        let margin = radius * 0.1;
        let min = -radius - margin;
        let size = (radius + margin) * 2.0;

        let _ = writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.0}\" height=\"{:.0}\" viewBox=\"{:.2} {:.2} {:.2} {:.2}\">",
            width, height, min, min, size, size
        );
        let _ = writeln!(
            svg,
            "  <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            min, min, size, size, self.palette.paper
        );

        self.render_roads(&mut svg);
        self.render_patches(&mut svg);
        self.render_walls(&mut svg);

        svg.push_str("</svg>\n");
        svg
    }

    fn path_data(&self, poly: &Polygon, close: bool) -> String {
        let mut d = String::new();
        for (i, p) in poly.resolve(&self.model.store).iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.2} {:.2} ", cmd, p.x, p.y);
        }
        if close {
            d.push('Z');
        }
        d
    }

    fn polyline(&self, svg: &mut String, poly: &Polygon, color: &str, width: f64) {
        let _ = writeln!(
            svg,
            "    <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"butt\" stroke-linejoin=\"round\"/>",
            self.path_data(poly, false),
            color,
            width
        );
    }

    fn polygon(&self, svg: &mut String, poly: &Polygon, fill: &str, stroke: &str, width: f64) {
        let _ = writeln!(
            svg,
            "    <path d=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linejoin=\"miter\"/>",
            self.path_data(poly, true),
            fill,
            stroke,
            width
        );
    }

    fn render_roads(&self, svg: &mut String) {
        svg.push_str("  <g id=\"roads\">\n");
        for artery in &self.model.arteries {
            // Casing first, then the center line
            self.polyline(svg, artery, self.palette.medium, MAIN_STREET + NORMAL_STROKE);
            self.polyline(svg, artery, self.palette.paper, MAIN_STREET - NORMAL_STROKE);
        }
        svg.push_str("  </g>\n");
    }

    fn render_patches(&self, svg: &mut String) {
        svg.push_str("  <g id=\"patches\">\n");
        for &pid in &self.model.patches {
            let patch = self.model.patch(pid);
            let Some(ward) = &patch.ward else { continue };

            let class = ward.label().unwrap_or("countryside").to_lowercase();
            let _ = writeln!(svg, "   <g class=\"{}\">", class);

            match ward.kind {
                WardKind::Castle => {
                    for building in &ward.geometry {
                        self.polygon(
                            svg,
                            building,
                            self.palette.light,
                            self.palette.dark,
                            NORMAL_STROKE * 2.0,
                        );
                    }
                }
                WardKind::Park => {
                    for grove in &ward.geometry {
                        self.polygon(svg, grove, self.palette.medium, "none", 0.0);
                    }
                }
                WardKind::Plain => {}
                _ => {
                    for building in &ward.geometry {
                        self.polygon(
                            svg,
                            building,
                            self.palette.light,
                            self.palette.dark,
                            NORMAL_STROKE,
                        );
                    }
                }
            }

            svg.push_str("   </g>\n");
        }
        svg.push_str("  </g>\n");
    }

    fn render_walls(&self, svg: &mut String) {
        svg.push_str("  <g id=\"walls\">\n");
        if let Some(wall) = self.model.wall() {
            self.render_wall(svg, wall, false);
        }
        if let Some(citadel) = self.model.citadel {
            let castle_wall = self
                .model
                .patch(citadel)
                .ward
                .as_ref()
                .and_then(|w| w.wall.as_ref());
            if let Some(wall) = castle_wall {
                self.render_wall(svg, wall, true);
            }
        }
        svg.push_str("  </g>\n");
    }

    fn render_wall(&self, svg: &mut String, wall: &CurtainWall, large: bool) {
        self.polygon(svg, &wall.shape, "none", self.palette.dark, THICK_STROKE);

        for &gate in &wall.gates {
            // A gate is a short tick across the wall line
            let dir = self.model.store.pos(wall.shape.next(gate))
                - self.model.store.pos(wall.shape.prev(gate));
            let dir = dir.norm(THICK_STROKE * 1.5);
            let pos = self.model.store.pos(gate);
            let p1 = pos - dir;
            let p2 = pos + dir;
            let _ = writeln!(
                svg,
                "    <line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"butt\"/>",
                p1.x,
                p1.y,
                p2.x,
                p2.y,
                self.palette.dark,
                THICK_STROKE * 2.0
            );
        }

        let tower_radius = THICK_STROKE * if large { 1.5 } else { 1.0 };
        for tower in &wall.towers {
            let _ = writeln!(
                svg,
                "    <circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
                tower.x, tower.y, tower_radius, self.palette.dark
            );
        }
    }
}
