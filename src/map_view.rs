//! The world map: station marker, trajectory polylines and basemap.
//!
//! `MapView` owns everything that used to be loose map state (marker,
//! rendered segments, zoom). Geometry comes from `trajectory`; this module
//! only turns it into plot items. The map is equirectangular and repeats
//! horizontally, so every item is also drawn one turn to the east and west.

use eframe::egui;
use egui_plot::{Line, LineStyle, MarkerShape, Plot, PlotBounds, PlotPoints, Points};

use crate::trajectory::{
    build_segments, duplicate_path, duplicate_position, PathColor, Position, Segment, FULL_TURN_DEG,
};

pub const MIN_ZOOM: i32 = 1;
pub const MAX_ZOOM: i32 = 18;
// Longitude span shown at zoom 0; each level halves it.
const ZOOM_ZERO_SPAN_DEG: f64 = 2880.0;

pub const MARKER_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 215, 0);
const GRID_COLOR: egui::Color32 = egui::Color32::DARK_GRAY;
const COAST_COLOR: egui::Color32 = egui::Color32::from_rgb(110, 130, 150);

pub fn path_color(color: PathColor) -> egui::Color32 {
    match color {
        PathColor::Red => egui::Color32::from_rgb(255, 99, 71),
        PathColor::Green => egui::Color32::from_rgb(50, 205, 50),
        PathColor::Blue => egui::Color32::from_rgb(30, 144, 255),
    }
}

pub fn zoom_span_deg(zoom: i32) -> f64 {
    ZOOM_ZERO_SPAN_DEG / 2f64.powi(zoom.clamp(MIN_ZOOM, MAX_ZOOM))
}

pub fn zoom_from_span(span_deg: f64) -> i32 {
    if span_deg.is_nan() || span_deg <= 0.0 {
        return MIN_ZOOM;
    }
    ((ZOOM_ZERO_SPAN_DEG / span_deg).log2().round() as i32).clamp(MIN_ZOOM, MAX_ZOOM)
}

fn to_plot(points: &[Position]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.lon, p.lat]).collect()
}

pub struct MapView {
    marker: Option<Position>,
    segments: Vec<Segment>,
    basemap: Vec<Vec<[f64; 2]>>,
    zoom_level: i32,
    pending_zoom: bool,
    center: Position,
    pub show_marker: bool,
    pub show_trajectory: bool,
    pub wrap_copies: bool,
}

impl MapView {
    pub fn new(zoom_level: i32) -> Self {
        Self {
            marker: None,
            segments: Vec::new(),
            basemap: Vec::new(),
            zoom_level: zoom_level.clamp(MIN_ZOOM, MAX_ZOOM),
            pending_zoom: true,
            center: Position::new(0.0, 0.0),
            show_marker: true,
            show_trajectory: true,
            wrap_copies: true,
        }
    }

    pub fn marker(&self) -> Option<Position> {
        self.marker
    }

    pub fn set_marker(&mut self, pos: Position) {
        self.marker = Some(pos);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn set_trajectory(&mut self, positions: &[Position]) {
        self.segments = build_segments(positions);
    }

    pub fn clear_trajectory(&mut self) {
        self.segments.clear();
    }

    pub fn set_basemap(&mut self, lines: Vec<Vec<[f64; 2]>>) {
        self.basemap = lines;
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom_level
    }

    pub fn set_zoom(&mut self, zoom: i32) {
        self.zoom_level = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pending_zoom = true;
    }

    pub fn center_on(&mut self, pos: Position) {
        self.center = pos;
        self.pending_zoom = true;
    }

    fn shifts(&self) -> &'static [i32] {
        if self.wrap_copies { &[-1, 0, 1] } else { &[0] }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> bool {
        let user_zooming = ui.input(|i| i.zoom_delta() != 1.0);
        let apply_zoom = std::mem::take(&mut self.pending_zoom);
        let span = zoom_span_deg(self.zoom_level);
        let center = self.center;
        let shifts = self.shifts();

        let response = Plot::new("world_map")
            .data_aspect(1.0)
            .show_axes([true, true])
            .show_grid(false)
            .allow_double_click_reset(false)
            .show(ui, |plot_ui| {
                if apply_zoom {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [center.lon - span / 2.0, center.lat - span / 4.0],
                        [center.lon + span / 2.0, center.lat + span / 4.0],
                    ));
                }

                for &turns in shifts {
                    let dx = FULL_TURN_DEG * turns as f64;
                    for line in &self.basemap {
                        let pts: Vec<[f64; 2]> = line.iter().map(|p| [p[0] + dx, p[1]]).collect();
                        plot_ui.line(Line::new("", PlotPoints::new(pts)).color(COAST_COLOR).width(1.0));
                    }
                }

                let extent = FULL_TURN_DEG * (0.5 + shifts.len() as f64 / 2.0);
                plot_ui.line(
                    Line::new("", PlotPoints::new(vec![[-extent, 0.0], [extent, 0.0]]))
                        .color(GRID_COLOR)
                        .width(0.5),
                );
                for &turns in shifts {
                    let x = FULL_TURN_DEG * turns as f64;
                    plot_ui.line(
                        Line::new("", PlotPoints::new(vec![[x, -90.0], [x, 90.0]]))
                            .color(GRID_COLOR)
                            .width(0.5),
                    );
                }

                if self.show_trajectory {
                    for segment in &self.segments {
                        let color = path_color(segment.color);
                        let copies = if self.wrap_copies {
                            duplicate_path(&segment.points)
                        } else {
                            vec![segment.points.clone()]
                        };
                        for copy in copies {
                            plot_ui.line(
                                Line::new("", PlotPoints::new(to_plot(&copy)))
                                    .color(color)
                                    .width(2.0)
                                    .style(LineStyle::dashed_loose()),
                            );
                        }
                    }
                }

                if self.show_marker {
                    if let Some(pos) = self.marker {
                        let copies = if self.wrap_copies { duplicate_position(pos) } else { vec![pos] };
                        plot_ui.points(
                            Points::new("ISS", PlotPoints::new(to_plot(&copies)))
                                .shape(MarkerShape::Diamond)
                                .radius(8.0)
                                .filled(true)
                                .color(MARKER_COLOR),
                        );
                    }
                }

                plot_ui.plot_bounds()
            });

        let bounds = response.inner;
        let c = bounds.center();
        self.center = Position::new(c.y, c.x);

        if apply_zoom || !(user_zooming && response.response.hovered()) {
            return false;
        }
        let zoom = zoom_from_span(bounds.width());
        if zoom != self.zoom_level {
            self.zoom_level = zoom;
            return true;
        }
        false
    }
}
