//! Anonymized skeleton rendering.
//!
//! Produces a small monochrome SVG: limbs as white lines and joints as dots on
//! a black background. No pixels from the camera ever reach this module.

use fallwatch_core::SKELETON_EDGES;
use fallwatch_risk::SkeletonSnapshot;

/// Output size of a rendered snapshot in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// Renders `snapshot` as an SVG document, or `None` when it has no joints.
pub fn render_svg(snapshot: &SkeletonSnapshot, size: CanvasSize) -> Option<String> {
    if snapshot.is_empty() {
        return None;
    }
    let (w, h) = (size.width as f32, size.height as f32);
    let px = |x: f32, y: f32| (x.clamp(0.0, 1.0) * w, y.clamp(0.0, 1.0) * h);

    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">\
         <rect width=\"100%\" height=\"100%\" fill=\"black\"/>",
        size.width, size.height, size.width, size.height
    );

    for (a, b) in SKELETON_EDGES.iter() {
        if let (Some(pa), Some(pb)) = (snapshot.point(*a), snapshot.point(*b)) {
            let (x1, y1) = px(pa.x, pa.y);
            let (x2, y2) = px(pb.x, pb.y);
            svg.push_str(&format!(
                "<line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" \
                 stroke=\"white\" stroke-width=\"2\"/>"
            ));
        }
    }
    for point in &snapshot.points {
        let (cx, cy) = px(point.x, point.y);
        svg.push_str(&format!(
            "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"3\" fill=\"white\"/>"
        ));
    }
    svg.push_str("</svg>");
    Some(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fallwatch_core::{KeypointSample, KeypointType};
    use fallwatch_risk::synthetic::body_sample;

    #[test]
    fn empty_snapshot_renders_nothing() {
        assert!(render_svg(&SkeletonSnapshot::default(), CanvasSize::default()).is_none());
    }

    #[test]
    fn full_skeleton_draws_every_edge_and_joint() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let snapshot = SkeletonSnapshot::from_sample(&body_sample(ts, (0.5, 0.8), 5.0, 0.9));
        let svg = render_svg(&snapshot, CanvasSize::default()).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<line").count(), SKELETON_EDGES.len());
        assert_eq!(svg.matches("<circle").count(), 17);
    }

    #[test]
    fn edges_need_both_endpoints() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let sample = KeypointSample::new(ts)
            .with_point(KeypointType::LeftShoulder, 0.4, 0.3, 0.9)
            .with_point(KeypointType::LeftElbow, 0.4, 0.45, 0.9)
            .with_point(KeypointType::LeftWrist, 0.4, 0.6, 0.1);
        let svg = render_svg(&SkeletonSnapshot::from_sample(&sample), CanvasSize::default()).unwrap();
        assert_eq!(svg.matches("<line").count(), 1);
        assert_eq!(svg.matches("<circle").count(), 2);
    }
}
