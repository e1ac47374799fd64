use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, pos2};

use crate::query::NodeKind;

use super::camera::Camera;

pub(super) fn kind_color(kind: NodeKind) -> Color32 {
    match kind {
        NodeKind::Table => Color32::from_rgb(66, 133, 190),
        NodeKind::Cte => Color32::from_rgb(153, 102, 204),
        NodeKind::Subquery => Color32::from_rgb(120, 110, 220),
        NodeKind::Join => Color32::from_rgb(210, 140, 60),
        NodeKind::Filter => Color32::from_rgb(190, 170, 70),
        NodeKind::Aggregate => Color32::from_rgb(70, 170, 120),
        NodeKind::Union => Color32::from_rgb(90, 160, 200),
        NodeKind::Sort => Color32::from_rgb(150, 150, 160),
        NodeKind::Limit => Color32::from_rgb(130, 140, 150),
        NodeKind::Select => Color32::from_rgb(110, 170, 170),
        NodeKind::Window => Color32::from_rgb(170, 120, 170),
        NodeKind::Case => Color32::from_rgb(160, 140, 110),
        NodeKind::Result => Color32::from_rgb(80, 190, 90),
        NodeKind::Cluster => Color32::from_rgb(100, 110, 130),
    }
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * camera.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + camera.offset;

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [pos2(x, rect.top()), pos2(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [pos2(rect.left(), y), pos2(rect.right(), y)],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        y += step;
    }
}

/// Arrowed line from `start` to `end` in screen space.
pub(super) fn draw_arrow(painter: &Painter, start: Pos2, end: Pos2, stroke: Stroke) {
    painter.line_segment([start, end], stroke);

    let direction = end - start;
    let length = direction.length();
    if length < 1.0 {
        return;
    }
    let unit = direction / length;
    let normal = eframe::egui::vec2(-unit.y, unit.x);
    let head = 7.0_f32.min(length * 0.5);

    let base = end - unit * head;
    painter.line_segment([end, base + normal * (head * 0.55)], stroke);
    painter.line_segment([end, base - normal * (head * 0.55)], stroke);
}

/// Point where the ray from the rect's center toward `toward` crosses its
/// border. Used so edges attach to node borders instead of centers.
pub(super) fn rect_anchor(rect: Rect, toward: Pos2) -> Pos2 {
    let center = rect.center();
    let delta = toward - center;
    if delta.x.abs() < f32::EPSILON && delta.y.abs() < f32::EPSILON {
        return center;
    }

    let half_width = rect.width() * 0.5;
    let half_height = rect.height() * 0.5;
    let scale_x = if delta.x.abs() > f32::EPSILON {
        half_width / delta.x.abs()
    } else {
        f32::INFINITY
    };
    let scale_y = if delta.y.abs() > f32::EPSILON {
        half_height / delta.y.abs()
    } else {
        f32::INFINITY
    };

    center + delta * scale_x.min(scale_y).min(1.0)
}

pub(super) fn dist_to_segment(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq < f32::EPSILON {
        return (point - start).length();
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    (point - (start + segment * t)).length()
}
