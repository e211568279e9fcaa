// src/ui.rs - Camera view and gesture overlay
use crate::detector::{HandLandmarks, HAND_CONNECTIONS};
use crate::tracking::{Gesture, HandCenter};
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::RgbImage;
use std::f32::consts::FRAC_PI_4;

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Half the arrow shaft, in frame pixels.
    pub arrow_length: f32,
    pub arrow_thickness: f32,
    /// Arrow head length as a fraction of the shaft.
    pub tip_ratio: f32,
    pub arrow_color: Color32,
    pub text_color: Color32,
    pub text_size: f32,
    pub landmark_color: Color32,
    pub landmark_radius: f32,
    pub connection_color: Color32,
    pub connection_thickness: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            arrow_length: 50.0,
            arrow_thickness: 3.0,
            tip_ratio: 0.3,
            arrow_color: Color32::from_rgb(0, 255, 0),
            text_color: Color32::from_rgb(0, 255, 0),
            text_size: 20.0,
            landmark_color: Color32::from_rgb(255, 0, 0),
            landmark_radius: 2.0,
            connection_color: Color32::WHITE,
            connection_thickness: 2.0,
        }
    }
}

/// Arrow start and end in frame pixels, centered on the frame.
pub fn arrow_endpoints(
    gesture: Gesture,
    width: u32,
    height: u32,
    length: f32,
) -> Option<(Pos2, Pos2)> {
    let center = Pos2::new((width / 2) as f32, (height / 2) as f32);
    let (from, to) = match gesture {
        Gesture::Up => (Vec2::new(0.0, length), Vec2::new(0.0, -length)),
        Gesture::Down => (Vec2::new(0.0, -length), Vec2::new(0.0, length)),
        Gesture::Left => (Vec2::new(length, 0.0), Vec2::new(-length, 0.0)),
        Gesture::Right => (Vec2::new(-length, 0.0), Vec2::new(length, 0.0)),
        Gesture::None => return None,
    };
    Some((center + from, center + to))
}

/// The two barbs of an arrow head at `end`, each at 45 degrees to the shaft.
pub fn arrow_head(start: Pos2, end: Pos2, tip_ratio: f32) -> [Pos2; 2] {
    let back = start - end;
    let tip = back.length() * tip_ratio;
    let angle = back.y.atan2(back.x);

    let barb = |a: f32| Pos2::new(end.x + tip * a.cos(), end.y + tip * a.sin());
    [barb(angle + FRAC_PI_4), barb(angle - FRAC_PI_4)]
}

/// Largest size with the frame's aspect ratio that fits in `available`.
pub fn fit_frame(available: Vec2, frame_size: [usize; 2]) -> Vec2 {
    let (w, h) = (frame_size[0] as f32, frame_size[1] as f32);
    if w <= 0.0 || h <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (available.x / w).min(available.y / h).max(0.0);
    Vec2::new(w * scale, h * scale)
}

/// Maps frame pixels and normalized coordinates onto the on-screen image rect.
#[derive(Debug, Clone, Copy)]
pub struct FrameMapping {
    pub rect: Rect,
    pub frame_size: [usize; 2],
}

impl FrameMapping {
    pub fn scale(&self) -> f32 {
        if self.frame_size[0] == 0 {
            return 1.0;
        }
        self.rect.width() / self.frame_size[0] as f32
    }

    pub fn from_pixels(&self, p: Pos2) -> Pos2 {
        self.rect.min + p.to_vec2() * self.scale()
    }

    pub fn from_normalized(&self, x: f64, y: f64) -> Pos2 {
        self.rect.min + Vec2::new(x as f32 * self.rect.width(), y as f32 * self.rect.height())
    }
}

pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn draw(
        &self,
        painter: &egui::Painter,
        mapping: &FrameMapping,
        gesture: Gesture,
        hands: &[HandLandmarks],
        center: Option<HandCenter>,
    ) {
        for hand in hands {
            self.draw_hand(painter, mapping, hand);
        }
        if let Some(center) = center {
            let pos = mapping.from_normalized(center.x, center.y);
            painter.circle_stroke(pos, 6.0, Stroke::new(2.0, self.style.arrow_color));
        }
        self.draw_arrow(painter, mapping, gesture);
        self.draw_label(painter, mapping, gesture);
    }

    fn draw_hand(&self, painter: &egui::Painter, mapping: &FrameMapping, hand: &HandLandmarks) {
        let points: Vec<Pos2> = hand
            .points
            .iter()
            .map(|p| mapping.from_normalized(p.x, p.y))
            .collect();

        let stroke = Stroke::new(self.style.connection_thickness, self.style.connection_color);
        for &(from, to) in HAND_CONNECTIONS.iter() {
            if let (Some(a), Some(b)) = (points.get(from), points.get(to)) {
                painter.line_segment([*a, *b], stroke);
            }
        }

        for p in &points {
            painter.circle_filled(*p, self.style.landmark_radius, self.style.landmark_color);
        }
    }

    fn draw_arrow(&self, painter: &egui::Painter, mapping: &FrameMapping, gesture: Gesture) {
        let [w, h] = mapping.frame_size;
        let length = self.style.arrow_length;
        let Some((start, end)) = arrow_endpoints(gesture, w as u32, h as u32, length) else {
            return;
        };

        let width = self.style.arrow_thickness * mapping.scale();
        let stroke = Stroke::new(width, self.style.arrow_color);
        let [left, right] = arrow_head(start, end, self.style.tip_ratio);
        let tip = mapping.from_pixels(end);

        painter.line_segment([mapping.from_pixels(start), tip], stroke);
        painter.line_segment([tip, mapping.from_pixels(left)], stroke);
        painter.line_segment([tip, mapping.from_pixels(right)], stroke);
    }

    fn draw_label(&self, painter: &egui::Painter, mapping: &FrameMapping, gesture: Gesture) {
        painter.text(
            mapping.from_pixels(Pos2::new(10.0, 30.0)),
            egui::Align2::LEFT_BOTTOM,
            gesture_label(gesture),
            egui::FontId::proportional(self.style.text_size * mapping.scale()),
            self.style.text_color,
        );
    }
}

pub fn gesture_label(gesture: Gesture) -> String {
    format!("Current: {}", gesture)
}

// Camera frame shown as a texture that is updated in place
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    frame_size: [usize; 2],
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            frame_size: [0, 0],
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &RgbImage) {
        let size = [frame.width() as usize, frame.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, frame.as_raw());

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture(
                    "camera_frame",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
        self.frame_size = size;
    }

    /// Paint the latest frame and return where it landed on screen.
    pub fn show(&self, ui: &mut egui::Ui) -> Option<FrameMapping> {
        let texture = self.texture.as_ref()?;

        let size = fit_frame(ui.available_size(), self.frame_size);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        ui.painter().image(
            texture.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );

        Some(FrameMapping {
            rect,
            frame_size: self.frame_size,
        })
    }
}

impl Default for VideoWidget {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn arrows_are_centered_and_point_the_right_way() {
        let (start, end) = arrow_endpoints(Gesture::Up, 640, 480, 50.0).unwrap();
        assert_eq!(start, Pos2::new(320.0, 290.0));
        assert_eq!(end, Pos2::new(320.0, 190.0));

        let (start, end) = arrow_endpoints(Gesture::Down, 640, 480, 50.0).unwrap();
        assert!(end.y > start.y);

        let (start, end) = arrow_endpoints(Gesture::Left, 640, 480, 50.0).unwrap();
        assert_eq!((start.x, end.x), (370.0, 270.0));

        let (start, end) = arrow_endpoints(Gesture::Right, 640, 480, 50.0).unwrap();
        assert!(end.x > start.x);
        assert_eq!(start.y, 240.0);
    }

    #[test]
    fn no_arrow_for_none() {
        assert!(arrow_endpoints(Gesture::None, 640, 480, 50.0).is_none());
    }

    #[test]
    fn odd_frame_sizes_use_integer_center() {
        let (start, _) = arrow_endpoints(Gesture::Right, 641, 481, 50.0).unwrap();
        assert_eq!(start, Pos2::new(270.0, 240.0));
    }

    #[test]
    fn arrow_head_trails_the_tip() {
        let start = Pos2::new(320.0, 290.0);
        let end = Pos2::new(320.0, 190.0);
        let [a, b] = arrow_head(start, end, 0.3);

        // Both barbs sit behind the tip, one on each side of the shaft
        assert!(a.y > end.y && b.y > end.y);
        assert!((a.x - 320.0).signum() != (b.x - 320.0).signum());
        assert!(((a - end).length() - 30.0).abs() < 1e-3);
        assert!(close(Pos2::new(640.0 - a.x, a.y), b));
    }

    #[test]
    fn fit_frame_keeps_aspect_ratio() {
        let fitted = fit_frame(Vec2::new(1280.0, 600.0), [640, 480]);
        assert!((fitted.x - 800.0).abs() < 1e-3);
        assert!((fitted.y - 600.0).abs() < 1e-3);

        assert_eq!(fit_frame(Vec2::new(100.0, 100.0), [0, 0]), Vec2::ZERO);
    }

    #[test]
    fn mapping_scales_pixels_and_normalized_points() {
        let mapping = FrameMapping {
            rect: Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(320.0, 240.0)),
            frame_size: [640, 480],
        };

        assert!((mapping.scale() - 0.5).abs() < 1e-6);
        assert!(close(mapping.from_pixels(Pos2::new(640.0, 480.0)), Pos2::new(330.0, 260.0)));
        assert!(close(mapping.from_normalized(0.5, 0.5), Pos2::new(170.0, 140.0)));
    }

    #[test]
    fn label_always_names_the_gesture() {
        assert_eq!(gesture_label(Gesture::None), "Current: NONE");
        assert_eq!(gesture_label(Gesture::Left), "Current: LEFT");
    }
}
