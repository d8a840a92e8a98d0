use glam::Vec2;

/// Element box in CSS pixels, as reported by `getBoundingClientRect`.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct CssRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CssRect {
    #[inline]
    pub fn contains(&self, client: Vec2) -> bool {
        client.x >= self.left
            && client.x <= self.left + self.width
            && client.y >= self.top
            && client.y <= self.top + self.height
    }
}

/// Client coordinates to backing-store pixels of a canvas.
#[inline]
pub fn client_to_canvas_px(client: Vec2, rect: CssRect, backing_w: u32, backing_h: u32) -> Vec2 {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Vec2::ZERO;
    }
    let x_css = client.x - rect.left;
    let y_css = client.y - rect.top;
    Vec2::new(
        x_css / rect.width * backing_w as f32,
        y_css / rect.height * backing_h as f32,
    )
}

/// Backing-store size for a CSS box at a device pixel ratio, never zero.
#[inline]
pub fn backing_size(rect: CssRect, device_pixel_ratio: f64) -> (u32, u32) {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let w = (rect.width as f64 * dpr) as u32;
    let h = (rect.height as f64 * dpr) as u32;
    (w.max(1), h.max(1))
}

/// Browser `deltaY` normalised to pixels (`deltaMode` 1 = lines, 2 = pages).
#[inline]
pub fn wheel_delta_px(delta_y: f64, delta_mode: u32) -> f32 {
    let scale = match delta_mode {
        1 => 16.0,
        2 => 800.0,
        _ => 1.0,
    };
    (delta_y * scale) as f32
}

/// Primary pointer with the main button.
#[inline]
pub fn is_primary_press(is_primary: bool, button: i16) -> bool {
    is_primary && button == 0
}
