use gtk::cairo;

/// Axis-aligned rectangle in canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub const RED: Rgb = Rgb {
        red: 1.0,
        green: 0.0,
        blue: 0.0,
    };
}

/// 2D surface the widget paints onto.
///
/// Painting never fails from the caller's point of view.
pub trait Canvas {
    fn width(&self) -> f64;
    /// Reset the whole surface to transparent.
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Rgb);
}

/// Canvas over the Cairo context handed to a `draw` signal handler
pub struct CairoCanvas<'a> {
    cr: &'a cairo::Context,
    width: f64,
}

impl<'a> CairoCanvas<'a> {
    pub fn new(cr: &'a cairo::Context, width: f64) -> Self {
        Self { cr, width }
    }
}

impl Canvas for CairoCanvas<'_> {
    fn width(&self) -> f64 {
        self.width
    }

    fn clear(&mut self) {
        self.cr.save().ok();
        self.cr.set_operator(cairo::Operator::Clear);
        if let Err(e) = self.cr.paint() {
            tracing::debug!("canvas clear failed: {}", e);
        }
        self.cr.restore().ok();
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.cr.set_source_rgb(color.red, color.green, color.blue);
        self.cr.rectangle(rect.x, rect.y, rect.width, rect.height);
        if let Err(e) = self.cr.fill() {
            tracing::debug!("canvas fill failed: {}", e);
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Fill(Rect, Rgb),
}

/// Canvas that records every call, for assertions in tests
#[cfg(test)]
pub struct RecordingCanvas {
    width: f64,
    pub ops: Vec<DrawOp>,
}

#[cfg(test)]
impl RecordingCanvas {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ops: Vec::new(),
        }
    }

    pub fn filled(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill(rect, _) => Some(*rect),
                DrawOp::Clear => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Canvas for RecordingCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.ops.push(DrawOp::Fill(rect, color));
    }
}
