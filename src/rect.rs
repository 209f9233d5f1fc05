//! Resolve payload
//!
//! An action resolves with either an integer (by convention a result or error
//! code) or a rectangle (e.g. the bounds of the first line of text during line
//! karaoke). Never both.

use std::fmt;

/// Axis-aligned rectangle in display coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// The value an action was resolved with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResolveArg {
    Integer(i32),
    Rect(Rect),
}

impl Default for ResolveArg {
    fn default() -> Self {
        ResolveArg::Integer(0)
    }
}

impl ResolveArg {
    /// The integer payload, or 0 if the action carries a rect.
    pub fn integer(&self) -> i32 {
        match self {
            ResolveArg::Integer(v) => *v,
            ResolveArg::Rect(_) => 0,
        }
    }

    /// The rect payload, or the zero rect if the action carries an integer.
    pub fn rect(&self) -> Rect {
        match self {
            ResolveArg::Rect(r) => *r,
            ResolveArg::Integer(_) => Rect::default(),
        }
    }
}

impl From<i32> for ResolveArg {
    fn from(value: i32) -> Self {
        ResolveArg::Integer(value)
    }
}

impl From<Rect> for ResolveArg {
    fn from(value: Rect) -> Self {
        ResolveArg::Rect(value)
    }
}

impl fmt::Display for ResolveArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveArg::Integer(v) => write!(f, "{}", v),
            ResolveArg::Rect(r) => write!(f, "{}", r),
        }
    }
}
