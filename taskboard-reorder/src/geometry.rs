//! Pointer geometry: points, bounding boxes, axes and drag directions.

use serde::{Deserialize, Serialize};

/// Pointer position in layout coordinates (origin top-left, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Coordinate along the given axis
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.y,
            Axis::Horizontal => self.x,
        }
    }
}

/// A bounding box for hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive)
    pub x: f64,
    /// Top edge (inclusive)
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

    /// Right edge (exclusive)
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive)
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, p: Point) -> bool {
        !self.is_empty()
            && p.x >= self.x
            && p.x < self.right()
            && p.y >= self.y
            && p.y < self.bottom()
    }

    /// Midpoint along the given axis
    pub fn mid(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.y + self.height / 2.0,
            Axis::Horizontal => self.x + self.width / 2.0,
        }
    }

    /// Whether the pointer falls within this box's extent across the given
    /// axis (X range for vertical lists, Y range for horizontal ones)
    pub fn spans_across(&self, axis: Axis, p: Point) -> bool {
        if self.is_empty() {
            return false;
        }
        match axis {
            Axis::Vertical => p.x >= self.x && p.x < self.right(),
            Axis::Horizontal => p.y >= self.y && p.y < self.bottom(),
        }
    }
}

/// Main axis along which a list stacks its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Columns: items top to bottom, lists left to right
    #[default]
    Vertical,
    /// Rows: items left to right, lists top to bottom
    Horizontal,
}

/// Direction of pointer travel, used only for the drag affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Direction of the dominant component of the displacement `from -> to`.
    ///
    /// Returns `None` when the pointer did not move.
    pub fn of_displacement(from: Point, to: Point) -> Option<Self> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if dy > 0.0 {
            Self::Down
        } else {
            Self::Up
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(109.9, 59.9)));
        assert!(!r.contains(Point::new(110.0, 20.0)));
        assert!(!r.contains(Point::new(20.0, 60.0)));
    }

    #[test]
    fn test_empty_rect_contains_nothing() {
        let r = Rect::new(0.0, 0.0, 0.0, 10.0);
        assert!(!r.contains(Point::new(0.0, 0.0)));
        assert!(!r.spans_across(Axis::Vertical, Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_mid() {
        let r = Rect::new(0.0, 100.0, 200.0, 40.0);
        assert_eq!(r.mid(Axis::Vertical), 120.0);
        assert_eq!(r.mid(Axis::Horizontal), 100.0);
    }

    #[test]
    fn test_spans_across_ignores_main_axis() {
        let column = Rect::new(0.0, 0.0, 100.0, 300.0);
        // Far below the column, still within its X range
        assert!(column.spans_across(Axis::Vertical, Point::new(50.0, 900.0)));
        assert!(!column.spans_across(Axis::Vertical, Point::new(150.0, 10.0)));
    }

    #[test]
    fn test_direction_of_displacement() {
        let o = Point::new(0.0, 0.0);
        assert_eq!(Direction::of_displacement(o, Point::new(0.0, 5.0)), Some(Direction::Down));
        assert_eq!(Direction::of_displacement(o, Point::new(0.0, -5.0)), Some(Direction::Up));
        assert_eq!(Direction::of_displacement(o, Point::new(8.0, 5.0)), Some(Direction::Right));
        assert_eq!(Direction::of_displacement(o, Point::new(-8.0, 5.0)), Some(Direction::Left));
        assert_eq!(Direction::of_displacement(o, o), None);
    }
}
