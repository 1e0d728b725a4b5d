use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Mul;

static TRANSFORM_FN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(matrix|translate|scale|rotate|skewX|skewY)\s*\(([^)]*)\)").unwrap()
});

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 2D affine transform in SVG matrix order `(a, b, c, d, e, f)`:
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub fn skew_x(degrees: f64) -> Self {
        Self::new(1.0, 0.0, degrees.to_radians().tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(degrees: f64) -> Self {
        Self::new(1.0, degrees.to_radians().tan(), 0.0, 1.0, 0.0, 0.0)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < EPSILON || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        let e = -(a * self.e + c * self.f);
        let f = -(b * self.e + d * self.f);
        Some(Self::new(a, b, c, d, e, f))
    }

    pub fn apply(&self, point: Point) -> Point {
        Point {
            x: self.a * point.x + self.c * point.y + self.e,
            y: self.b * point.x + self.d * point.y + self.f,
        }
    }

    /// Parses an SVG `transform` attribute. Returns `None` when any function in
    /// the list is malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let mut result = Self::identity();
        let mut consumed = 0;
        for caps in TRANSFORM_FN_RE.captures_iter(text) {
            let whole = caps.get(0)?;
            if !is_separator(&text[consumed..whole.start()]) {
                return None;
            }
            consumed = whole.end();
            let args = parse_numbers(&caps[2])?;
            let next = match (&caps[1], args.as_slice()) {
                ("matrix", [a, b, c, d, e, f]) => Self::new(*a, *b, *c, *d, *e, *f),
                ("translate", [tx]) => Self::translate(*tx, 0.0),
                ("translate", [tx, ty]) => Self::translate(*tx, *ty),
                ("scale", [s]) => Self::scale(*s, *s),
                ("scale", [sx, sy]) => Self::scale(*sx, *sy),
                ("rotate", [angle]) => Self::rotate(*angle),
                ("rotate", [angle, cx, cy]) => {
                    Self::translate(*cx, *cy) * Self::rotate(*angle) * Self::translate(-cx, -cy)
                }
                ("skewX", [angle]) => Self::skew_x(*angle),
                ("skewY", [angle]) => Self::skew_y(*angle),
                _ => return None,
            };
            result = result * next;
        }
        if !is_separator(&text[consumed..]) {
            return None;
        }
        Some(result)
    }

    pub fn to_svg(&self) -> String {
        format!(
            "matrix({},{},{},{},{},{})",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

/// `lhs * rhs` applies `rhs` first, then `lhs` (SVG list order).
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }
}

fn is_separator(text: &str) -> bool {
    text.chars().all(|ch| ch == ',' || ch.is_whitespace())
}

pub(crate) fn parse_numbers(text: &str) -> Option<Vec<f64>> {
    text.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut bbox: Option<BoundingBox> = None;
        for point in points {
            let single = BoundingBox::new(point.x, point.y, point.x, point.y);
            bbox = Some(match bbox {
                Some(current) => current.union(&single),
                None => single,
            });
        }
        bbox
    }

    pub fn around(center: Point, rx: f64, ry: f64) -> Self {
        Self::new(center.x - rx, center.y - ry, center.x + rx, center.y + ry)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Bounding box of this box's corners after `transform`.
    pub fn transformed(&self, transform: &Transform) -> BoundingBox {
        let corners = [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ];
        // four corners always yield a box
        BoundingBox::from_points(corners.into_iter().map(|p| transform.apply(p))).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn parses_transform_lists_in_order() {
        let t = Transform::parse("translate(10, 20) scale(2)").unwrap();
        assert!(close(t.apply(Point::new(1.0, 1.0)), Point::new(12.0, 22.0)));

        let t = Transform::parse("matrix(1 0 0 1 5 -5)").unwrap();
        assert!(close(t.apply(Point::default()), Point::new(5.0, -5.0)));

        let t = Transform::parse("rotate(90, 10, 10)").unwrap();
        assert!(close(t.apply(Point::new(20.0, 10.0)), Point::new(10.0, 20.0)));

        assert_eq!(Transform::parse("").unwrap(), Transform::identity());
    }

    #[test]
    fn rejects_malformed_transforms() {
        assert_eq!(Transform::parse("translate(1,2,3)"), None);
        assert_eq!(Transform::parse("wobble(3)"), None);
        assert_eq!(Transform::parse("translate(a)"), None);
    }

    #[test]
    fn inverse_undoes_transform() {
        let t = Transform::parse("translate(3,4) rotate(30) scale(2,0.5)").unwrap();
        let inv = t.inverse().unwrap();
        let p = Point::new(7.5, -2.25);
        assert!(close(inv.apply(t.apply(p)), p));
        assert!(Transform::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn bounding_box_metrics() {
        let bbox = BoundingBox::new(10.0, 0.0, 0.0, 20.0);
        assert_eq!(bbox.left, 0.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 20.0);
        assert_eq!(bbox.center(), Point::new(5.0, 10.0));
        let moved = bbox.transformed(&Transform::translate(1.0, 1.0));
        assert_eq!(moved, BoundingBox::new(1.0, 1.0, 11.0, 21.0));
    }
}
