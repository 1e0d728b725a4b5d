use crate::geometry::{BoundingBox, Point, Transform};
use std::f64::consts::PI;

const ARC_SAMPLES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(u8),
    Number(f64),
}

struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            bytes: data.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_whitespace() || self.bytes[self.pos] == b',')
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<Token> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_separators();
        let byte = *self.bytes.get(self.pos)?;
        if byte.is_ascii_alphabetic() && byte != b'e' && byte != b'E' {
            self.pos += 1;
            return Some(Token::Command(byte));
        }
        self.number().map(Token::Number)
    }

    fn number(&mut self) -> Option<f64> {
        self.skip_separators();
        let start = self.pos;
        let bytes = self.bytes;
        if matches!(bytes.get(self.pos), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut seen_digit = false;
        while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
            seen_digit = true;
        }
        if bytes.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
                seen_digit = true;
            }
        }
        if !seen_digit {
            self.pos = start;
            return None;
        }
        if matches!(bytes.get(self.pos), Some(b'e') | Some(b'E')) {
            let exp_start = self.pos;
            self.pos += 1;
            if matches!(bytes.get(self.pos), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            let digits_start = self.pos;
            while matches!(bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                self.pos = exp_start;
            }
        }
        std::str::from_utf8(&bytes[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Arc flags may be written without separators (`a1 1 0 0010 10`).
    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        let flag = match self.bytes.get(self.pos)? {
            b'0' => false,
            b'1' => true,
            _ => return None,
        };
        self.pos += 1;
        Some(flag)
    }

    fn has_number(&mut self) -> bool {
        matches!(self.peek(), Some(Token::Number(_)))
    }
}

/// Bounding box of path data `d` after `transform`, or `None` when the path is
/// empty or malformed before any drawable segment. Curves are transformed
/// before their extrema are taken; elliptical arcs are sampled.
pub(crate) fn bounding_box(d: &str, transform: &Transform) -> Option<BoundingBox> {
    let mut points: Vec<Point> = Vec::new();
    let mut tokens = Tokenizer::new(d);
    let mut current = Point::default();
    let mut subpath_start = Point::default();
    let mut last_control: Option<(u8, Point)> = None;
    let mut command: Option<u8> = None;

    loop {
        let cmd = match tokens.peek() {
            None => break,
            Some(Token::Command(c)) => {
                tokens.next_token();
                c
            }
            // implicit repetition of the previous command
            Some(Token::Number(_)) => match command {
                Some(b'M') => b'L',
                Some(b'm') => b'l',
                Some(c) => c,
                None => return None,
            },
        };
        command = Some(cmd);
        let relative = cmd.is_ascii_lowercase();
        let base = if relative { current } else { Point::default() };
        let upper = cmd.to_ascii_uppercase();

        let ok = match upper {
            b'Z' => {
                current = subpath_start;
                last_control = None;
                true
            }
            b'M' | b'L' | b'T' => {
                let Some(p) = read_point(&mut tokens, base) else {
                    break;
                };
                if upper == b'T' {
                    let control = reflect(last_control, b'Q', current);
                    push_quadratic(&mut points, transform, current, control, p);
                    last_control = Some((b'Q', control));
                } else {
                    last_control = None;
                }
                if upper == b'M' {
                    subpath_start = p;
                }
                points.push(transform.apply(p));
                current = p;
                true
            }
            b'H' | b'V' => {
                let Some(value) = tokens.number() else {
                    break;
                };
                current = if upper == b'H' {
                    Point::new(value + if relative { current.x } else { 0.0 }, current.y)
                } else {
                    Point::new(current.x, value + if relative { current.y } else { 0.0 })
                };
                points.push(transform.apply(current));
                last_control = None;
                true
            }
            b'C' | b'S' => {
                let c1 = if upper == b'C' {
                    read_point(&mut tokens, base)
                } else {
                    Some(reflect(last_control, b'C', current))
                };
                let (Some(c1), Some(c2), Some(end)) = (
                    c1,
                    read_point(&mut tokens, base),
                    read_point(&mut tokens, base),
                ) else {
                    break;
                };
                push_cubic(&mut points, transform, [current, c1, c2, end]);
                last_control = Some((b'C', c2));
                current = end;
                true
            }
            b'Q' => {
                let (Some(control), Some(end)) =
                    (read_point(&mut tokens, base), read_point(&mut tokens, base))
                else {
                    break;
                };
                push_quadratic(&mut points, transform, current, control, end);
                last_control = Some((b'Q', control));
                current = end;
                true
            }
            b'A' => {
                let arc = (|| {
                    let rx = tokens.number()?;
                    let ry = tokens.number()?;
                    let rotation = tokens.number()?;
                    let large_arc = tokens.flag()?;
                    let sweep = tokens.flag()?;
                    let end = read_point(&mut tokens, base)?;
                    Some((rx, ry, rotation, large_arc, sweep, end))
                })();
                let Some((rx, ry, rotation, large_arc, sweep, end)) = arc else {
                    break;
                };
                for p in sample_arc(current, rx, ry, rotation, large_arc, sweep, end) {
                    points.push(transform.apply(p));
                }
                points.push(transform.apply(end));
                last_control = None;
                current = end;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        if upper == b'Z' && tokens.has_number() {
            // numbers after Z are an error in path data
            break;
        }
    }

    BoundingBox::from_points(points)
}

fn read_point(tokens: &mut Tokenizer<'_>, base: Point) -> Option<Point> {
    let x = tokens.number()?;
    let y = tokens.number()?;
    Some(Point::new(base.x + x, base.y + y))
}

fn reflect(last_control: Option<(u8, Point)>, kind: u8, current: Point) -> Point {
    match last_control {
        Some((k, control)) if k == kind => {
            Point::new(2.0 * current.x - control.x, 2.0 * current.y - control.y)
        }
        _ => current,
    }
}

fn push_quadratic(
    points: &mut Vec<Point>,
    transform: &Transform,
    start: Point,
    control: Point,
    end: Point,
) {
    let c1 = Point::new(
        start.x + 2.0 / 3.0 * (control.x - start.x),
        start.y + 2.0 / 3.0 * (control.y - start.y),
    );
    let c2 = Point::new(
        end.x + 2.0 / 3.0 * (control.x - end.x),
        end.y + 2.0 / 3.0 * (control.y - end.y),
    );
    push_cubic(points, transform, [start, c1, c2, end]);
}

fn push_cubic(points: &mut Vec<Point>, transform: &Transform, local: [Point; 4]) {
    let p = local.map(|pt| transform.apply(pt));
    points.push(p[0]);
    points.push(p[3]);
    let xs = [p[0].x, p[1].x, p[2].x, p[3].x];
    let ys = [p[0].y, p[1].y, p[2].y, p[3].y];
    for t in cubic_extrema(xs).into_iter().chain(cubic_extrema(ys)) {
        points.push(Point::new(cubic_at(xs, t), cubic_at(ys, t)));
    }
}

fn cubic_at(c: [f64; 4], t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * c[0] + 3.0 * mt * mt * t * c[1] + 3.0 * mt * t * t * c[2] + t * t * t * c[3]
}

/// Parameters in (0, 1) where the derivative of a 1D cubic vanishes.
fn cubic_extrema(c: [f64; 4]) -> Vec<f64> {
    let a = -c[0] + 3.0 * c[1] - 3.0 * c[2] + c[3];
    let b = 2.0 * (c[0] - 2.0 * c[1] + c[2]);
    let k = c[1] - c[0];
    let mut roots = Vec::new();
    if a.abs() < 1e-12 {
        if b.abs() > 1e-12 {
            roots.push(-k / b);
        }
    } else {
        let disc = b * b - 4.0 * a * k;
        if disc >= 0.0 {
            let sq = disc.sqrt();
            roots.push((-b + sq) / (2.0 * a));
            roots.push((-b - sq) / (2.0 * a));
        }
    }
    roots.retain(|t| *t > 0.0 && *t < 1.0);
    roots
}

/// Points along an SVG elliptical arc, using the endpoint to center
/// parameterization conversion from the SVG implementation notes.
fn sample_arc(
    start: Point,
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
    end: Point,
) -> Vec<Point> {
    let (mut rx, mut ry) = (rx.abs(), ry.abs());
    if rx == 0.0 || ry == 0.0 || start == end {
        return Vec::new();
    }
    let (sin_phi, cos_phi) = rotation.to_radians().sin_cos();
    let dx2 = (start.x - end.x) / 2.0;
    let dy2 = (start.y - end.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    if den == 0.0 {
        return Vec::new();
    }
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);
    let cx = cos_phi * cxp - sin_phi * cyp + (start.x + end.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (start.y + end.y) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut delta = angle(
        (x1p - cxp) / rx,
        (y1p - cyp) / ry,
        (-x1p - cxp) / rx,
        (-y1p - cyp) / ry,
    );
    if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    }

    (0..=ARC_SAMPLES)
        .map(|i| {
            let theta = theta1 + delta * (i as f64 / ARC_SAMPLES as f64);
            let (sin_t, cos_t) = theta.sin_cos();
            Point::new(
                cx + rx * cos_phi * cos_t - ry * sin_phi * sin_t,
                cy + rx * sin_phi * cos_t + ry * cos_phi * sin_t,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(d: &str) -> BoundingBox {
        bounding_box(d, &Transform::identity()).unwrap()
    }

    fn assert_box(actual: BoundingBox, expected: (f64, f64, f64, f64)) {
        let got = (actual.left, actual.top, actual.right, actual.bottom);
        for (a, e) in [got.0, got.1, got.2, got.3]
            .iter()
            .zip([expected.0, expected.1, expected.2, expected.3])
        {
            assert!((a - e).abs() < 1e-6, "got {got:?}, expected {expected:?}");
        }
    }

    #[test]
    fn polygon_paths() {
        assert_box(bbox("M 0,0 L 10,0 L 10,20 Z"), (0.0, 0.0, 10.0, 20.0));
        assert_box(bbox("m 5 5 h 10 v 10 h -10 z"), (5.0, 5.0, 15.0, 15.0));
        assert_box(bbox("M0 0 10 10 -5 3"), (-5.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn compact_numbers() {
        assert_box(bbox("M-1-2L.5.5"), (-1.0, -2.0, 0.5, 0.5));
        assert_box(bbox("M1e1,0 L0,0"), (0.0, 0.0, 10.0, 0.0));
    }

    #[test]
    fn cubic_extrema_are_exact() {
        // symmetric bump peaking at y = -7.5
        assert_box(bbox("M0,0 C0,-10 10,-10 10,0"), (0.0, -7.5, 10.0, 0.0));
    }

    #[test]
    fn arcs_are_sampled() {
        // half circle of radius 5 above the x axis
        let b = bbox("M0,0 A5,5 0 0 1 10,0");
        assert_box(b, (0.0, -5.0, 10.0, 0.0));
        let compact = bbox("M0,0 a5 5 0 0110 0");
        assert_box(compact, (0.0, -5.0, 10.0, 0.0));
    }

    #[test]
    fn transformed_paths() {
        let t = Transform::translate(100.0, 0.0) * Transform::scale(2.0, 2.0);
        let b = bounding_box("M0,0 L10,10", &t).unwrap();
        assert_box(b, (100.0, 0.0, 120.0, 20.0));
    }

    #[test]
    fn empty_paths_have_no_box() {
        assert!(bounding_box("", &Transform::identity()).is_none());
        assert!(bounding_box("10 10", &Transform::identity()).is_none());
    }
}
