//! Geometry primitives: rectangles, the feature-mask polygon, and the
//! least-squares similarity transform used to propagate tracked regions.

use nalgebra::{Matrix2x3, Point2};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        debug_assert!(width >= 0.0 && height >= 0.0, "negative rect dimensions");
        Self { x, y, width, height }
    }

    /// Top-left corner.
    pub fn tl(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    /// Bottom-right corner.
    pub fn br(&self) -> Point2<f32> {
        Point2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rectangle spanned by two opposite corners, in any order.
    pub fn from_corners(a: Point2<f32>, b: Point2<f32>) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Sub-rectangle given as fractions of this rectangle.
    pub fn fraction(&self, fx: f32, fy: f32, fw: f32, fh: f32) -> Self {
        Self::new(
            self.x + fx * self.width,
            self.y + fy * self.height,
            fw * self.width,
            fh * self.height,
        )
    }
}

/// Simple polygon used as a spatial mask for feature detection.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Point2<f32>>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f32>>) -> Self {
        Self { vertices }
    }

    /// Ray-casting point-in-polygon test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.vertices[i];
            let pj = self.vertices[j];
            if ((pi.y > y) != (pj.y > y)) && (x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Forehead trapezoid inside a face box, the region where tracking features
/// are detected. Stays clear of the eyes and mouth, which move independently
/// of the head.
pub fn forehead_polygon(face: Rect) -> Polygon {
    Polygon::new(vec![
        Point2::new(face.x + 0.22 * face.width, face.y + 0.21 * face.height),
        Point2::new(face.x + 0.78 * face.width, face.y + 0.21 * face.height),
        Point2::new(face.x + 0.70 * face.width, face.y + 0.50 * face.height),
        Point2::new(face.x + 0.30 * face.width, face.y + 0.50 * face.height),
    ])
}

/// Least-squares fit of a similarity transform (translation + rotation +
/// uniform scale) mapping `from` onto `to`, returned as a 2x3 affine matrix.
///
/// Returns `None` when the point sets are empty, of unequal length, or
/// degenerate (all source points coincident).
pub fn fit_similarity(from: &[Point2<f32>], to: &[Point2<f32>]) -> Option<Matrix2x3<f32>> {
    if from.is_empty() || from.len() != to.len() {
        return None;
    }
    let n = from.len() as f32;

    let mut cf = Point2::new(0.0f32, 0.0);
    let mut ct = Point2::new(0.0f32, 0.0);
    for (f, t) in from.iter().zip(to) {
        cf.x += f.x;
        cf.y += f.y;
        ct.x += t.x;
        ct.y += t.y;
    }
    let cf = Point2::new(cf.x / n, cf.y / n);
    let ct = Point2::new(ct.x / n, ct.y / n);

    // Closed-form solution of min Σ |R s (p - cf) + t - (q - ct)|²
    // with R s = [[a, -b], [b, a]].
    let mut a_num = 0.0f32;
    let mut b_num = 0.0f32;
    let mut den = 0.0f32;
    for (f, t) in from.iter().zip(to) {
        let fx = f.x - cf.x;
        let fy = f.y - cf.y;
        let tx = t.x - ct.x;
        let ty = t.y - ct.y;
        a_num += fx * tx + fy * ty;
        b_num += fx * ty - fy * tx;
        den += fx * fx + fy * fy;
    }

    let (a, b) = if den > f32::EPSILON {
        (a_num / den, b_num / den)
    } else if from.len() == 1 {
        // Single point: pure translation.
        (1.0, 0.0)
    } else {
        return None;
    };

    let tx = ct.x - a * cf.x + b * cf.y;
    let ty = ct.y - b * cf.x - a * cf.y;

    Some(Matrix2x3::new(a, -b, tx, b, a, ty))
}

/// Apply a 2x3 affine matrix to a point.
pub fn transform_point(m: &Matrix2x3<f32>, p: Point2<f32>) -> Point2<f32> {
    Point2::new(
        m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)],
        m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)],
    )
}

/// Apply a 2x3 affine matrix to a rectangle by transforming its corners.
pub fn transform_rect(m: &Matrix2x3<f32>, r: Rect) -> Rect {
    Rect::from_corners(transform_point(m, r.tl()), transform_point(m, r.br()))
}
