use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug + Copy + Clone + PartialEq {}

/// Left-top-width-height format, contains left top corner and width-height.
/// This is the format detections arrive in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(from = "[f64; 4]", into = "[f64; 4]", bound = "")]
pub struct BBox<F: BBoxFormat>([f64; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f64; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

// Trusts the caller (or the wire) that the array is already in format `F`.
impl<F: BBoxFormat> From<[f64; 4]> for BBox<F> {
    fn from(slice: [f64; 4]) -> Self {
        BBox(slice, PhantomData)
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f64; 4] {
        &self.0
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(x: f64, y: f64, w: f64, h: f64) -> Self {
        BBox([x, y, w, h], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f64 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f64 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }

    /// Non-positive or non-finite extents have no area to overlap with.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.is_finite() && self.width() > 0.0 && self.height() > 0.0)
    }

    /// Grows the box by `padding` pixels on every side.
    #[inline]
    pub fn expand(&self, padding: f64) -> Self {
        BBox::ltwh(
            self.left() - padding,
            self.top() - padding,
            self.width() + padding * 2.0,
            self.height() + padding * 2.0,
        )
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f64> {
        let c = self.as_xywh();
        na::Point2::new(c.cx(), c.cy())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(l: f64, t: f64, r: f64, b: f64) -> Self {
        BBox([l, t, r, b], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f64 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f64 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f64 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f64 {
        self.0[3]
    }

    #[inline]
    pub fn area(&self) -> f64 {
        (self.right() - self.left()) * (self.bottom() - self.top())
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        BBox([cx, cy, w, h], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f64 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f64 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self([v.0[0], v.0[1], v.0[0] + v.0[2], v.0[1] + v.0[3]], PhantomData)
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self([v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]], PhantomData)
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0] + v.0[2] / 2.0, v.0[1] + v.0[3] / 2.0, v.0[2], v.0[3]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        Self(
            [v.0[0] - v.0[2] / 2.0, v.0[1] - v.0[3] / 2.0, v.0[2], v.0[3]],
            PhantomData,
        )
    }
}

/// Intersection over union of two boxes.
///
/// Returns `0.0` for disjoint boxes and for degenerate input, so callers can
/// compare the result against a threshold without further checks.
pub fn iou(a: &BBox<Ltwh>, b: &BBox<Ltwh>) -> f64 {
    if a.is_degenerate() || b.is_degenerate() {
        return 0.0;
    }

    let a = a.as_ltrb();
    let b = b.as_ltrb();

    let iw = (a.right().min(b.right()) - a.left().max(b.left())).max(0.0);
    let ih = (a.bottom().min(b.bottom()) - a.top().max(b.top())).max(0.0);
    let intersection = iw * ih;

    // Areas are taken from the corner form so identical boxes give exactly 1.0
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_disjoint() {
        let a = BBox::ltwh(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltwh(20.0, 20.0, 10.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BBox::ltwh(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltwh(10.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_identical() {
        let boxes = [
            BBox::ltwh(10.0, 10.0, 50.0, 50.0),
            BBox::ltwh(0.1, 0.2, 0.3, 0.7),
            BBox::ltwh(-35.5, -12.25, 17.3, 91.1),
        ];

        for b in &boxes {
            assert_eq!(iou(b, b), 1.0);
        }
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BBox::ltwh(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltwh(5.0, 5.0, 10.0, 10.0);

        // intersection 25, union 175
        assert!((iou(&a, &b) - 25.0 / 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_symmetric() {
        let pairs = [
            (BBox::ltwh(0.0, 0.0, 10.0, 10.0), BBox::ltwh(5.0, 5.0, 10.0, 10.0)),
            (BBox::ltwh(3.3, 1.7, 40.1, 9.9), BBox::ltwh(12.0, -4.0, 7.5, 30.0)),
            (BBox::ltwh(0.0, 0.0, 1.0, 1.0), BBox::ltwh(0.0, 0.0, 100.0, 100.0)),
        ];

        for (a, b) in &pairs {
            assert_eq!(iou(a, b), iou(b, a));
        }
    }

    #[test]
    fn test_iou_degenerate() {
        let a = BBox::ltwh(0.0, 0.0, 10.0, 10.0);

        assert_eq!(iou(&a, &BBox::ltwh(0.0, 0.0, 0.0, 10.0)), 0.0);
        assert_eq!(iou(&a, &BBox::ltwh(0.0, 0.0, -10.0, -10.0)), 0.0);
        assert_eq!(iou(&BBox::ltwh(0.0, 0.0, 0.0, 0.0), &BBox::ltwh(0.0, 0.0, 0.0, 0.0)), 0.0);
        assert_eq!(iou(&a, &BBox::ltwh(f64::NAN, 0.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_expand_and_center() {
        let b = BBox::ltwh(100.0, 100.0, 30.0, 60.0);
        let e = b.expand(50.0);

        assert_eq!(e.as_slice(), &[50.0, 50.0, 130.0, 160.0]);
        assert_eq!(b.center(), na::Point2::new(115.0, 130.0));
        assert_eq!(e.center(), b.center());
    }

    #[test]
    fn test_format_conversions() {
        let b = BBox::ltwh(10.0, 20.0, 30.0, 40.0);

        assert_eq!(b.as_ltrb().as_slice(), &[10.0, 20.0, 40.0, 60.0]);
        assert_eq!(b.as_ltrb().as_ltwh(), b);
        assert_eq!(b.as_xywh().as_ltwh(), b);
    }

    #[test]
    fn test_serde_as_array() {
        let b: BBox<Ltwh> = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(b, BBox::ltwh(1.0, 2.0, 3.0, 4.0));
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
