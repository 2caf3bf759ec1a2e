//! Quadrature rules on the reference domains of the elements in [`element`](crate::element).
use crate::Real;
use itertools::iproduct;
use nalgebra::{OPoint, Point2, Point3, U2, U3};
use numeric_literals::replace_float_literals;

pub type QuadraturePair<T, D> = (Vec<T>, Vec<OPoint<T, D>>);
pub type QuadraturePair2d<T> = QuadraturePair<T, U2>;
pub type QuadraturePair3d<T> = QuadraturePair<T, U3>;

fn convert<T: Real>(x: f64) -> T {
    T::from_f64(x).expect("Quadrature data must fit in T")
}

/// Gauss-Legendre weights and points on $[-1, 1]$, with points in ascending order.
///
/// # Panics
///
/// Panics if `num_points` is zero.
pub fn gauss<T: Real>(num_points: usize) -> (Vec<T>, Vec<T>) {
    assert!(num_points > 0, "Gauss rule must have at least one point");
    if num_points == 1 {
        return (vec![convert(2.0)], vec![T::zero()]);
    }

    let rule = gauss_quad::GaussLegendre::init(num_points);
    let weights = rule.weights.into_iter().rev().map(convert).collect();
    let points = rule.nodes.into_iter().rev().map(convert).collect();
    (weights, points)
}

/// Tensor-product Gauss rule on $[-1, 1]^2$, exact for polynomials of degree `2n - 1` in each
/// variable.
pub fn quadrilateral_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair2d<T> {
    let (w, x) = gauss::<T>(num_points_per_dim);
    let n = num_points_per_dim;
    iproduct!(0..n, 0..n)
        .map(|(j, i)| (w[i] * w[j], Point2::new(x[i], x[j])))
        .unzip()
}

/// Tensor-product Gauss rule on $[-1, 1]^3$.
pub fn hexahedron_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair3d<T> {
    let (w, x) = gauss::<T>(num_points_per_dim);
    let n = num_points_per_dim;
    iproduct!(0..n, 0..n, 0..n)
        .map(|(k, j, i)| (w[i] * w[j] * w[k], Point3::new(x[i], x[j], x[k])))
        .unzip()
}

/// Three-point rule on the reference triangle, exact for quadratic polynomials.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn triangle_degree2<T: Real>() -> QuadraturePair2d<T> {
    let w = 2.0 / 3.0;
    let weights = vec![w, w, w];
    let points = vec![
        Point2::new(-2.0 / 3.0, -2.0 / 3.0),
        Point2::new(1.0 / 3.0, -2.0 / 3.0),
        Point2::new(-2.0 / 3.0, 1.0 / 3.0),
    ];
    (weights, points)
}

/// Four-point rule on the reference tetrahedron, exact for quadratic polynomials.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn tetrahedron_degree2<T: Real>() -> QuadraturePair3d<T> {
    // Barycentric coordinates of the points
    let a = 0.5854101966249685;
    let b = 0.1381966011250105;
    let w = 1.0 / 3.0;
    let to_reference = |l1: T, l2: T, l3: T| Point3::new(2.0 * l1 - 1.0, 2.0 * l2 - 1.0, 2.0 * l3 - 1.0);
    let weights = vec![w, w, w, w];
    let points = vec![
        to_reference(b, b, b),
        to_reference(a, b, b),
        to_reference(b, a, b),
        to_reference(b, b, a),
    ];
    (weights, points)
}
