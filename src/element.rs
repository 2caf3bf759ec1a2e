//! Linear Lagrange reference elements.
//!
//! All elements are defined on reference domains contained in $[-1, 1]^d$. The quadrilateral and
//! hexahedron occupy the full cube, while the triangle and tetrahedron are the corner simplices
//! with the right angle at $(-1, \dots, -1)$.
use crate::allocators::CartesianAllocator;
use crate::voigt::CartesianDim;
use crate::Real;
use nalgebra::{DefaultAllocator, Dyn, MatrixViewMut, OPoint, Point2, Point3, U2, U3};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// A reference element with a fixed number of nodes and a nodal Lagrange basis.
pub trait ReferenceElement<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// Returns the number of nodes in the element.
    fn num_nodes(&self) -> usize;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `basis_values` does not have exactly one entry per node.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &OPoint<T, D>);

    /// Populates the columns of `gradients` with the gradients of each basis function with
    /// respect to reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `gradients` does not have exactly one column per node.
    fn populate_basis_gradients(&self, gradients: MatrixViewMut<T, D, Dyn>, reference_coords: &OPoint<T, D>);

    /// The centroid of the reference domain.
    fn reference_centroid(&self) -> OPoint<T, D>;
}

/// Bilinear quadrilateral on $[-1, 1]^2$.
///
/// Nodes are ordered counter-clockwise, starting at $(-1, -1)$.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad4;

/// Linear triangle with vertices $(-1, -1)$, $(1, -1)$ and $(-1, 1)$.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tri3;

/// Trilinear hexahedron on $[-1, 1]^3$.
///
/// The first four nodes make up the bottom face ($z = -1$) in the same order as [`Quad4`],
/// followed by the top face.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex8;

/// Linear tetrahedron with vertices $(-1, -1, -1)$, $(1, -1, -1)$, $(-1, 1, -1)$ and
/// $(-1, -1, 1)$.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tet4;

const QUAD4_NODE_SIGNS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

#[rustfmt::skip]
const HEX8_NODE_SIGNS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0,  1.0], [1.0, -1.0,  1.0], [1.0, 1.0,  1.0], [-1.0, 1.0,  1.0],
];

fn sign<T: Real>(s: f64) -> T {
    T::from_f64(s).expect("Literal must fit in T")
}

fn check_basis_len(len: usize, num_nodes: usize) {
    assert_eq!(len, num_nodes, "Basis buffer must have one entry per element node");
}

impl<T: Real> ReferenceElement<T, U2> for Quad4 {
    fn num_nodes(&self) -> usize {
        4
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        check_basis_len(basis_values.len(), 4);
        for (value, [a, b]) in basis_values.iter_mut().zip(QUAD4_NODE_SIGNS) {
            let (a, b): (T, T) = (sign(a), sign(b));
            *value = 0.25 * (1.0 + a * xi[0]) * (1.0 + b * xi[1]);
        }
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis_gradients(&self, mut gradients: MatrixViewMut<T, U2, Dyn>, xi: &Point2<T>) {
        check_basis_len(gradients.ncols(), 4);
        for (i, [a, b]) in QUAD4_NODE_SIGNS.into_iter().enumerate() {
            let (a, b): (T, T) = (sign(a), sign(b));
            gradients[(0, i)] = 0.25 * a * (1.0 + b * xi[1]);
            gradients[(1, i)] = 0.25 * b * (1.0 + a * xi[0]);
        }
    }

    fn reference_centroid(&self) -> Point2<T> {
        Point2::origin()
    }
}

impl<T: Real> ReferenceElement<T, U2> for Tri3 {
    fn num_nodes(&self) -> usize {
        3
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        check_basis_len(basis_values.len(), 3);
        basis_values[0] = -0.5 * (xi[0] + xi[1]);
        basis_values[1] = 0.5 * (1.0 + xi[0]);
        basis_values[2] = 0.5 * (1.0 + xi[1]);
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis_gradients(&self, mut gradients: MatrixViewMut<T, U2, Dyn>, _xi: &Point2<T>) {
        check_basis_len(gradients.ncols(), 3);
        gradients.copy_from_slice(&[
            -0.5, -0.5,
             0.5,  0.0,
             0.0,  0.5,
        ]);
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn reference_centroid(&self) -> Point2<T> {
        Point2::new(-1.0 / 3.0, -1.0 / 3.0)
    }
}

impl<T: Real> ReferenceElement<T, U3> for Hex8 {
    fn num_nodes(&self) -> usize {
        8
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        check_basis_len(basis_values.len(), 8);
        for (value, [a, b, c]) in basis_values.iter_mut().zip(HEX8_NODE_SIGNS) {
            let (a, b, c): (T, T, T) = (sign(a), sign(b), sign(c));
            *value = 0.125 * (1.0 + a * xi[0]) * (1.0 + b * xi[1]) * (1.0 + c * xi[2]);
        }
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis_gradients(&self, mut gradients: MatrixViewMut<T, U3, Dyn>, xi: &Point3<T>) {
        check_basis_len(gradients.ncols(), 8);
        for (i, [a, b, c]) in HEX8_NODE_SIGNS.into_iter().enumerate() {
            let (a, b, c): (T, T, T) = (sign(a), sign(b), sign(c));
            let (fx, fy, fz) = (1.0 + a * xi[0], 1.0 + b * xi[1], 1.0 + c * xi[2]);
            gradients[(0, i)] = 0.125 * a * fy * fz;
            gradients[(1, i)] = 0.125 * b * fx * fz;
            gradients[(2, i)] = 0.125 * c * fx * fy;
        }
    }

    fn reference_centroid(&self) -> Point3<T> {
        Point3::origin()
    }
}

impl<T: Real> ReferenceElement<T, U3> for Tet4 {
    fn num_nodes(&self) -> usize {
        4
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        check_basis_len(basis_values.len(), 4);
        basis_values[0] = -0.5 * (1.0 + xi[0] + xi[1] + xi[2]);
        basis_values[1] = 0.5 * (1.0 + xi[0]);
        basis_values[2] = 0.5 * (1.0 + xi[1]);
        basis_values[3] = 0.5 * (1.0 + xi[2]);
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn populate_basis_gradients(&self, mut gradients: MatrixViewMut<T, U3, Dyn>, _xi: &Point3<T>) {
        check_basis_len(gradients.ncols(), 4);
        gradients.copy_from_slice(&[
            -0.5, -0.5, -0.5,
             0.5,  0.0,  0.0,
             0.0,  0.5,  0.0,
             0.0,  0.0,  0.5,
        ]);
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn reference_centroid(&self) -> Point3<T> {
        Point3::new(-0.5, -0.5, -0.5)
    }
}
