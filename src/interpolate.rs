//! Interpolation of the velocity field inside elements.
use crate::allocators::CartesianAllocator;
use crate::voigt::CartesianDim;
use crate::Real;
use nalgebra::{DVector, DefaultAllocator, Dyn, MatrixView, OMatrix, OVector, U1};

/// Interpolated velocity and velocity gradient at a single point.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySample<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    pub velocity: OVector<T, D>,
    /// Entry `(c, i)` holds $\partial u_c / \partial x_i$.
    pub velocity_gradient: OMatrix<T, D, D>,
}

/// Evaluates a velocity field inside an element.
pub trait FieldInterpolator<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// Interpolates the velocity and its gradient inside an element, given the element's nodes
    /// and the basis values and global basis gradients at the point of interest.
    fn interpolate_within_element(
        &self,
        element_index: usize,
        element_nodes: &[usize],
        basis_values: &[T],
        basis_gradients: MatrixView<T, D, Dyn>,
    ) -> VelocitySample<T, D>;
}

/// A velocity field given by nodal values in a global, node-major vector.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalVelocityField<T: Real> {
    velocities: DVector<T>,
}

impl<T: Real> NodalVelocityField<T> {
    pub fn from_nodal_velocities(velocities: DVector<T>) -> Self {
        Self { velocities }
    }

    pub fn nodal_velocities(&self) -> &DVector<T> {
        &self.velocities
    }
}

impl<T, D> FieldInterpolator<T, D> for NodalVelocityField<T>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn interpolate_within_element(
        &self,
        _element_index: usize,
        element_nodes: &[usize],
        basis_values: &[T],
        basis_gradients: MatrixView<T, D, Dyn>,
    ) -> VelocitySample<T, D> {
        assert_eq!(element_nodes.len(), basis_values.len(), "Basis values must match element nodes");
        assert_eq!(element_nodes.len(), basis_gradients.ncols(), "Basis gradients must match element nodes");
        let d = D::dim();
        let mut velocity = OVector::<T, D>::zeros();
        let mut velocity_gradient = OMatrix::<T, D, D>::zeros();
        for (local_index, &node) in element_nodes.iter().enumerate() {
            let u_node = self.velocities.generic_view((d * node, 0), (D::name(), U1));
            velocity.axpy(basis_values[local_index], &u_node, T::one());
            velocity_gradient.ger(T::one(), &u_node, &basis_gradients.column(local_index), T::one());
        }
        VelocitySample {
            velocity,
            velocity_gradient,
        }
    }
}
