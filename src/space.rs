use crate::allocators::CartesianAllocator;
use crate::voigt::CartesianDim;
use crate::Real;
use nalgebra::{DefaultAllocator, Dyn, MatrixViewMut, OPoint};

/// Element geometry queries needed for assembling element matrices.
///
/// All elements are assumed to be volumetric, i.e. the reference dimension coincides with the
/// spatial dimension `D`.
pub trait ElementGeometry<T, D>
where
    T: Real,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn num_elements(&self) -> usize;

    fn num_nodes(&self) -> usize;

    fn element_node_count(&self, element_index: usize) -> usize;

    /// Populates `output` with the global node indices of the given element.
    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize);

    /// Evaluates the basis functions of the given element at the given reference coordinates.
    fn populate_element_basis(&self, element_index: usize, basis_values: &mut [T], reference_coords: &OPoint<T, D>);

    /// Populates the columns of `gradients` with the gradients of the element basis functions with
    /// respect to *physical* coordinates, and returns the determinant of the element Jacobian at
    /// the given reference coordinates.
    ///
    /// Returns an error if the Jacobian is singular.
    fn populate_element_gradients(
        &self,
        element_index: usize,
        gradients: MatrixViewMut<T, D, Dyn>,
        reference_coords: &OPoint<T, D>,
    ) -> eyre::Result<T>;

    /// The centroid of the reference domain of the given element.
    fn element_reference_centroid(&self, element_index: usize) -> OPoint<T, D>;
}

impl<T, D, G> ElementGeometry<T, D> for &G
where
    T: Real,
    D: CartesianDim,
    G: ?Sized + ElementGeometry<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn num_elements(&self) -> usize {
        G::num_elements(self)
    }

    fn num_nodes(&self) -> usize {
        G::num_nodes(self)
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        G::element_node_count(self, element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        G::populate_element_nodes(self, output, element_index)
    }

    fn populate_element_basis(&self, element_index: usize, basis_values: &mut [T], reference_coords: &OPoint<T, D>) {
        G::populate_element_basis(self, element_index, basis_values, reference_coords)
    }

    fn populate_element_gradients(
        &self,
        element_index: usize,
        gradients: MatrixViewMut<T, D, Dyn>,
        reference_coords: &OPoint<T, D>,
    ) -> eyre::Result<T> {
        G::populate_element_gradients(self, element_index, gradients, reference_coords)
    }

    fn element_reference_centroid(&self, element_index: usize) -> OPoint<T, D> {
        G::element_reference_centroid(self, element_index)
    }
}
