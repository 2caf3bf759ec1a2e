use crate::assembly::local::QuadratureTable;
use crate::nalgebra::allocator::Allocator;
use crate::nalgebra::{DefaultAllocator, DimName, Dyn, MatrixView, MatrixViewMut, OPoint, Scalar};
use crate::{Real, SmallDim};

/// Scratch storage for the nodes, basis values and basis gradients of a single element.
///
/// The gradient storage only ever grows, so that once the buffer has seen the largest element
/// in a mesh no further allocations take place.
#[derive(Debug)]
pub struct BasisFunctionBuffer<T: Scalar> {
    element_nodes: Vec<usize>,
    element_basis_values: Vec<T>,
    element_basis_gradients: Vec<T>,
    node_count: usize,
    dim: usize,
}

impl<T: Real> Default for BasisFunctionBuffer<T> {
    fn default() -> Self {
        Self {
            element_nodes: Vec::new(),
            element_basis_values: Vec::new(),
            element_basis_gradients: Vec::new(),
            node_count: 0,
            dim: 0,
        }
    }
}

impl<T: Real> BasisFunctionBuffer<T> {
    pub fn resize(&mut self, node_count: usize, dim: usize) {
        self.element_nodes.resize(node_count, usize::MAX);
        self.element_basis_values.resize(node_count, T::zero());
        let required = node_count * dim;
        if self.element_basis_gradients.len() < required {
            self.element_basis_gradients.resize(required, T::zero());
        }
        self.node_count = node_count;
        self.dim = dim;
    }

    /// The number of gradient entries the buffer can hold without reallocating.
    pub fn gradient_capacity(&self) -> usize {
        self.element_basis_gradients.len()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn element_nodes(&self) -> &[usize] {
        &self.element_nodes
    }

    pub fn element_nodes_mut(&mut self) -> &mut [usize] {
        &mut self.element_nodes
    }

    pub fn element_basis_values(&self) -> &[T] {
        &self.element_basis_values
    }

    pub fn element_basis_values_mut(&mut self) -> &mut [T] {
        &mut self.element_basis_values
    }

    /// The basis gradients of the current element, one column per node.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was last resized for a different dimension.
    pub fn element_gradients<D: DimName>(&self) -> MatrixView<T, D, Dyn> {
        assert_eq!(self.dim, D::dim(), "Gradient buffer dimension mismatch");
        let len = self.dim * self.node_count;
        MatrixView::from_slice_generic(&self.element_basis_gradients[..len], D::name(), Dyn(self.node_count))
    }

    /// Mutable access to the basis gradients of the current element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was last resized for a different dimension.
    pub fn element_gradients_mut<D: DimName>(&mut self) -> MatrixViewMut<T, D, Dyn> {
        assert_eq!(self.dim, D::dim(), "Gradient buffer dimension mismatch");
        let len = self.dim * self.node_count;
        MatrixViewMut::from_slice_generic(&mut self.element_basis_gradients[..len], D::name(), Dyn(self.node_count))
    }
}

/// A buffer for storing intermediate quadrature data.
#[derive(Debug)]
pub struct QuadratureBuffer<T, D, Data = ()>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    quad_weights: Vec<T>,
    quad_points: Vec<OPoint<T, D>>,
    quad_data: Vec<Data>,
}

impl<T, D, Data> Default for QuadratureBuffer<T, D, Data>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    fn default() -> Self {
        Self {
            quad_weights: Vec::new(),
            quad_points: Vec::new(),
            quad_data: Vec::new(),
        }
    }
}

impl<T, D, Data> QuadratureBuffer<T, D, Data>
where
    T: Real,
    D: SmallDim,
    Data: Default + Clone,
    DefaultAllocator: Allocator<T, D>,
{
    /// Resizes the internal buffer storages to the given size.
    pub fn resize(&mut self, quadrature_size: usize) {
        self.quad_points.resize(quadrature_size, OPoint::origin());
        self.quad_weights.resize(quadrature_size, T::zero());
        self.quad_data.resize(quadrature_size, Data::default());
    }

    /// Populates the buffer by querying a quadrature table with the given element index.
    pub fn populate_element_quadrature_from_table(
        &mut self,
        element_index: usize,
        table: &(impl ?Sized + QuadratureTable<T, D, Data = Data>),
    ) {
        let quadrature_size = table.element_quadrature_size(element_index);
        self.resize(quadrature_size);
        table.populate_element_quadrature_and_data(
            element_index,
            &mut self.quad_points,
            &mut self.quad_weights,
            &mut self.quad_data,
        );
    }

    pub fn weights(&self) -> &[T] {
        &self.quad_weights
    }

    pub fn points(&self) -> &[OPoint<T, D>] {
        &self.quad_points
    }

    pub fn data(&self) -> &[Data] {
        &self.quad_data
    }
}
