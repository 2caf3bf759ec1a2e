use crate::allocators::CartesianAllocator;
use crate::element::{Hex8, Quad4, ReferenceElement, Tet4, Tri3};
use crate::space::ElementGeometry;
use crate::voigt::CartesianDim;
use crate::Real;
use eyre::eyre;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, Dyn, MatrixViewMut, OMatrix, OPoint, Scalar, U2, U3};
use serde::{Deserialize, Serialize};

pub mod procedural;

/// Index-based data structure for conforming meshes consisting of a single element type.
///
/// The connectivity is stored as a flat array, with the node indices of element `i` located at
/// `i * n .. (i + 1) * n`, where `n` is the number of nodes of the element type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(serialize = "T: Serialize, E: Serialize", deserialize = "T: Deserialize<'de>, E: Deserialize<'de>"))]
pub struct Mesh<T: Scalar, D, E>
where
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    // serde's not able correctly determine the necessary trait bounds in this case,
    // so write our own
    #[serde(bound(
        serialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Serialize",
        deserialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Deserialize<'de>"
    ))]
    vertices: Vec<OPoint<T, D>>,
    connectivity: Vec<usize>,
    nodes_per_element: usize,
    element: E,
}

pub type QuadMesh2d<T> = Mesh<T, U2, Quad4>;
pub type TriangleMesh2d<T> = Mesh<T, U2, Tri3>;
pub type HexMesh<T> = Mesh<T, U3, Hex8>;
pub type Tet4Mesh<T> = Mesh<T, U3, Tet4>;

impl<T, D, E> Mesh<T, D, E>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn vertices(&self) -> &[OPoint<T, D>] {
        &self.vertices
    }

    /// The flat connectivity array.
    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len() / self.nodes_per_element
    }

    /// The node indices of the given cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell index is out of bounds.
    pub fn cell_nodes(&self, cell_index: usize) -> &[usize] {
        let n = self.nodes_per_element;
        &self.connectivity[n * cell_index..n * (cell_index + 1)]
    }

    pub fn cell_iter(&self) -> impl '_ + Iterator<Item = &[usize]> {
        self.connectivity.chunks_exact(self.nodes_per_element)
    }
}

impl<T, D, E> Mesh<T, D, E>
where
    T: Real,
    D: CartesianDim,
    E: ReferenceElement<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    /// Construct a mesh from vertices and a flat connectivity array.
    ///
    /// # Panics
    ///
    /// Panics if the length of the connectivity array is not a multiple of the number of nodes
    /// per element, or if the connectivity references vertices out of bounds.
    pub fn from_vertices_and_connectivity(vertices: Vec<OPoint<T, D>>, connectivity: Vec<usize>, element: E) -> Self {
        let nodes_per_element = element.num_nodes();
        assert!(nodes_per_element > 0, "Element must have at least one node");
        assert_eq!(
            connectivity.len() % nodes_per_element,
            0,
            "Connectivity length must be a multiple of the number of nodes per element"
        );
        if let Some(&index) = connectivity.iter().find(|&&index| index >= vertices.len()) {
            panic!(
                "Connectivity references vertex {} but mesh has only {} vertices",
                index,
                vertices.len()
            );
        }
        Self {
            vertices,
            connectivity,
            nodes_per_element,
            element,
        }
    }

    /// Computes the Jacobian of the reference-to-physical map of the given cell, given the
    /// reference gradients of the cell's basis functions.
    fn cell_jacobian(&self, cell_index: usize, reference_gradients: &MatrixViewMut<T, D, Dyn>) -> OMatrix<T, D, D> {
        let mut jacobian = OMatrix::<T, D, D>::zeros();
        for (local_index, &node) in self.cell_nodes(cell_index).iter().enumerate() {
            jacobian.ger(
                T::one(),
                &self.vertices[node].coords,
                &reference_gradients.column(local_index),
                T::one(),
            );
        }
        jacobian
    }
}

impl<T, E> Mesh<T, U2, E>
where
    T: Real,
{
    /// Splits every quadrilateral into two triangles along the diagonal from its first to its
    /// third node.
    pub fn split_into_triangles(&self) -> TriangleMesh2d<T> {
        assert_eq!(self.nodes_per_element, 4, "Only quadrilateral meshes can be split into triangles");
        let mut connectivity = Vec::with_capacity(self.connectivity.len() / 4 * 6);
        for quad in self.cell_iter() {
            connectivity.extend_from_slice(&[quad[0], quad[1], quad[2]]);
            connectivity.extend_from_slice(&[quad[0], quad[2], quad[3]]);
        }
        Mesh::from_vertices_and_connectivity(self.vertices.clone(), connectivity, Tri3)
    }
}

impl<T, D, E> ElementGeometry<T, D> for Mesh<T, D, E>
where
    T: Real,
    D: CartesianDim,
    E: ReferenceElement<T, D>,
    DefaultAllocator: CartesianAllocator<T, D>,
{
    fn num_elements(&self) -> usize {
        self.num_cells()
    }

    fn num_nodes(&self) -> usize {
        self.vertices.len()
    }

    fn element_node_count(&self, _element_index: usize) -> usize {
        self.nodes_per_element
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.cell_nodes(element_index));
    }

    fn populate_element_basis(&self, _element_index: usize, basis_values: &mut [T], reference_coords: &OPoint<T, D>) {
        self.element.populate_basis(basis_values, reference_coords);
    }

    fn populate_element_gradients(
        &self,
        element_index: usize,
        mut gradients: MatrixViewMut<T, D, Dyn>,
        reference_coords: &OPoint<T, D>,
    ) -> eyre::Result<T> {
        // First populate gradients with respect to reference coords
        self.element
            .populate_basis_gradients(MatrixViewMut::from(&mut gradients), reference_coords);

        let j = self.cell_jacobian(element_index, &gradients);
        let j_det = j.determinant();
        let j_inv_t = j
            .try_inverse()
            .ok_or_else(|| eyre!("Singular element Jacobian encountered"))?
            .transpose();

        // Transform reference gradients to gradients with respect to physical coords
        for mut phi_grad in gradients.column_iter_mut() {
            let new_phi_grad = &j_inv_t * &phi_grad;
            phi_grad.copy_from(&new_phi_grad);
        }

        Ok(j_det)
    }

    fn element_reference_centroid(&self, _element_index: usize) -> OPoint<T, D> {
        self.element.reference_centroid()
    }
}
