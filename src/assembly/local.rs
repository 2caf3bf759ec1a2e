use crate::nalgebra::{DMatrix, DMatrixViewMut, Scalar};
use crate::Real;
use rayon::prelude::*;

mod penalty;
mod quadrature_table;
mod viscous;

pub use penalty::*;
pub use quadrature_table::*;
pub use viscous::*;

pub trait ElementConnectivityAssembler {
    fn solution_dim(&self) -> usize;

    fn num_elements(&self) -> usize;

    fn num_nodes(&self) -> usize;

    fn element_node_count(&self, element_index: usize) -> usize;

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize);
}

pub trait ElementMatrixAssembler<T: Scalar>: ElementConnectivityAssembler {
    /// Assembles the element matrix of the given element into `output`, overwriting its contents.
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<T>) -> eyre::Result<()>;

    fn assemble_element_matrix(&self, element_index: usize) -> eyre::Result<DMatrix<T>>
    where
        T: Real,
    {
        let size = self.solution_dim() * self.element_node_count(element_index);
        let mut output = DMatrix::zeros(size, size);
        self.assemble_element_matrix_into(element_index, DMatrixViewMut::from(&mut output))?;
        Ok(output)
    }
}

/// Assembles the element matrices of all elements in sequence.
pub fn assemble_element_matrices<T, Assembler>(assembler: &Assembler) -> eyre::Result<Vec<DMatrix<T>>>
where
    T: Real,
    Assembler: ?Sized + ElementMatrixAssembler<T>,
{
    (0..assembler.num_elements())
        .map(|element_index| assembler.assemble_element_matrix(element_index))
        .collect()
}

/// Assembles the element matrices of all elements in parallel.
///
/// Elements are independent, so the result is identical to [`assemble_element_matrices`].
pub fn assemble_element_matrices_par<T, Assembler>(assembler: &Assembler) -> eyre::Result<Vec<DMatrix<T>>>
where
    T: Real,
    Assembler: ?Sized + ElementMatrixAssembler<T> + Sync,
{
    (0..assembler.num_elements())
        .into_par_iter()
        .map(|element_index| assembler.assemble_element_matrix(element_index))
        .collect()
}
