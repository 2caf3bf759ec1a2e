//! Basic procedural mesh generation routines.
use crate::element::{Hex8, Quad4};
use crate::mesh::{HexMesh, Mesh, QuadMesh2d, TriangleMesh2d};
use crate::Real;
use nalgebra::{Point2, Point3, Vector2};

fn usize_to_real<T: Real>(i: usize) -> T {
    T::from_usize(i).expect("Must be able to fit usize in T")
}

pub fn create_unit_square_uniform_quad_mesh_2d<T>(cells_per_dim: usize) -> QuadMesh2d<T>
where
    T: Real,
{
    create_rectangular_uniform_quad_mesh_2d(T::one(), 1, 1, cells_per_dim, &Vector2::new(T::zero(), T::one()))
}

pub fn create_unit_square_uniform_tri_mesh_2d<T>(cells_per_dim: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    create_unit_square_uniform_quad_mesh_2d(cells_per_dim).split_into_triangles()
}

pub fn create_unit_box_uniform_hex_mesh_3d<T>(cells_per_dim: usize) -> HexMesh<T>
where
    T: Real,
{
    create_rectangular_uniform_hex_mesh(T::one(), 1, 1, 1, cells_per_dim)
}

/// Generates an axis-aligned rectangular uniform mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// The mesh extends to the right and downwards from `top_left`.
pub fn create_rectangular_uniform_quad_mesh_2d<T>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    top_left: &Vector2<T>,
) -> QuadMesh2d<T>
where
    T: Real,
{
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 {
        return Mesh::from_vertices_and_connectivity(Vec::new(), Vec::new(), Quad4);
    }

    let cell_size = unit_length / usize_to_real(cells_per_unit);
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;
    let num_vertices_x = num_cells_x + 1;
    let num_vertices_y = num_cells_y + 1;

    let to_global_vertex_index = |i, j| num_vertices_x * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y);
    for j in 0..num_vertices_y {
        for i in 0..num_vertices_x {
            let offset = Vector2::new(usize_to_real::<T>(i), -usize_to_real::<T>(j)) * cell_size;
            vertices.push(Point2::from(top_left + offset));
        }
    }

    let mut connectivity = Vec::with_capacity(4 * num_cells_x * num_cells_y);
    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            connectivity.extend_from_slice(&[
                to_global_vertex_index(i, j + 1),
                to_global_vertex_index(i + 1, j + 1),
                to_global_vertex_index(i + 1, j),
                to_global_vertex_index(i, j),
            ]);
        }
    }

    Mesh::from_vertices_and_connectivity(vertices, connectivity, Quad4)
}

/// Generates an axis-aligned box of uniform hexahedra with one corner at the origin.
pub fn create_rectangular_uniform_hex_mesh<T>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    units_z: usize,
    cells_per_unit: usize,
) -> HexMesh<T>
where
    T: Real,
{
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 || units_z == 0 {
        return Mesh::from_vertices_and_connectivity(Vec::new(), Vec::new(), Hex8);
    }

    let cell_size = unit_length / usize_to_real(cells_per_unit);
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;
    let num_cells_z = units_z * cells_per_unit;
    let num_vertices_x = num_cells_x + 1;
    let num_vertices_y = num_cells_y + 1;
    let num_vertices_z = num_cells_z + 1;

    let idx = |i: usize, j: usize, k: usize| (num_vertices_x * num_vertices_y) * k + num_vertices_x * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y * num_vertices_z);
    for k in 0..num_vertices_z {
        for j in 0..num_vertices_y {
            for i in 0..num_vertices_x {
                vertices.push(Point3::new(
                    usize_to_real::<T>(i) * cell_size,
                    usize_to_real::<T>(j) * cell_size,
                    usize_to_real::<T>(k) * cell_size,
                ));
            }
        }
    }

    let mut connectivity = Vec::with_capacity(8 * num_cells_x * num_cells_y * num_cells_z);
    for k in 0..num_cells_z {
        for j in 0..num_cells_y {
            for i in 0..num_cells_x {
                connectivity.extend_from_slice(&[
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i + 1, j + 1, k + 1),
                    idx(i, j + 1, k + 1),
                ]);
            }
        }
    }

    Mesh::from_vertices_and_connectivity(vertices, connectivity, Hex8)
}
