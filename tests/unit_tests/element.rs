use crate::unit_tests::assembly::distorted_quad_mesh;
use fenris_viscous::allocators::CartesianAllocator;
use fenris_viscous::element::{Hex8, Quad4, ReferenceElement, Tet4, Tri3};
use fenris_viscous::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fenris_viscous::mesh::{QuadMesh2d, TriangleMesh2d};
use fenris_viscous::nalgebra::{
    DefaultAllocator, Dyn, Matrix2, MatrixViewMut, OMatrix, OPoint, Point2, Point3, U2, U3,
};
use fenris_viscous::space::ElementGeometry;
use fenris_viscous::CartesianDim;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use proptest::prelude::*;

fn quad_point() -> impl Strategy<Value = Point2<f64>> {
    [-1.0..=1.0f64, -1.0..=1.0f64].prop_map(|[x, y]| Point2::new(x, y))
}

fn hex_point() -> impl Strategy<Value = Point3<f64>> {
    [-1.0..=1.0f64, -1.0..=1.0f64, -1.0..=1.0f64].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

fn triangle_point() -> impl Strategy<Value = Point2<f64>> {
    quad_point().prop_map(|p| if p.x + p.y > 0.0 { Point2::new(-p.y, -p.x) } else { p })
}

fn tetrahedron_point() -> impl Strategy<Value = Point3<f64>> {
    [0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64].prop_map(|[a, b, c]| {
        // Fold the unit cube into the corner simplex
        let mut s = [a, b, c];
        s.sort_by(|x, y| x.total_cmp(y));
        let (l1, l2, l3) = (s[0], s[1] - s[0], s[2] - s[1]);
        Point3::new(2.0 * l1 - 1.0, 2.0 * l2 - 1.0, 2.0 * l3 - 1.0)
    })
}

fn basis<E, D>(element: &E, xi: &OPoint<f64, D>) -> Vec<f64>
where
    E: ReferenceElement<f64, D>,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<f64, D>,
{
    let mut values = vec![0.0; element.num_nodes()];
    element.populate_basis(&mut values, xi);
    values
}

fn gradients<E, D>(element: &E, xi: &OPoint<f64, D>) -> OMatrix<f64, D, Dyn>
where
    E: ReferenceElement<f64, D>,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<f64, D>,
{
    let mut gradients = OMatrix::<f64, D, Dyn>::zeros(element.num_nodes());
    element.populate_basis_gradients(MatrixViewMut::from(&mut gradients), xi);
    gradients
}

/// Checks partition of unity, zero-sum gradients and gradients against central differences.
fn check_reference_basis<E, D>(element: &E, xi: &OPoint<f64, D>)
where
    E: ReferenceElement<f64, D>,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<f64, D>,
{
    let values = basis(element, xi);
    assert_scalar_eq!(values.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-14);

    let g = gradients(element, xi);
    for k in 0..D::dim() {
        assert_scalar_eq!(g.row(k).sum(), 0.0, comp = abs, tol = 1e-14);
    }

    let h = 1e-6;
    for k in 0..D::dim() {
        let mut xi_plus = xi.clone();
        let mut xi_minus = xi.clone();
        xi_plus[k] += h;
        xi_minus[k] -= h;
        let plus = basis(element, &xi_plus);
        let minus = basis(element, &xi_minus);
        for i in 0..element.num_nodes() {
            let fd = (plus[i] - minus[i]) / (2.0 * h);
            assert_scalar_eq!(g[(k, i)], fd, comp = abs, tol = 1e-8);
        }
    }
}

fn check_nodal_interpolation<E, D>(element: &E, reference_nodes: &[OPoint<f64, D>])
where
    E: ReferenceElement<f64, D>,
    D: CartesianDim,
    DefaultAllocator: CartesianAllocator<f64, D>,
{
    assert_eq!(reference_nodes.len(), element.num_nodes());
    for (j, node) in reference_nodes.iter().enumerate() {
        let values = basis(element, node);
        for (i, &value) in values.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_scalar_eq!(value, expected, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn basis_functions_are_nodal() {
    let quad_nodes = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(x, y)| Point2::new(x, y));
    check_nodal_interpolation(&Quad4, &quad_nodes);

    let tri_nodes = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0)].map(|(x, y)| Point2::new(x, y));
    check_nodal_interpolation(&Tri3, &tri_nodes);

    let hex_nodes: Vec<_> = [-1.0, 1.0]
        .into_iter()
        .flat_map(|z| [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(x, y)| Point3::new(x, y, z)))
        .collect();
    check_nodal_interpolation(&Hex8, &hex_nodes);

    let tet_nodes = [(-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (-1.0, -1.0, 1.0)]
        .map(|(x, y, z)| Point3::new(x, y, z));
    check_nodal_interpolation(&Tet4, &tet_nodes);
}

#[test]
fn reference_centroids() {
    assert_eq!(ReferenceElement::<f64, U2>::reference_centroid(&Quad4), Point2::origin());
    assert_eq!(ReferenceElement::<f64, U3>::reference_centroid(&Hex8), Point3::origin());
    assert_eq!(ReferenceElement::<f64, U3>::reference_centroid(&Tet4), Point3::new(-0.5, -0.5, -0.5));

    // All basis functions of the simplices are equal at the centroid
    let tri_centroid = ReferenceElement::<f64, U2>::reference_centroid(&Tri3);
    for value in basis(&Tri3, &tri_centroid) {
        assert_scalar_eq!(value, 1.0 / 3.0, comp = abs, tol = 1e-14);
    }
    let tet_centroid = ReferenceElement::<f64, U3>::reference_centroid(&Tet4);
    for value in basis(&Tet4, &tet_centroid) {
        assert_scalar_eq!(value, 0.25, comp = abs, tol = 1e-14);
    }
}

#[test]
fn physical_gradients_reproduce_coordinates_on_distorted_quad() {
    let mesh = distorted_quad_mesh();
    let xi = Point2::new(0.3, -0.6);
    let mut g = OMatrix::<f64, U2, Dyn>::zeros(4);
    let det = mesh
        .populate_element_gradients(0, MatrixViewMut::from(&mut g), &xi)
        .unwrap();
    assert!(det > 0.0);

    // sum_i x_i (grad N_i)^T = I for any isoparametric element
    let mut identity = Matrix2::zeros();
    for (i, x) in mesh.vertices().iter().enumerate() {
        identity += x.coords * g.column(i).transpose();
    }
    assert_matrix_eq!(identity, Matrix2::identity(), comp = abs, tol = 1e-13);
}

#[test]
fn singular_element_is_an_error() {
    let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
    let mesh = TriangleMesh2d::from_vertices_and_connectivity(vertices, vec![0, 1, 2], Tri3);
    let mut g = OMatrix::<f64, U2, Dyn>::zeros(3);
    let result = mesh.populate_element_gradients(0, MatrixViewMut::from(&mut g), &Point2::new(-0.5, -0.5));
    assert!(result.is_err());
}

#[test]
fn split_quad_into_triangles() {
    let mesh: QuadMesh2d<f64> = distorted_quad_mesh();
    let triangles = mesh.split_into_triangles();
    assert_eq!(triangles.num_cells(), 2);
    assert_eq!(triangles.connectivity(), &[0, 1, 2, 0, 2, 3]);
    assert_eq!(triangles.vertices(), mesh.vertices());
    assert_eq!(ElementGeometry::<f64, U2>::element_node_count(&triangles, 1), 3);
}

#[test]
fn unit_square_triangle_mesh_has_unit_area() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
    assert_eq!(mesh.num_cells(), 18);
    let mut g = OMatrix::<f64, U2, Dyn>::zeros(3);
    let centroid = ReferenceElement::<f64, U2>::reference_centroid(&Tri3);
    let mut area = 0.0;
    for cell in 0..mesh.num_cells() {
        let det = mesh
            .populate_element_gradients(cell, MatrixViewMut::from(&mut g), &centroid)
            .unwrap();
        // The reference triangle has area 2
        area += 2.0 * det.abs();
    }
    assert_scalar_eq!(area, 1.0, comp = abs, tol = 1e-13);
}

proptest! {
    #[test]
    fn quad4_basis_properties(xi in quad_point()) {
        check_reference_basis(&Quad4, &xi);
    }

    #[test]
    fn tri3_basis_properties(xi in triangle_point()) {
        check_reference_basis(&Tri3, &xi);
    }

    #[test]
    fn hex8_basis_properties(xi in hex_point()) {
        check_reference_basis(&Hex8, &xi);
    }

    #[test]
    fn tet4_basis_properties(xi in tetrahedron_point()) {
        check_reference_basis(&Tet4, &xi);
    }
}
