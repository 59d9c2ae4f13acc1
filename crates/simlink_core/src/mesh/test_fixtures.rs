//! Small meshes shared by the mesh and FVM tests.

use glam::DVec3;

use super::{Cell, Face, Mesh, Node};

/// Two unit squares side by side, sharing the middle edge.
pub fn two_square_mesh() -> Mesh {
  let coords = [
    (0.0, 0.0),
    (1.0, 0.0),
    (2.0, 0.0),
    (0.0, 1.0),
    (1.0, 1.0),
    (2.0, 1.0),
  ];
  let nodes: Vec<Node> = coords
    .iter()
    .map(|&(x, y)| Node::new(DVec3::new(x, y, 0.0)))
    .collect();

  let face_nodes: Vec<Vec<usize>> = vec![
    vec![0, 1], // 0 bottom left
    vec![1, 2], // 1 bottom right
    vec![0, 3], // 2 left
    vec![1, 4], // 3 middle (interior)
    vec![2, 5], // 4 right
    vec![3, 4], // 5 top left
    vec![4, 5], // 6 top right
  ];
  let faces: Vec<Face> = face_nodes
    .iter()
    .map(|ids| {
      let centroid =
        ids.iter().map(|&i| nodes[i].coordinate).sum::<DVec3>() / ids.len() as f64;
      Face::new(centroid, ids.clone())
    })
    .collect();

  let cells = vec![
    Cell::new(DVec3::new(0.5, 0.5, 0.0), vec![0, 2, 3, 5]),
    Cell::new(DVec3::new(1.5, 0.5, 0.0), vec![1, 3, 4, 6]),
  ];

  Mesh::new(nodes, faces, cells)
}

/// A unit right tetrahedron: volume 1/6.
pub fn tetrahedron_mesh() -> Mesh {
  let nodes = vec![
    Node::new(DVec3::new(0.0, 0.0, 0.0)),
    Node::new(DVec3::new(1.0, 0.0, 0.0)),
    Node::new(DVec3::new(0.0, 1.0, 0.0)),
    Node::new(DVec3::new(0.0, 0.0, 1.0)),
  ];
  let face_nodes: Vec<Vec<usize>> = vec![
    vec![0, 1, 2],
    vec![0, 1, 3],
    vec![0, 2, 3],
    vec![1, 2, 3],
  ];
  let faces: Vec<Face> = face_nodes
    .iter()
    .map(|ids| {
      let centroid =
        ids.iter().map(|&i| nodes[i].coordinate).sum::<DVec3>() / ids.len() as f64;
      Face::new(centroid, ids.clone())
    })
    .collect();
  let cells = vec![Cell::new(DVec3::splat(0.25), vec![0, 1, 2, 3])];
  Mesh::new(nodes, faces, cells)
}
