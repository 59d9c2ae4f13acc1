use std::fs;

use approx::assert_relative_eq;
use tempfile::TempDir;

use super::*;

/// Write the two-square mesh (six nodes, seven faces, two cells) as CSV.
fn write_mesh_dir() -> TempDir {
  let dir = TempDir::new().unwrap();

  fs::write(
    dir.path().join("nodes.csv"),
    "id,x,y,z\n\
     0,0,0,0\n\
     1,1,0,0\n\
     2,2,0,0\n\
     3,0,1,0\n\
     4,1,1,0\n\
     5,2,1,0\n",
  )
  .unwrap();

  fs::write(
    dir.path().join("faces.csv"),
    "id,nodes\n\
     0,0,1\n\
     1,1,2\n\
     2,0,3\n\
     3,1,4\n\
     4,2,5\n\
     5,3,4\n\
     6,4,5\n",
  )
  .unwrap();

  fs::write(
    dir.path().join("cells.csv"),
    "id,faces\n\
     0,0,2,3,5\n\
     1,1,3,4,6\n",
  )
  .unwrap();

  fs::write(
    dir.path().join("patches.csv"),
    "patch,faces\n\
     inlet,2\n\
     outlet,4\n",
  )
  .unwrap();

  dir
}

#[test]
fn test_load_and_activate() {
  let dir = write_mesh_dir();
  let mut loader = MeshLoader::new(dir.path()).unwrap();
  loader.load().unwrap();

  assert_eq!(loader.node_coordinates().len(), 6);
  assert_eq!(loader.face_nodes().len(), 7);
  assert_eq!(loader.cell_faces().len(), 2);
  assert_eq!(loader.patches().len(), 2);
  assert!(loader.zones().is_empty());

  let mut grid = loader.into_grid().unwrap();
  grid.activate().unwrap();

  assert_eq!(grid.num_cells(), 2);
  assert_relative_eq!(grid.cell(0).volume, 1.0, epsilon = 1e-12);
  assert_eq!(grid.patches()["inlet"], vec![2]);
}

#[test]
fn test_centroids_are_means() {
  let dir = write_mesh_dir();
  let mut loader = MeshLoader::new(dir.path()).unwrap();
  loader.load().unwrap();

  let grid = loader.into_grid().unwrap();
  // Face 3 spans nodes (1,0) and (1,1).
  assert_relative_eq!(grid.face(3).centroid.x, 1.0, epsilon = 1e-12);
  assert_relative_eq!(grid.face(3).centroid.y, 0.5, epsilon = 1e-12);
  // Cell 0 centroid is the mean of its face centroids.
  assert_relative_eq!(grid.cell(0).centroid.x, 0.5, epsilon = 1e-12);
  assert_relative_eq!(grid.cell(0).centroid.y, 0.5, epsilon = 1e-12);
}

#[test]
fn test_missing_directory() {
  assert!(MeshLoader::new("/nonexistent/mesh").is_err());
}

#[test]
fn test_missing_required_file() {
  let dir = TempDir::new().unwrap();
  fs::write(dir.path().join("nodes.csv"), "id,x,y,z\n0,0,0,0\n").unwrap();

  let mut loader = MeshLoader::new(dir.path()).unwrap();
  let err = loader.load().unwrap_err();
  assert!(matches!(err, SimlinkError::Config(_)));
}

#[test]
fn test_non_incremental_ids_rejected() {
  let dir = write_mesh_dir();
  fs::write(
    dir.path().join("nodes.csv"),
    "id,x,y,z\n0,0,0,0\n2,1,0,0\n",
  )
  .unwrap();

  let mut loader = MeshLoader::new(dir.path()).unwrap();
  assert!(loader.load().is_err());
}

#[test]
fn test_ids_must_start_at_zero() {
  let dir = write_mesh_dir();
  fs::write(dir.path().join("nodes.csv"), "id,x,y,z\n1,0,0,0\n").unwrap();

  let mut loader = MeshLoader::new(dir.path()).unwrap();
  assert!(loader.load().is_err());
}
