pub mod dijkstra;

pub use dijkstra::{compute_routes, shortest_paths, Edge, Graph, ShortestPath};
