// Scene module - a minimal in-memory scene tree
//
// This module contains:
// - graph.rs: Scene, an arena of entities and components that implements
//   the tree operations the save system consumes
//
// It models containment, removal, and deferred insertion only. Rendering,
// ticking, and collisions belong to the host game.

pub mod graph;

pub use graph::Scene;
