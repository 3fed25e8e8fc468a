pub mod editor;
pub mod event;
pub mod gate;
pub mod grid;
pub mod level;
pub mod resolver;
pub mod scene;
pub mod step;
pub mod tilemap;
pub mod tunnels;
pub mod world;

#[cfg(test)]
mod proptests;
