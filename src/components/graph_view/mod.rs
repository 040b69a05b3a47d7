mod bridge;
mod builder;
mod canvas;
mod component;
mod config;
mod engine;
mod error;
mod fetch;
mod frame_loop;
mod layout;
mod model;
mod quadtree;
mod render;
mod session;
mod state;
mod surface;
#[cfg(test)]
mod testing;
mod types;

pub use component::GraphViewer;
pub use config::ViewerConfig;
