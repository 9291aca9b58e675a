mod layout;
mod mute;

pub use layout::{compute, Edge, GraphLayout, LayoutOptions, Segment, Vertex};
pub use mute::{muted_rows, MuteOptions};
