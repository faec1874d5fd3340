pub mod config;
pub mod contour;
pub mod curve;
pub mod depth;
pub mod finger;
pub mod gesture;
pub mod hand;
pub mod pipeline;
pub mod recognizer;
pub mod synth;
pub mod tracker;
pub mod vector;
