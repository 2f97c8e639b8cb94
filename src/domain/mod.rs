pub mod artifact;
pub mod detection;
pub mod errors;
pub mod legend;
pub mod model;
pub mod palette;
pub mod session;
