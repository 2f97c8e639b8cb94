pub mod dto;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod render;
pub mod roster;
pub mod services;
