// Pipeline processing: per-stage field rule engines

pub mod clean;
pub mod mask;
pub mod normalize;
pub mod pii;
pub mod profile;
pub mod validate;
