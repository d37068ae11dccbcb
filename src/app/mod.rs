pub mod pipeline_use_case;
pub mod ports;
