// Infrastructure adapters for the application ports

pub mod csv_reader;
pub mod csv_writer;
pub mod report_sink;
