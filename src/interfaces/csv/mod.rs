pub mod folder;
pub mod output_writer;
pub mod payment_reader;
