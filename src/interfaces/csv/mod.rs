pub mod outcome_writer;
pub mod request_reader;
