pub mod cli;
pub mod codec;
pub mod dtype;
pub mod error;
pub mod file_b_less_aatb;
pub mod file_dot;
pub mod index;
pub mod metadata;
pub mod mmap_matrix;
pub mod reader;
pub mod threadpool;
pub mod writer;
