pub mod graph;
pub mod init;
pub mod kernels;
pub mod ops;
pub mod tensor;
