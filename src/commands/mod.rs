pub mod init;
pub mod probe;
pub mod serve;
pub mod translate;
