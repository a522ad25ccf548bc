pub mod fd_limit;
pub mod sockopt;
