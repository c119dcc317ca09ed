//! Runtime module: startup and the file-processing run.

pub mod boot;
pub mod run;
