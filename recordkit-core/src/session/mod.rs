pub(crate) mod gate;
pub mod recorder;
pub(crate) mod worker;
