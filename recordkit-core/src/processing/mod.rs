pub mod amplitude;
pub mod ring_buffer;
