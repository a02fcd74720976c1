//! Host/client message layer

pub mod protocol;
