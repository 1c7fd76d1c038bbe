//! ECU broadcast protocol: the frame layout table and the CAN transport
//! primitives the decoder consumes.
pub mod layouts;
pub mod transport;
