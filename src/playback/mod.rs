pub mod clock;
pub mod preview;
pub mod transport;
