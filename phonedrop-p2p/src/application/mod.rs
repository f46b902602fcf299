pub mod config;
pub mod connection;
pub mod observer;
pub mod transfer;

pub use config::ConnectionConfig;
pub use connection::{DeviceConnection, DeviceConnectionBuilder};
pub use observer::{ConnectionObserver, NoopObserver};
pub use transfer::{send_file, ControlFrame, FileReceiver, CHUNK_SIZE};
