pub mod block;
pub mod gc;
pub mod init;
pub mod pin;
pub mod version;

pub use block::Block;
pub use gc::Gc;
pub use init::Init;
pub use pin::Pin;
pub use version::Version;
