pub mod remote;

pub use remote::{HttpRemoteClient, RemoteApi};
