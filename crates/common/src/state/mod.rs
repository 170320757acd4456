mod board;
mod bus_agent;
mod fleet;
mod plugin;
mod port;
mod request;
mod service;
mod session;
mod webservice;

pub use board::*;
pub use bus_agent::*;
pub use fleet::*;
pub use plugin::*;
pub use port::*;
pub use request::*;
pub use service::*;
pub use session::*;
pub use webservice::*;
