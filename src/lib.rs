mod app;
pub mod components;
pub mod console;
pub mod environment;
pub mod store;

pub use app::run;
pub use environment::types::{ClientId, Talk, TalkId};
pub use environment::Environment;
