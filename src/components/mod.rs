pub mod session;
pub mod talks;
