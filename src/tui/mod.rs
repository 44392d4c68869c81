pub mod dispatch;
pub mod input;
pub mod view;

pub use dispatch::InputDispatcher;
pub use view::TuiReporter;
