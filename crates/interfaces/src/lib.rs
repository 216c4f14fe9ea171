pub mod completion;
pub mod terminal;
pub mod traits;

pub use completion::ShellHelper;
pub use terminal::TerminalInterface;
pub use traits::{Interface, LineInput, Tone};
