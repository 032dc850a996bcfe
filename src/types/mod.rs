pub mod filter;
pub mod task;

pub use filter::{derive_view, FilterSelection, FilterValue, StatusFilter, TaskCounts, TaskView};
pub use task::{Category, DueState, NewTask, Priority, Task, TaskPatch};
