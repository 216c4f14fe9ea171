pub mod builtins;
pub mod schedule;

pub use schedule::{parse_schedule_args, ScheduleRequest, ScheduleSyntaxError};
