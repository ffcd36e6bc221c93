//! Core types: day window, event report, output rendering, tracing

pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::{
    CalendarEventEntry, CalendarEvents, CalendarIdentity, DailyEventReport, SkippedCalendar,
};
pub use format::{
    FormatOptions, JsonCalendar, OutputFormat, ReportFormatter, format_start, snapshot_json,
};
pub use time::{DayWindow, EventStart, compute_day_window};
pub use self::tracing::{TracingConfig, TracingError, init_tracing};
