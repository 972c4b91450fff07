pub mod schedule_entry;

pub use schedule_entry::{
    ClassStatus, ClassifiedEntry, EntryField, ScheduleEntry, Suggestion, SuggestionKind,
};
