pub mod color;
pub mod employee;
pub mod entry;
pub mod production;

pub use color::ColorMapping;
pub use employee::Employee;
pub use entry::{
    CollectionEntry, EntryView, NewEntry, ProtocolAggregateRow, ProtocolItem, ProtocolItemRow,
    ProtocolSummary, ReceiptLine, ENTRY_COLUMNS,
};
pub use production::{
    NewProduction, ProductKey, Production, ProductionChanges, ProductionStatus, ProductionView,
    PRODUCTION_COLUMNS,
};
