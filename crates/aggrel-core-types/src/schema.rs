//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Aggregate identifiers
pub const FIELD_AGGREGATE: &str = "aggregate";
pub const FIELD_AGGREGATE_ID: &str = "aggregate_id";
pub const FIELD_TABLE: &str = "table";

// Row counts
pub const FIELD_CHILD_TABLES: &str = "child_tables";
pub const FIELD_ROWS_WRITTEN: &str = "rows_written";
pub const FIELD_ROWS_READ: &str = "rows_read";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_GET_BY_ID: &str = "get_by_id";
pub const OP_SAVE: &str = "save";
pub const OP_DELETE_BY_ID: &str = "delete_by_id";
pub const OP_CREATE_TABLES: &str = "create_tables";
pub const OP_BOOTSTRAP: &str = "bootstrap";
pub const OP_TRANSACTION: &str = "transaction";
pub const OP_EXISTS_BY_ID: &str = "exists_by_id";
pub const OP_COUNT_CHILD_ROWS: &str = "count_child_rows";
