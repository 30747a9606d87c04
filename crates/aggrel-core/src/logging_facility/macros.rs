//! Canonical operation boundary macros

/// Log the start of an operation
///
/// ```
/// # use aggrel_core::log_op_start;
/// log_op_start!("save");
/// log_op_start!("save", aggregate = "Order");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use aggrel_core::log_op_end;
/// log_op_end!("save", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure with its taxonomy kind and code
///
/// `$err` is borrowed; anything convertible to `&RepoError` works.
///
/// ```
/// # use aggrel_core::{log_op_error, RepoError};
/// let err = RepoError::not_found("Order", "42");
/// log_op_error!("get_by_id", &err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let repo_err: &$crate::errors::RepoError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?repo_err.kind(),
            err_code = repo_err.code(),
            error = %repo_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let repo_err: &$crate::errors::RepoError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::log_schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?repo_err.kind(),
            err_code = repo_err.code(),
            error = %repo_err,
            $($field)*
        );
    }};
}
