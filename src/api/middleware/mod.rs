//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Identity: reads gateway headers, rejects anonymous callers
//! 2. Audit logger: logs method, path, user and status
//! 3. Operator check: lifecycle routes only

pub mod audit;
pub mod identity;
