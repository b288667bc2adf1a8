//! Per-node runtime-info side tables.
//!
//! Passes communicate node-local facts through a string-keyed table. The
//! table does not survive node replacement unless the replacing pass
//! explicitly propagates it with [`Graph::copy_rt_info`](crate::Graph::copy_rt_info).

use std::collections::HashMap;

/// A single runtime-info value.
#[derive(Debug, Clone, PartialEq)]
pub enum RtValue {
    Str(String),
    Int(i64),
    Flag(bool),
}

/// Runtime-info table: string key to typed value.
pub type RtInfo = HashMap<String, RtValue>;
