//! Order orchestration
//!
//! 下单、状态流转、取消/删除与库存联动都在这里编排；
//! 状态表本身定义在 `shared::models::order`。

pub mod service;
pub mod stock;
