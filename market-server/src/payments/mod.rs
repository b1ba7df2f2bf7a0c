//! Payment processing
//!
//! 网关交互、提交流水线、Webhook 验签与对账扫描。
//! 状态收敛的唯一入口是 [`service::apply_gateway_status`]。

pub mod gateway;
pub mod reconciler;
pub mod service;
pub mod webhook;
