// 准入控制模块
// 按 (客户端, 端点) 做固定窗口计数与封禁升级，计数表是唯一的持久状态

pub mod allowlist;
pub mod controller;
pub mod store;

pub use allowlist::TrustedClients;
pub use controller::{AdmissionController, Decision, ThrottlePolicy};
pub use store::{CounterStore, PgCounterStore};
