//! 资源模块
//!
//! 资源描述（处理单元 PE、资源维度）与单维度资源的分配器（Provisioner）。

// 子模块声明
mod kind;
mod pe;
mod provisioner;

// 重新导出公共接口
pub use kind::ResourceKind;
pub use pe::Pe;
pub use provisioner::Provisioner;
