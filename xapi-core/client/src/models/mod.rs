//! XAPI 数据模型
//!
//! 服务端枚举与记录类型。

pub mod enums;
pub mod records;

pub use enums::*;
pub use records::*;
