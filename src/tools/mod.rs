//! 工具箱：契约、注册表与内置工具（convert / calculate / echo）

pub mod calculate;
pub mod contract;
pub mod convert;
pub mod echo;
pub mod registry;

pub use calculate::CalculateTool;
pub use contract::{PropertySpec, ToolContract, ToolSchema, ValueType};
pub use convert::TextToNumberTool;
pub use echo::EchoTool;
pub use registry::{Tool, ToolFactory, ToolRegistry};
