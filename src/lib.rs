// ==========================================
// Excel2DB - 核心库
// ==========================================
// 职责: 按模板把表格文件导入数据库
// 流程: 模板注册 → 行校验/增强 → 备份 → 主键分配 → 批量落库 → 去重/派生列
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 模板与行
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 导入流程
pub mod importer;

// 配置层 - 配置文件
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 对外接口
pub mod api;

// 应用层 - 启动装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    BackupRecord, ColumnSpec, DerivedColumnRule, FieldValue, ImportReport, RawTable, Row, RowSet,
    TemplateDescriptor,
};

// 导入
pub use importer::{ImportError, ImportOrchestrator, TemplateHandler, TemplateRegistry};

// API
pub use api::{ApiResponse, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Excel2DB 模板导入";
