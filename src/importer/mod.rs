// ==========================================
// Excel2DB - 导入层
// ==========================================
// 职责: 表格文件 → 校验/增强 → 备份 → 落库 → 规整
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod backup_manager;
pub mod batch_loader;
pub mod error;
pub mod file_parser;
pub mod import_orchestrator;
pub mod importer_trait;
pub mod post_load_normalizer;
pub mod row_validator;
pub mod sequence_allocator;
pub mod template_generator;
pub mod template_handler;
pub mod template_registry;
pub mod transliteration;

// 重导出核心类型
pub use backup_manager::BackupManager;
pub use batch_loader::BatchLoader;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser, DEFAULT_MAX_FILE_SIZE};
pub use import_orchestrator::ImportOrchestrator;
pub use post_load_normalizer::PostLoadNormalizer;
pub use row_validator::RowValidator;
pub use sequence_allocator::SequenceAllocator;
pub use template_generator::TemplateGenerator;
pub use template_handler::{GenericTemplate, LanguageTemplate, QkzlmbaTemplate};
pub use template_registry::TemplateRegistry;

// 重导出 Trait 接口
pub use importer_trait::{FileParser, TemplateHandler};
